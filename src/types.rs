use geo::{MultiPolygon, Point};
use serde::Deserialize;
use std::fmt;

/// One row of the healthcare facility CSV.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Facility {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

impl Facility {
    /// Point geometry in WGS84 degrees, x = longitude, y = latitude.
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionMetrics {
    pub region: String,
    // One entry per configured indicator, None where the cell was missing
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct RegionBoundary {
    pub region: String,
    pub geometry: MultiPolygon<f64>,
}

/// A boundary joined with its metrics row.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub indicators: Vec<Option<f64>>,
}

impl Region {
    pub fn is_complete(&self) -> bool {
        self.indicators.iter().all(|v| v.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct RegionTable {
    pub indicator_names: Vec<String>,
    pub regions: Vec<Region>,
}

impl RegionTable {
    pub fn indicator_index(&self, name: &str) -> Option<usize> {
        self.indicator_names.iter().position(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterLabel {
    Cluster(usize),
    /// The row had a missing indicator and was left out of fitting.
    Unlabeled,
}

impl ClusterLabel {
    pub fn index(&self) -> Option<usize> {
        match self {
            ClusterLabel::Cluster(i) => Some(*i),
            ClusterLabel::Unlabeled => None,
        }
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterLabel::Cluster(i) => write!(f, "{}", i),
            ClusterLabel::Unlabeled => write!(f, "no data"),
        }
    }
}

/// Region with the derived cluster and facility count columns.
#[derive(Debug, Clone)]
pub struct EnrichedRegion {
    pub region: Region,
    pub cluster: ClusterLabel,
    pub facility_count: u32,
}
