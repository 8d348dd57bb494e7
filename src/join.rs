//! Attribute and spatial joins between facilities, boundaries and metrics.

use crate::types::{ClusterLabel, EnrichedRegion, Facility, Region, RegionBoundary, RegionMetrics, RegionTable};
use anyhow::{bail, Result};
use geo::{BoundingRect, Contains};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;
use tracing::{debug, info};

/// Inner join of boundaries and metrics on the region key.
///
/// Keeps boundary order. Keys present in only one source are dropped.
pub fn merge_regions(
    boundaries: Vec<RegionBoundary>,
    metrics: Vec<RegionMetrics>,
    indicator_names: &[String],
) -> Result<RegionTable> {
    let mut by_region: HashMap<String, Vec<Option<f64>>> = metrics
        .into_iter()
        .map(|m| (m.region, m.values))
        .collect();

    let boundary_count = boundaries.len();
    let mut regions = Vec::with_capacity(boundary_count);

    for boundary in boundaries {
        match by_region.remove(&boundary.region) {
            Some(indicators) => regions.push(Region {
                name: boundary.region,
                geometry: boundary.geometry,
                indicators,
            }),
            None => debug!("Region '{}' has no metrics row, dropped", boundary.region),
        }
    }

    for name in by_region.keys() {
        debug!("Metrics row '{}' has no boundary, dropped", name);
    }

    info!(
        "Joined {} regions ({} boundaries without metrics, {} metrics rows without boundary)",
        regions.len(),
        boundary_count - regions.len(),
        by_region.len()
    );

    if regions.is_empty() {
        bail!("No region keys matched between the boundary and metrics sources");
    }

    Ok(RegionTable {
        indicator_names: indicator_names.to_vec(),
        regions,
    })
}

// Wrapper for RTree indexing
struct RegionEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityMatch {
    pub facility: usize,
    pub region: usize,
}

/// Result of the point-in-polygon join, by row index into the inputs.
#[derive(Debug, Clone, Default)]
pub struct FacilityJoin {
    pub matches: Vec<FacilityMatch>,
    pub unmatched: Vec<usize>,
}

/// Associates each facility with the region whose interior contains it.
///
/// Points on a region boundary are not inside it. Where regions overlap the
/// first one in table order wins.
pub fn spatial_join(facilities: &[Facility], table: &RegionTable) -> FacilityJoin {
    let items: Vec<RegionEnvelope> = table.regions.iter().enumerate()
        .filter_map(|(index, region)| {
            let rect = region.geometry.bounding_rect()?;
            Some(RegionEnvelope {
                index,
                aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            })
        })
        .collect();
    let tree = RTree::bulk_load(items);

    let mut join = FacilityJoin::default();

    for (facility_idx, facility) in facilities.iter().enumerate() {
        let point = facility.point();
        let envelope = AABB::from_point([point.x(), point.y()]);

        let mut candidates: Vec<usize> = tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|c| c.index)
            .collect();
        candidates.sort_unstable();

        let hit = candidates.into_iter()
            .find(|&idx| table.regions[idx].geometry.contains(&point));

        match hit {
            Some(region) => join.matches.push(FacilityMatch { facility: facility_idx, region }),
            None => {
                debug!("Facility '{}' lies outside every region", facility.name);
                join.unmatched.push(facility_idx);
            }
        }
    }

    info!(
        "Spatial join matched {} of {} facilities",
        join.matches.len(),
        facilities.len()
    );
    join
}

pub fn count_by_region(join: &FacilityJoin, table: &RegionTable) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for m in &join.matches {
        *counts.entry(table.regions[m.region].name.clone()).or_insert(0) += 1;
    }
    counts
}

/// Left join of cluster labels and facility counts onto the region table.
/// Regions without any facility get a count of zero.
pub fn attach_counts(
    table: RegionTable,
    labels: &[ClusterLabel],
    counts: &HashMap<String, u32>,
) -> Vec<EnrichedRegion> {
    table.regions.into_iter().enumerate()
        .map(|(i, region)| {
            let facility_count = counts.get(&region.name).copied().unwrap_or(0);
            EnrichedRegion {
                cluster: labels.get(i).copied().unwrap_or(ClusterLabel::Unlabeled),
                facility_count,
                region,
            }
        })
        .collect()
}
