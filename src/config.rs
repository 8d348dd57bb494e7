use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub clustering: ClusteringConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub facilities_csv: PathBuf,
    pub metrics_csv: PathBuf,
    pub boundaries: PathBuf, // .shp, .json or .geojson
    pub join_column_csv: String,
    pub join_column_shape: String,
    pub indicators: Vec<String>,
    pub basemap_tiles: Option<PathBuf>, // local {z}/{x}/{y}.png tile tree
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            facilities_csv: PathBuf::from("healthcare_locations.csv"),
            metrics_csv: PathBuf::from("regional_health_data.csv"),
            boundaries: PathBuf::from("regions_shapefile.shp"),
            join_column_csv: "Region".to_string(),
            join_column_shape: "Region".to_string(),
            indicators: vec![
                "DiseaseRate".to_string(),
                "Income".to_string(),
                "Pollution".to_string(),
            ],
            basemap_tiles: None,
        }
    }
}

/// What to do with regions left out of clustering because of missing indicators.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnclusteredPolicy {
    /// Shade them as a separate "no data" category.
    #[default]
    NoData,
    /// Draw the outline only.
    Omit,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClusteringConfig {
    pub clusters: usize,
    pub seed: u64,
    pub max_iterations: u64,
    pub tolerance: f64,
    pub runs: usize,
    pub unclustered: UnclusteredPolicy,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            clusters: 4,
            seed: 0,
            max_iterations: 300,
            tolerance: 1e-4,
            runs: 10,
            unclustered: UnclusteredPolicy::NoData,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub interactive_map: String,
    pub charts: bool,
    pub choropleth_indicator: Option<String>, // defaults to the first indicator
    pub zoom_start: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            interactive_map: "interactive_health_map.html".to_string(),
            charts: true,
            choropleth_indicator: None,
            zoom_start: 6,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.indicators.is_empty() {
            bail!("At least one indicator column must be configured");
        }
        if self.clustering.clusters == 0 {
            bail!("clustering.clusters must be at least 1");
        }
        if let Some(name) = &self.output.choropleth_indicator {
            if !self.input.indicators.contains(name) {
                bail!("choropleth_indicator '{}' is not one of the configured indicators", name);
            }
        }
        Ok(())
    }

    /// Indicator shaded in the single-indicator choropleth.
    pub fn choropleth_indicator(&self) -> &str {
        self.output
            .choropleth_indicator
            .as_deref()
            .or_else(|| self.input.indicators.first().map(String::as_str))
            .unwrap_or("DiseaseRate")
    }

    pub fn interactive_map_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.interactive_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_fixed_file_names() {
        let config = AppConfig::default();
        assert_eq!(config.input.facilities_csv, PathBuf::from("healthcare_locations.csv"));
        assert_eq!(config.input.metrics_csv, PathBuf::from("regional_health_data.csv"));
        assert_eq!(config.input.boundaries, PathBuf::from("regions_shapefile.shp"));
        assert_eq!(config.clustering.clusters, 4);
        assert_eq!(config.clustering.seed, 0);
        assert_eq!(config.choropleth_indicator(), "DiseaseRate");
        assert_eq!(config.interactive_map_path(), PathBuf::from("./interactive_health_map.html"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[clustering]\nclusters = 3\nunclustered = \"omit\"\n").unwrap();
        writeln!(file, "[output]\ndir = \"out\"\ncharts = false").unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.clustering.clusters, 3);
        assert_eq!(config.clustering.unclustered, UnclusteredPolicy::Omit);
        assert_eq!(config.clustering.max_iterations, 300);
        assert!(!config.output.charts);
        assert_eq!(config.input.join_column_csv, "Region");
        assert_eq!(config.interactive_map_path(), PathBuf::from("out/interactive_health_map.html"));
    }

    #[test]
    fn rejects_unknown_choropleth_indicator() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[output]\nchoropleth_indicator = \"Rainfall\"").unwrap();
        assert!(AppConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn rejects_zero_clusters() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[clustering]\nclusters = 0").unwrap();
        assert!(AppConfig::load_from_file(file.path()).is_err());
    }
}
