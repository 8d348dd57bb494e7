//! load → merge → explore → map → cluster → spatial join, each stage consuming the previous result.

use crate::analysis::{self, ClusterParams, Clustering, CorrelationMatrix, IndicatorMatrix, IndicatorSummary};
use crate::config::AppConfig;
use crate::data;
use crate::join::{self, FacilityJoin};
use crate::render;
use crate::types::{EnrichedRegion, Facility, RegionTable};
use crate::webmap;
use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

/// Raw inputs as read from disk.
#[derive(Debug)]
pub struct Inputs {
    pub facilities: Vec<Facility>,
    pub regions: RegionTable,
}

#[derive(Debug)]
pub struct Analysis {
    pub matrix: IndicatorMatrix,
    pub summary: Vec<IndicatorSummary>,
    pub correlation: CorrelationMatrix,
    pub clustering: Clustering,
}

#[derive(Debug)]
pub struct PipelineReport {
    pub facilities: Vec<Facility>,
    pub indicator_names: Vec<String>,
    pub regions: Vec<EnrichedRegion>,
    pub facility_join: FacilityJoin,
    pub analysis: Analysis,
    pub artifacts: Vec<PathBuf>,
}

impl From<&AppConfig> for ClusterParams {
    fn from(config: &AppConfig) -> Self {
        ClusterParams {
            n_clusters: config.clustering.clusters,
            seed: config.clustering.seed,
            max_iterations: config.clustering.max_iterations,
            tolerance: config.clustering.tolerance,
            n_runs: config.clustering.runs,
        }
    }
}

pub fn load(config: &AppConfig) -> Result<Inputs> {
    let input = &config.input;
    let facilities = data::load_facilities(&input.facilities_csv)?;
    let metrics = data::load_metrics(&input.metrics_csv, &input.join_column_csv, &input.indicators)?;
    let boundaries = data::load_boundaries(&input.boundaries, &input.join_column_shape)?;
    let regions = join::merge_regions(boundaries, metrics, &input.indicators)?;
    Ok(Inputs { facilities, regions })
}

/// Drop-incomplete matrix, summary statistics and correlations.
pub fn explore(regions: &RegionTable) -> (IndicatorMatrix, Vec<IndicatorSummary>, CorrelationMatrix) {
    let matrix = IndicatorMatrix::complete_rows(regions);
    info!(
        "{} of {} regions have every indicator",
        matrix.nrows(),
        regions.len()
    );

    let summary = analysis::describe(&matrix);
    for s in &summary {
        info!(
            "{}: count={} mean={:.3} std={:.3} min={:.3} max={:.3}",
            s.name, s.count, s.mean, s.std, s.min, s.max
        );
    }

    let correlation = analysis::correlation_matrix(&matrix);
    for (i, a) in correlation.names.iter().enumerate() {
        for (j, b) in correlation.names.iter().enumerate().skip(i + 1) {
            info!("corr({}, {}) = {:.3}", a, b, correlation.values[[i, j]]);
        }
    }

    (matrix, summary, correlation)
}

pub fn cluster(regions: &RegionTable, config: &AppConfig) -> Result<Clustering> {
    let clustering = analysis::cluster_regions(regions, &ClusterParams::from(config))?;
    for (c, size) in clustering.cluster_sizes().iter().enumerate() {
        info!("Cluster {}: {} regions, centroid {:?}", c, size, clustering.centroids.row(c).to_vec());
    }
    Ok(clustering)
}

/// Runs every stage and writes the artifacts.
///
/// Exploratory charts and the interactive map are written before clustering,
/// so they survive a clustering failure.
pub fn run(config: &AppConfig) -> Result<PipelineReport> {
    let Inputs { facilities, regions } = load(config)?;
    let (matrix, summary, correlation) = explore(&regions);

    let mut artifacts = Vec::new();
    if config.output.charts {
        artifacts.extend(render::render_exploratory(&regions, &facilities, &matrix, &correlation, config)?);
    }

    let map_path = config.interactive_map_path();
    webmap::write_interactive_map(&facilities, config.output.zoom_start, &map_path)?;
    artifacts.push(map_path);

    let clustering = cluster(&regions, config)?;
    if config.output.charts {
        artifacts.push(render::render_cluster_map(&regions, &clustering, config)?);
    }

    let facility_join = join::spatial_join(&facilities, &regions);
    let counts = join::count_by_region(&facility_join, &regions);
    let indicator_names = regions.indicator_names.clone();
    let enriched = join::attach_counts(regions, &clustering.labels, &counts);
    if config.output.charts {
        artifacts.push(render::render_facility_counts(&enriched, config)?);
    }

    Ok(PipelineReport {
        facilities,
        indicator_names,
        regions: enriched,
        facility_join,
        analysis: Analysis {
            matrix,
            summary,
            correlation,
            clustering,
        },
        artifacts,
    })
}
