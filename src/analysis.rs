//! Correlation and k-means clustering over the regional indicators.

use crate::types::{ClusterLabel, RegionTable};
use anyhow::{bail, Result};
use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1};
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use std::collections::HashMap;
use tracing::info;

/// Indicator values of the regions with no missing value.
#[derive(Debug, Clone)]
pub struct IndicatorMatrix {
    pub names: Vec<String>,
    /// (n_complete_rows, n_indicators)
    pub values: Array2<f64>,
    /// Row index into the region table for each row of `values`
    pub rows: Vec<usize>,
}

impl IndicatorMatrix {
    pub fn complete_rows(table: &RegionTable) -> Self {
        let n_cols = table.indicator_names.len();
        let mut data = Vec::new();
        let mut rows = Vec::new();

        for (i, region) in table.regions.iter().enumerate() {
            if region.is_complete() {
                data.extend(region.indicators.iter().flatten());
                rows.push(i);
            }
        }

        let values = Array2::from_shape_vec((rows.len(), n_cols), data)
            .unwrap_or_else(|_| Array2::zeros((0, n_cols)));

        Self {
            names: table.indicator_names.clone(),
            values,
            rows,
        }
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[[i, j]])
    }
}

/// Pairwise Pearson correlation between the indicator columns.
///
/// A column with zero variance correlates as NaN with everything, itself
/// included, which is also the case for every column when there are fewer
/// than two complete rows.
pub fn correlation_matrix(matrix: &IndicatorMatrix) -> CorrelationMatrix {
    let n = matrix.values.ncols();
    let mut values = Array2::from_elem((n, n), f64::NAN);

    for i in 0..n {
        for j in i..n {
            let r = pearson(matrix.values.column(i), matrix.values.column(j));
            let r = if i == j && !r.is_nan() { 1.0 } else { r };
            values[[i, j]] = r;
            values[[j, i]] = r;
        }
    }

    CorrelationMatrix {
        names: matrix.names.clone(),
        values,
    }
}

fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.sum() / n;
    let mean_y = y.sum() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// count/mean/std/min/max per indicator over the complete rows.
pub fn describe(matrix: &IndicatorMatrix) -> Vec<IndicatorSummary> {
    matrix.names.iter().enumerate()
        .map(|(i, name)| {
            let col = matrix.values.column(i);
            let count = col.len();
            let mean = if count > 0 { col.sum() / count as f64 } else { f64::NAN };
            // sample standard deviation, as pandas reports it
            let std = if count > 1 {
                (col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
            } else {
                f64::NAN
            };
            IndicatorSummary {
                name: name.clone(),
                count,
                mean,
                std,
                min: col.iter().copied().fold(f64::INFINITY, f64::min),
                max: col.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ClusterParams {
    pub n_clusters: usize,
    pub seed: u64,
    pub max_iterations: u64,
    pub tolerance: f64,
    pub n_runs: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            n_clusters: 4,
            seed: 0,
            max_iterations: 300,
            tolerance: 1e-4,
            n_runs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Clustering {
    pub n_clusters: usize,
    /// One label per region table row
    pub labels: Vec<ClusterLabel>,
    /// Centroids in indicator units, rows ordered by canonical label
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares
    pub inertia: f64,
}

impl Clustering {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for label in &self.labels {
            if let ClusterLabel::Cluster(c) = label {
                sizes[*c] += 1;
            }
        }
        sizes
    }

    pub fn unlabeled(&self) -> usize {
        self.labels.iter().filter(|l| **l == ClusterLabel::Unlabeled).count()
    }
}

/// Fits k-means on the complete rows and labels every region row.
///
/// Rows with a missing indicator are [`ClusterLabel::Unlabeled`]. Labels are
/// renumbered by first appearance in table order, so the same input and seed
/// always produce the same labelling.
pub fn cluster_regions(table: &RegionTable, params: &ClusterParams) -> Result<Clustering> {
    let matrix = IndicatorMatrix::complete_rows(table);
    let k = params.n_clusters;

    if k == 0 {
        bail!("Number of clusters must be at least 1");
    }
    if matrix.nrows() < k {
        bail!(
            "Number of complete rows ({}) must be at least equal to number of clusters ({})",
            matrix.nrows(),
            k
        );
    }

    let rng = Xoshiro256Plus::seed_from_u64(params.seed);
    let dataset = DatasetBase::from(matrix.values.clone());
    let model = KMeans::params_with(k, rng, L2Dist)
        .max_n_iterations(params.max_iterations)
        .tolerance(params.tolerance)
        .n_runs(params.n_runs)
        .fit(&dataset)?;

    let raw_labels: Array1<usize> = model.predict(&matrix.values);
    let (canonical, mapping) = relabel_by_first_appearance(raw_labels.as_slice().unwrap_or(&[]), k);

    let raw_centroids = model.centroids();
    let mut centroids = Array2::zeros(raw_centroids.raw_dim());
    for (old, new) in mapping.iter().enumerate() {
        centroids.row_mut(*new).assign(&raw_centroids.row(old));
    }

    let mut labels = vec![ClusterLabel::Unlabeled; table.len()];
    for (&row, &label) in matrix.rows.iter().zip(canonical.iter()) {
        labels[row] = ClusterLabel::Cluster(label);
    }

    let inertia = compute_inertia(&matrix.values, &canonical, &centroids);

    let clustering = Clustering {
        n_clusters: k,
        labels,
        centroids,
        inertia,
    };

    info!(
        "K-Means fitted {} clusters on {} regions ({} unlabeled), inertia {:.3}",
        k,
        matrix.nrows(),
        clustering.unlabeled(),
        clustering.inertia
    );
    Ok(clustering)
}

/// Renumbers labels in order of first appearance. Returns the new labels and
/// the old→new mapping; labels never seen are appended after the seen ones.
fn relabel_by_first_appearance(labels: &[usize], k: usize) -> (Vec<usize>, Vec<usize>) {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    for &l in labels {
        let next = mapping.len();
        mapping.entry(l).or_insert(next);
    }
    for old in 0..k {
        let next = mapping.len();
        mapping.entry(old).or_insert(next);
    }

    let canonical = labels.iter().map(|l| mapping[l]).collect();
    let table = (0..k).map(|old| mapping[&old]).collect();
    (canonical, table)
}

fn compute_inertia(features: &Array2<f64>, labels: &[usize], centroids: &Array2<f64>) -> f64 {
    labels.iter().enumerate()
        .map(|(i, &cluster)| {
            features.row(i).iter()
                .zip(centroids.row(cluster).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
        })
        .sum()
}
