// Seeded k-means on top of linfa-clustering.

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use rinkscope_core::{AnalysisError, Result};
use tracing::debug;

/// Independent k-means++ restarts; the lowest-inertia run wins.
pub const KMEANS_RUNS: usize = 10;
pub const KMEANS_MAX_ITERATIONS: u64 = 300;
pub const KMEANS_TOLERANCE: f64 = 1e-4;

/// Use the configured seed, or draw a fresh one for an unseeded run.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub labels: Array1<usize>,
    /// Within-cluster sum of squared distances to the assigned centroid.
    pub inertia: f64,
}

impl KMeansFit {
    /// Number of labels that actually occur.
    pub fn distinct_labels(&self) -> usize {
        let mut seen: Vec<usize> = self.labels.to_vec();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

pub fn fit_kmeans(data: ArrayView2<'_, f64>, n_clusters: usize, seed: u64) -> Result<KMeansFit> {
    let rows = data.nrows();
    if n_clusters == 0 || n_clusters > rows {
        return Err(AnalysisError::InsufficientData {
            clusters: n_clusters,
            rows,
        });
    }

    let records = data.to_owned();
    let dataset = DatasetBase::from(records.clone());
    let rng = Xoshiro256Plus::seed_from_u64(seed);
    let model = KMeans::params_with_rng(n_clusters, rng)
        .n_runs(KMEANS_RUNS)
        .max_n_iterations(KMEANS_MAX_ITERATIONS)
        .tolerance(KMEANS_TOLERANCE)
        .fit(&dataset)
        .map_err(|e| AnalysisError::Fit(e.to_string()))?;

    let labels: Array1<usize> = model.predict(&records);
    let inertia = inertia(records.view(), &labels, model.centroids());
    debug!("k-means k={n_clusters} seed={seed} inertia={inertia:.4}");

    Ok(KMeansFit { labels, inertia })
}

fn inertia(data: ArrayView2<'_, f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    data.axis_iter(Axis(0))
        .zip(labels.iter())
        .map(|(row, &label)| {
            row.iter()
                .zip(centroids.row(label).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
        })
        .sum()
}
