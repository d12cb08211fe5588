// Silhouette coefficients over the space a clustering actually ran in.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rinkscope_core::{AnalysisError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Silhouette {
    pub average: f64,
    pub samples: Array1<f64>,
}

fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Per-sample and mean silhouette.
///
/// Needs between 2 and `n - 1` distinct labels; anything else is a
/// [`AnalysisError::DegenerateCluster`]. A sample alone in its cluster
/// scores 0.
pub fn silhouette(data: ArrayView2<'_, f64>, labels: &[usize]) -> Result<Silhouette> {
    let n = data.nrows();
    if labels.len() != n {
        return Err(AnalysisError::input_format(
            "silhouette",
            format!("{} labels for {n} rows", labels.len()),
        ));
    }

    // Dense cluster indices, tolerating gaps in the label values.
    let mut dense: BTreeMap<usize, usize> = BTreeMap::new();
    for &label in labels {
        let next = dense.len();
        dense.entry(label).or_insert(next);
    }
    let k = dense.len();
    if k < 2 || k + 1 > n {
        return Err(AnalysisError::DegenerateCluster { distinct: k, rows: n });
    }
    let cluster: Vec<usize> = labels.iter().map(|l| dense[l]).collect();
    let mut sizes = vec![0usize; k];
    for &c in &cluster {
        sizes[c] += 1;
    }

    let rows: Vec<ArrayView1<'_, f64>> = data.axis_iter(Axis(0)).collect();
    let mut samples = Array1::zeros(n);
    for i in 0..n {
        let own = cluster[i];
        if sizes[own] == 1 {
            continue;
        }
        let mut sums = vec![0.0; k];
        for j in 0..n {
            if i != j {
                sums[cluster[j]] += euclidean(rows[i], rows[j]);
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        samples[i] = if denom > 0.0 { (b - a) / denom } else { 0.0 };
    }

    let average = samples.sum() / n as f64;
    Ok(Silhouette { average, samples })
}
