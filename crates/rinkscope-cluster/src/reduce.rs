// Principal component analysis on a standardized matrix.
//
// The covariance matrix is diagonalized with cyclic Jacobi rotations, which
// is deterministic for a given input, so repeated runs project identically.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rinkscope_core::{AnalysisError, Result};

const MAX_SWEEPS: usize = 100;
const OFF_DIAGONAL_TOLERANCE: f64 = 1e-22;

#[derive(Debug, Clone, PartialEq)]
pub struct Pca {
    mean: Array1<f64>,
    /// One component per row, strongest first.
    components: Array2<f64>,
    explained_variance: Array1<f64>,
}

impl Pca {
    pub fn fit(data: ArrayView2<'_, f64>, n_components: usize) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows == 0 {
            return Err(AnalysisError::EmptyInput(
                "cannot fit principal components on an empty matrix".into(),
            ));
        }
        if n_components == 0 || n_components > cols {
            return Err(AnalysisError::input_format(
                "principal components",
                format!("cannot keep {n_components} components of {cols} features"),
            ));
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| AnalysisError::EmptyInput("no rows to center".into()))?;
        let centered = &data - &mean;
        let denom = rows.saturating_sub(1).max(1) as f64;
        let covariance = centered.t().dot(&centered) / denom;

        let (eigenvalues, eigenvectors) = symmetric_eigen(covariance);

        let mut order: Vec<usize> = (0..cols).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

        let mut components = Array2::zeros((n_components, cols));
        let mut explained_variance = Array1::zeros(n_components);
        for (row, &idx) in order.iter().take(n_components).enumerate() {
            let mut vector = eigenvectors.column(idx).to_owned();
            if needs_flip(vector.view()) {
                vector.mapv_inplace(|v| -v);
            }
            components.row_mut(row).assign(&vector);
            explained_variance[row] = eigenvalues[idx].max(0.0);
        }

        Ok(Pca {
            mean,
            components,
            explained_variance,
        })
    }

    /// Eigenvalue of each kept component, strongest first.
    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        let centered = &data - &self.mean;
        centered.dot(&self.components.t())
    }
}

/// A component is flipped when its largest-magnitude loading is negative.
fn needs_flip(vector: ndarray::ArrayView1<'_, f64>) -> bool {
    let mut best = 0.0_f64;
    for &v in vector.iter() {
        if v.abs() > best.abs() {
            best = v;
        }
    }
    best < 0.0
}

/// Eigenvalues and eigenvectors (as columns) of a symmetric matrix.
fn symmetric_eigen(mut a: Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::<f64>::eye(n);

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        if off < OFF_DIAGONAL_TOLERANCE {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    (a.diag().to_owned(), v)
}
