// Median imputation and standard scaling, plus the transform that feeds
// both the clustering engine and the scree scorer.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rinkscope_core::{AnalysisError, FeatureMatrix, ReductionMode, Result};
use tracing::debug;

use crate::reduce::Pca;

/// Scales below this are treated as zero variance and left at 1.0.
const MIN_SCALE: f64 = 10.0 * f64::EPSILON;

/// Number of components kept in reduced mode.
pub const REDUCED_COMPONENTS: usize = 2;

// ---------------------------------------------------------------------------
// Column statistics
// ---------------------------------------------------------------------------

/// Median of the non-missing values, or `None` when every value is missing.
pub fn median(values: ArrayView1<'_, f64>) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

// ---------------------------------------------------------------------------
// Fitted preprocessor
// ---------------------------------------------------------------------------

/// Per-column medians (for imputation) and mean/scale (for standardizing),
/// learned from one matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedPreprocessor {
    medians: Array1<f64>,
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl FittedPreprocessor {
    pub fn fit(values: ArrayView2<'_, f64>) -> Result<Self> {
        if values.nrows() == 0 {
            return Err(AnalysisError::EmptyInput(
                "cannot fit preprocessing on an empty matrix".into(),
            ));
        }
        let medians: Array1<f64> = values
            .axis_iter(Axis(1))
            .map(|col| median(col).unwrap_or(0.0))
            .collect();

        let imputed = impute_with(values, &medians);
        let n = imputed.nrows() as f64;
        let means: Array1<f64> = imputed
            .axis_iter(Axis(1))
            .map(|col| col.sum() / n)
            .collect();
        let scales: Array1<f64> = imputed
            .axis_iter(Axis(1))
            .zip(means.iter())
            .map(|(col, mean)| {
                let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std < MIN_SCALE {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(FittedPreprocessor {
            medians,
            means,
            scales,
        })
    }

    /// Replace missing cells with the column median.
    pub fn impute(&self, values: ArrayView2<'_, f64>) -> Array2<f64> {
        impute_with(values, &self.medians)
    }

    /// Impute, then center and scale every column.
    pub fn standardize(&self, values: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = self.impute(values);
        for (mut col, (mean, scale)) in out
            .axis_iter_mut(Axis(1))
            .zip(self.means.iter().zip(self.scales.iter()))
        {
            col.mapv_inplace(|v| (v - mean) / scale);
        }
        out
    }
}

fn impute_with(values: ArrayView2<'_, f64>, medians: &Array1<f64>) -> Array2<f64> {
    let mut out = values.to_owned();
    for (mut col, median) in out.axis_iter_mut(Axis(1)).zip(medians.iter()) {
        col.mapv_inplace(|v| if v.is_nan() { *median } else { v });
    }
    out
}

// ---------------------------------------------------------------------------
// Pipeline transform
// ---------------------------------------------------------------------------

/// Output of impute -> scale -> [reduce].
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedFeatures {
    /// Standardized full-width matrix, same columns as the input.
    pub scaled: Array2<f64>,
    /// The space clustering runs in: `scaled` itself, or its two
    /// principal components in reduced mode.
    pub space: Array2<f64>,
    /// Variance captured by each kept component; `None` when unreduced.
    pub explained_variance: Option<Array1<f64>>,
}

pub fn transform(features: &FeatureMatrix, mode: ReductionMode) -> Result<TransformedFeatures> {
    if features.is_empty() {
        return Err(AnalysisError::EmptyInput(
            "feature matrix has no rows".into(),
        ));
    }
    let missing = features.missing_count();
    if missing > 0 {
        debug!("Imputing {missing} missing cells with column medians");
    }
    let pre = FittedPreprocessor::fit(features.values())?;
    let scaled = pre.standardize(features.values());
    let (space, explained_variance) = match mode {
        ReductionMode::Reduced => {
            let pca = Pca::fit(scaled.view(), REDUCED_COMPONENTS)?;
            (pca.transform(scaled.view()), Some(pca.explained_variance().clone()))
        }
        ReductionMode::Unreduced => (scaled.clone(), None),
    };
    Ok(TransformedFeatures {
        scaled,
        space,
        explained_variance,
    })
}
