// Numeric feature matrix handed from the data layer to the clustering layer.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Reduction mode
// ---------------------------------------------------------------------------

/// Whether the standardized features are projected to two principal
/// components before clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionMode {
    Reduced,
    Unreduced,
}

impl ReductionMode {
    pub fn label(&self) -> &'static str {
        match self {
            ReductionMode::Reduced => "reduced",
            ReductionMode::Unreduced => "unreduced",
        }
    }
}

// ---------------------------------------------------------------------------
// Feature matrix
// ---------------------------------------------------------------------------

/// Row-major numeric projection of a player group with named columns.
///
/// Missing cells are stored as `NaN` and are resolved by the imputation
/// stage of the clustering pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(AnalysisError::input_format(
                "feature matrix",
                format!(
                    "{} column names for {} value columns",
                    columns.len(),
                    values.ncols()
                ),
            ));
        }
        Ok(FeatureMatrix { columns, values })
    }

    /// Build a matrix from per-row vectors. `None` cells become `NaN`.
    pub fn from_rows(columns: Vec<String>, rows: &[Vec<Option<f64>>]) -> Result<Self> {
        let width = columns.len();
        let mut flat = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(AnalysisError::input_format(
                    "feature matrix",
                    format!("row {i} has {} cells, expected {width}", row.len()),
                ));
            }
            flat.extend(row.iter().map(|v| v.unwrap_or(f64::NAN)));
        }
        let values = Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| AnalysisError::input_format("feature matrix", e.to_string()))?;
        Ok(FeatureMatrix { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`column_index`](Self::column_index) but fails with an input
    /// format error naming the missing column.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            AnalysisError::input_format("feature matrix", format!("missing column `{name}`"))
        })
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name)
            .map(|idx| self.values.index_axis(Axis(1), idx))
    }

    /// Number of cells that are missing (`NaN`).
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}
