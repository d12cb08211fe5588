// Error taxonomy shared by the loading, combining and clustering stages.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Source data is missing required columns or is otherwise malformed.
    #[error("input format error in {source_name}: {message}")]
    InputFormat {
        source_name: String,
        message: String,
    },

    /// No season files, or an empty group handed to an operation that
    /// needs at least one row.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// The requested cluster count cannot be satisfied by the row count.
    #[error("insufficient data: requested {clusters} clusters for {rows} rows")]
    InsufficientData { clusters: usize, rows: usize },

    /// The quality metric is undefined for the resulting partition.
    #[error("degenerate clustering: {distinct} distinct label(s) across {rows} rows")]
    DegenerateCluster { distinct: usize, rows: usize },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    /// The clustering backend rejected its parameters or failed to fit.
    #[error("model fit failed: {0}")]
    Fit(String),

    #[error("rendering failed: {0}")]
    Render(String),
}

impl AnalysisError {
    pub fn input_format(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::InputFormat {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}
