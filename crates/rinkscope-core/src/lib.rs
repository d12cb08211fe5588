// Shared building blocks for the rinkscope crates: the error taxonomy,
// configuration loading, and the feature matrix passed between the data and
// clustering layers.

pub mod config;
pub mod error;
pub mod features;

pub use error::{AnalysisError, Result};
pub use features::{FeatureMatrix, ReductionMode};
