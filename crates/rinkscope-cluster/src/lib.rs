// Clustering layer: preprocessing, principal components, seeded k-means,
// silhouette scoring, the clustering engine and the scree scorer.

pub mod engine;
pub mod kmeans;
pub mod preprocess;
pub mod reduce;
pub mod render;
pub mod scree;
pub mod silhouette;

pub use engine::{
    annotate, ClusterAnalysis, ClusterCounts, ClusterEngine, ClusterRequest, ClusterRun,
    PointLabel,
};
pub use render::{ClusterPlot, NoopSink, OutputLayout, RenderSink, ScreePlot};
pub use scree::{ScreePoint, ScreeScorer, ScreeScores};
