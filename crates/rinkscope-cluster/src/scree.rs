// Inertia trajectory for elbow-point selection of the cluster count.

use rinkscope_core::{AnalysisError, FeatureMatrix, ReductionMode, Result};
use serde::Serialize;
use tracing::info;

use crate::kmeans::{fit_kmeans, resolve_seed};
use crate::preprocess::transform;
use crate::render::{OutputLayout, RenderSink, ScreePlot};

pub const DEFAULT_SCREE_MAX_CLUSTERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreePoint {
    pub n_clusters: usize,
    /// Within-cluster sum of squares.
    pub inertia: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeScores {
    pub mode: ReductionMode,
    pub points: Vec<ScreePoint>,
}

impl ScreeScores {
    pub fn inertias(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.inertia).collect()
    }
}

/// Fits k = 1..=`max_clusters` independently over one transform.
#[derive(Debug, Clone)]
pub struct ScreeScorer {
    seed: Option<u64>,
    max_clusters: usize,
}

impl ScreeScorer {
    pub fn new(seed: Option<u64>) -> Self {
        ScreeScorer {
            seed,
            max_clusters: DEFAULT_SCREE_MAX_CLUSTERS,
        }
    }

    pub fn with_max_clusters(mut self, max_clusters: usize) -> Self {
        self.max_clusters = max_clusters;
        self
    }

    pub fn score(&self, features: &FeatureMatrix, mode: ReductionMode) -> Result<ScreeScores> {
        if features.is_empty() {
            return Err(AnalysisError::EmptyInput(
                "scree scoring needs at least one row".into(),
            ));
        }
        if features.nrows() < self.max_clusters {
            return Err(AnalysisError::InsufficientData {
                clusters: self.max_clusters,
                rows: features.nrows(),
            });
        }

        let transformed = transform(features, mode)?;
        let seed = resolve_seed(self.seed);
        let mut points = Vec::with_capacity(self.max_clusters);
        for k in 1..=self.max_clusters {
            let fit = fit_kmeans(transformed.space.view(), k, seed)?;
            info!("Scree k = {k}: inertia {:.4}", fit.inertia);
            points.push(ScreePoint {
                n_clusters: k,
                inertia: fit.inertia,
            });
        }
        Ok(ScreeScores { mode, points })
    }

    /// Score, then hand the trajectory to `sink`.
    pub fn score_and_render(
        &self,
        analysis: &str,
        features: &FeatureMatrix,
        mode: ReductionMode,
        sink: &mut dyn RenderSink,
        layout: Option<&OutputLayout>,
    ) -> Result<ScreeScores> {
        let scores = self.score(features, mode)?;
        sink.render_scree(&ScreePlot {
            title: format!("Scree plot: {analysis}"),
            points: &scores.points,
            output: layout.map(|l| l.scree_path(analysis)),
        })?;
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{ClusterPlot, NoopSink};
    use ndarray::Array2;

    fn blobs(rows_per_blob: usize) -> FeatureMatrix {
        let centers = [[0.0, 0.0, 0.0], [20.0, 0.0, 5.0], [0.0, 20.0, 10.0]];
        let mut flat = Vec::new();
        for center in centers {
            for i in 0..rows_per_blob {
                let jitter = i as f64 * 0.1;
                flat.extend([center[0] + jitter, center[1] - jitter, center[2] + jitter * 0.5]);
            }
        }
        let values = Array2::from_shape_vec((rows_per_blob * 3, 3), flat).unwrap();
        FeatureMatrix::new(vec!["PTS".into(), "PIM".into(), "GP".into()], values).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        scree_outputs: Vec<Option<std::path::PathBuf>>,
        scree_lengths: Vec<usize>,
    }

    impl RenderSink for Recorder {
        fn render_cluster(&mut self, _plot: &ClusterPlot<'_>) -> Result<()> {
            Ok(())
        }

        fn render_scree(&mut self, plot: &ScreePlot<'_>) -> Result<()> {
            self.scree_outputs.push(plot.output.clone());
            self.scree_lengths.push(plot.points.len());
            Ok(())
        }
    }

    #[test]
    fn trajectory_covers_one_through_max() {
        let scores = ScreeScorer::new(Some(3))
            .score(&blobs(4), ReductionMode::Unreduced)
            .unwrap();
        let ks: Vec<usize> = scores.points.iter().map(|p| p.n_clusters).collect();
        assert_eq!(ks, vec![1, 2, 3, 4, 5]);
        assert!(scores.points.iter().all(|p| p.inertia >= 0.0));
    }

    #[test]
    fn inertia_drops_sharply_at_true_cluster_count() {
        let scores = ScreeScorer::new(Some(11))
            .score(&blobs(5), ReductionMode::Reduced)
            .unwrap();
        let inertias = scores.inertias();
        assert!(inertias[0] > inertias[1]);
        assert!(inertias[1] > inertias[2]);
        // The elbow at k = 3 leaves almost nothing.
        assert!(inertias[2] < 0.05 * inertias[0]);
    }

    #[test]
    fn seeded_scores_repeat() {
        let scorer = ScreeScorer::new(Some(5)).with_max_clusters(4);
        let a = scorer.score(&blobs(3), ReductionMode::Reduced).unwrap();
        let b = scorer.score(&blobs(3), ReductionMode::Reduced).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let err = ScreeScorer::new(Some(1))
            .with_max_clusters(7)
            .score(&blobs(2), ReductionMode::Unreduced)
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientData { clusters: 7, rows: 6 }
        ));
    }

    #[test]
    fn render_receives_trajectory_and_path() {
        let mut recorder = Recorder::default();
        let layout = OutputLayout::new("figs");
        ScreeScorer::new(Some(2))
            .score_and_render("eighties", &blobs(3), ReductionMode::Unreduced, &mut recorder, Some(&layout))
            .unwrap();
        assert_eq!(recorder.scree_lengths, vec![5]);
        assert_eq!(
            recorder.scree_outputs,
            vec![Some(std::path::PathBuf::from("figs/scree_plots/eighties.svg"))]
        );

        let scores = ScreeScorer::new(Some(2))
            .score_and_render("eighties", &blobs(3), ReductionMode::Unreduced, &mut NoopSink, None)
            .unwrap();
        assert_eq!(scores.points.len(), 5);
    }
}
