// Clustering engine: impute -> scale -> [reduce] -> k-means, scored with
// silhouettes and handed to a render sink one run at a time.

use std::collections::{BTreeMap, HashSet};

use ndarray::{Array1, Array2, Axis};
use rinkscope_core::{AnalysisError, FeatureMatrix, ReductionMode, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::kmeans::{fit_kmeans, resolve_seed};
use crate::preprocess::{transform, TransformedFeatures};
use crate::render::{ClusterPlot, OutputLayout, RenderSink};
use crate::silhouette::silhouette;

pub const DEFAULT_PROJECTION_X: &str = "PTS";
pub const DEFAULT_PROJECTION_Y: &str = "PIM";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Either a sweep over candidate counts or one final count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCounts {
    Sweep(Vec<usize>),
    Final(usize),
}

impl ClusterCounts {
    pub fn counts(&self) -> Vec<usize> {
        match self {
            ClusterCounts::Sweep(ks) => ks.clone(),
            ClusterCounts::Final(k) => vec![*k],
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, ClusterCounts::Final(_))
    }
}

/// Display name for one plotted row and whether it is called out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointLabel {
    pub name: String,
    /// Member of the computed reference subgroup.
    pub reference: bool,
    /// Named in the caller's manual highlight list.
    pub manual: bool,
}

impl PointLabel {
    pub fn is_flagged(&self) -> bool {
        self.reference || self.manual
    }
}

/// Flag every row whose name appears in either annotation set. The two
/// sets are independent and a row may carry both flags.
pub fn annotate(names: &[String], reference: &[String], manual: &[String]) -> Vec<PointLabel> {
    let reference: HashSet<&str> = reference.iter().map(String::as_str).collect();
    let manual: HashSet<&str> = manual.iter().map(String::as_str).collect();
    names
        .iter()
        .map(|name| PointLabel {
            name: name.clone(),
            reference: reference.contains(name.as_str()),
            manual: manual.contains(name.as_str()),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ClusterRequest<'a> {
    /// Used for output naming and titles.
    pub analysis: &'a str,
    pub features: &'a FeatureMatrix,
    /// Display name per row, in matrix order.
    pub names: &'a [String],
    pub reference: &'a [String],
    pub manual: &'a [String],
    pub counts: ClusterCounts,
    pub mode: ReductionMode,
    /// Title for a final run; sweeps are titled by cluster count.
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRun {
    pub n_clusters: usize,
    pub labels: Vec<usize>,
    pub silhouette_avg: f64,
    pub sample_silhouettes: Array1<f64>,
    /// 2D coordinates used for plotting, one row per input row.
    pub projection: Array2<f64>,
    pub inertia: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAnalysis {
    pub mode: ReductionMode,
    pub annotations: Vec<PointLabel>,
    pub runs: Vec<ClusterRun>,
    /// Per-component variance of the reduced space; `None` when unreduced.
    pub explained_variance: Option<Vec<f64>>,
}

impl ClusterAnalysis {
    /// Average silhouette per cluster count.
    pub fn silhouettes(&self) -> BTreeMap<usize, f64> {
        self.runs
            .iter()
            .map(|r| (r.n_clusters, r.silhouette_avg))
            .collect()
    }

    pub fn run(&self, n_clusters: usize) -> Option<&ClusterRun> {
        self.runs.iter().find(|r| r.n_clusters == n_clusters)
    }

    /// The count with the highest average silhouette.
    pub fn best(&self) -> Option<&ClusterRun> {
        self.runs
            .iter()
            .max_by(|a, b| a.silhouette_avg.total_cmp(&b.silhouette_avg))
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ClusterEngine {
    seed: Option<u64>,
    projection_x: String,
    projection_y: String,
    output: Option<OutputLayout>,
}

impl ClusterEngine {
    pub fn new(seed: Option<u64>) -> Self {
        ClusterEngine {
            seed,
            projection_x: DEFAULT_PROJECTION_X.to_string(),
            projection_y: DEFAULT_PROJECTION_Y.to_string(),
            output: None,
        }
    }

    /// Columns plotted for unreduced runs.
    pub fn with_projection_axes(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.projection_x = x.into();
        self.projection_y = y.into();
        self
    }

    /// Without a layout the sink is given no output path.
    pub fn with_output(mut self, layout: OutputLayout) -> Self {
        self.output = Some(layout);
        self
    }

    pub fn analyze(
        &self,
        request: &ClusterRequest<'_>,
        sink: &mut dyn RenderSink,
    ) -> Result<ClusterAnalysis> {
        let features = request.features;
        let rows = features.nrows();
        if rows == 0 {
            return Err(AnalysisError::EmptyInput(format!(
                "analysis `{}` has no rows to cluster",
                request.analysis
            )));
        }
        if request.names.len() != rows {
            return Err(AnalysisError::input_format(
                request.analysis,
                format!("{} names for {rows} feature rows", request.names.len()),
            ));
        }
        let counts = request.counts.counts();
        if let Some(&k) = counts.iter().find(|&&k| k >= rows) {
            return Err(AnalysisError::InsufficientData { clusters: k, rows });
        }

        let transformed = transform(features, request.mode)?;
        let projection = self.projection(features, &transformed, request.mode)?;
        let annotations = annotate(request.names, request.reference, request.manual);
        let (x_label, y_label) = match request.mode {
            ReductionMode::Reduced => ("PC1", "PC2"),
            ReductionMode::Unreduced => (self.projection_x.as_str(), self.projection_y.as_str()),
        };
        let seed = resolve_seed(self.seed);
        debug!(
            "Clustering `{}`: {rows} rows, {} dims, mode {}, seed {seed}",
            request.analysis,
            transformed.space.ncols(),
            request.mode.label()
        );

        let mut runs = Vec::with_capacity(counts.len());
        for k in counts {
            let fit = fit_kmeans(transformed.space.view(), k, seed)?;
            let labels = fit.labels.to_vec();
            let scores = silhouette(transformed.space.view(), &labels)?;
            info!(
                "For n_clusters = {k}, the average silhouette score is {:.6}",
                scores.average
            );

            let run = ClusterRun {
                n_clusters: k,
                labels,
                silhouette_avg: scores.average,
                sample_silhouettes: scores.samples,
                projection: projection.clone(),
                inertia: fit.inertia,
            };

            let (title, output) = if request.counts.is_final() {
                (
                    request.title.clone().unwrap_or_else(|| request.analysis.to_string()),
                    self.output.as_ref().map(|l| l.final_path(request.analysis)),
                )
            } else {
                (
                    format!("Silhouette analysis for KMeans clustering with n_clusters = {k}"),
                    self.output
                        .as_ref()
                        .map(|l| l.cluster_path(request.analysis, k, request.mode)),
                )
            };
            sink.render_cluster(&ClusterPlot {
                title,
                n_clusters: k,
                points: run.projection.view(),
                labels: &run.labels,
                silhouettes: run.sample_silhouettes.view(),
                silhouette_avg: run.silhouette_avg,
                annotations: &annotations,
                x_label,
                y_label,
                output,
            })?;
            runs.push(run);
        }

        Ok(ClusterAnalysis {
            mode: request.mode,
            annotations,
            runs,
            explained_variance: transformed.explained_variance.map(|v| v.to_vec()),
        })
    }

    /// Plot coordinates: the clustering space itself when reduced, else the
    /// standardized projection columns looked up by name.
    fn projection(
        &self,
        features: &FeatureMatrix,
        transformed: &TransformedFeatures,
        mode: ReductionMode,
    ) -> Result<Array2<f64>> {
        match mode {
            ReductionMode::Reduced => Ok(transformed.space.clone()),
            ReductionMode::Unreduced => {
                let x = features.require_column(&self.projection_x)?;
                let y = features.require_column(&self.projection_y)?;
                Ok(transformed.scaled.select(Axis(1), &[x, y]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{NoopSink, ScreePlot};
    use std::path::PathBuf;

    const COLUMNS: [&str; 4] = ["Rk", "PTS", "PIM", "GP"];

    /// Twenty rows in three tight groups: scorers, enforcers, depth players.
    fn players() -> (FeatureMatrix, Vec<String>) {
        let centers = [
            [10.0, 90.0, 20.0, 80.0],
            [200.0, 10.0, 250.0, 70.0],
            [120.0, 35.0, 60.0, 40.0],
        ];
        let sizes = [7, 7, 6];
        let mut rows = Vec::new();
        let mut names = Vec::new();
        for (c, (center, size)) in centers.iter().zip(sizes).enumerate() {
            for i in 0..size {
                let d = i as f64;
                rows.push(vec![
                    Some(center[0] + d),
                    Some(center[1] - d * 0.5),
                    if c == 2 && i == 3 { None } else { Some(center[2] + d) },
                    Some(center[3] - d * 0.3),
                ]);
                names.push(format!("player-{c}-{i}"));
            }
        }
        let cols = COLUMNS.iter().map(|c| c.to_string()).collect();
        (FeatureMatrix::from_rows(cols, &rows).unwrap(), names)
    }

    fn request<'a>(
        features: &'a FeatureMatrix,
        names: &'a [String],
        reference: &'a [String],
        counts: ClusterCounts,
        mode: ReductionMode,
    ) -> ClusterRequest<'a> {
        ClusterRequest {
            analysis: "test",
            features,
            names,
            reference,
            manual: &[],
            counts,
            mode,
            title: None,
        }
    }

    #[derive(Default)]
    struct Recorder {
        titles: Vec<String>,
        outputs: Vec<Option<PathBuf>>,
        flagged: Vec<usize>,
        point_dims: Vec<(usize, usize)>,
    }

    impl RenderSink for Recorder {
        fn render_cluster(&mut self, plot: &ClusterPlot<'_>) -> Result<()> {
            self.titles.push(plot.title.clone());
            self.outputs.push(plot.output.clone());
            self.flagged
                .push(plot.annotations.iter().filter(|a| a.is_flagged()).count());
            self.point_dims.push(plot.points.dim());
            Ok(())
        }

        fn render_scree(&mut self, _plot: &ScreePlot<'_>) -> Result<()> {
            Ok(())
        }
    }

    struct FailingSink;

    impl RenderSink for FailingSink {
        fn render_cluster(&mut self, _plot: &ClusterPlot<'_>) -> Result<()> {
            Err(AnalysisError::Render("disk full".into()))
        }

        fn render_scree(&mut self, _plot: &ScreePlot<'_>) -> Result<()> {
            Ok(())
        }
    }

    // -- Core behaviour --

    #[test]
    fn twenty_players_three_clusters_label_every_row() {
        let (fm, names) = players();
        for mode in [ReductionMode::Reduced, ReductionMode::Unreduced] {
            let analysis = ClusterEngine::new(Some(671))
                .analyze(
                    &request(&fm, &names, &[], ClusterCounts::Final(3), mode),
                    &mut NoopSink,
                )
                .unwrap();
            let run = &analysis.runs[0];
            assert_eq!(run.labels.len(), 20);
            let distinct: HashSet<usize> = run.labels.iter().copied().collect();
            assert_eq!(distinct.len(), 3);
            // Rows of each group share a label.
            assert!(run.labels[..7].iter().all(|&l| l == run.labels[0]));
            assert!(run.labels[7..14].iter().all(|&l| l == run.labels[7]));
            assert!(run.labels[14..].iter().all(|&l| l == run.labels[14]));
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let (fm, names) = players();
        let engine = ClusterEngine::new(Some(9));
        let sweep = ClusterCounts::Sweep(vec![2, 3, 4]);
        let a = engine
            .analyze(&request(&fm, &names, &[], sweep.clone(), ReductionMode::Reduced), &mut NoopSink)
            .unwrap();
        let b = engine
            .analyze(&request(&fm, &names, &[], sweep, ReductionMode::Reduced), &mut NoopSink)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn silhouette_averages_are_bounded() {
        let (fm, names) = players();
        let analysis = ClusterEngine::new(Some(1))
            .analyze(
                &request(&fm, &names, &[], ClusterCounts::Sweep(vec![2, 3, 4, 5, 6]), ReductionMode::Unreduced),
                &mut NoopSink,
            )
            .unwrap();
        let scores = analysis.silhouettes();
        assert_eq!(scores.keys().copied().collect::<Vec<_>>(), vec![2, 3, 4, 5, 6]);
        assert!(scores.values().all(|s| (-1.0..=1.0).contains(s)));
        assert_eq!(analysis.best().map(|r| r.n_clusters), Some(3));
    }

    #[test]
    fn explained_variance_only_for_reduced_runs() {
        let (fm, names) = players();
        let engine = ClusterEngine::new(Some(2));
        let reduced = engine
            .analyze(&request(&fm, &names, &[], ClusterCounts::Final(3), ReductionMode::Reduced), &mut NoopSink)
            .unwrap();
        let variance = reduced.explained_variance.unwrap();
        assert_eq!(variance.len(), 2);
        assert!(variance[0] >= variance[1]);
        assert!(variance[1] >= 0.0);

        let unreduced = engine
            .analyze(&request(&fm, &names, &[], ClusterCounts::Final(3), ReductionMode::Unreduced), &mut NoopSink)
            .unwrap();
        assert!(unreduced.explained_variance.is_none());
    }

    #[test]
    fn unreduced_projection_uses_named_standardized_columns() {
        let (fm, names) = players();
        let analysis = ClusterEngine::new(Some(4))
            .with_projection_axes("PIM", "GP")
            .analyze(
                &request(&fm, &names, &[], ClusterCounts::Final(3), ReductionMode::Unreduced),
                &mut NoopSink,
            )
            .unwrap();
        let projection = &analysis.runs[0].projection;
        let expected = transform(&fm, ReductionMode::Unreduced).unwrap().scaled;
        assert_eq!(projection.column(0), expected.column(2));
        assert_eq!(projection.column(1), expected.column(3));
    }

    #[test]
    fn missing_projection_column_is_input_format_error() {
        let (fm, names) = players();
        let err = ClusterEngine::new(Some(4))
            .with_projection_axes("S%", "PIM")
            .analyze(
                &request(&fm, &names, &[], ClusterCounts::Final(2), ReductionMode::Unreduced),
                &mut NoopSink,
            )
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InputFormat { .. }));
    }

    // -- Annotation and rendering --

    #[test]
    fn annotations_keep_both_flag_sets() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let labels = annotate(&names, &["b".to_string()], &["b".to_string(), "c".to_string(), "zz".to_string()]);
        assert_eq!(
            labels,
            vec![
                PointLabel { name: "a".into(), reference: false, manual: false },
                PointLabel { name: "b".into(), reference: true, manual: true },
                PointLabel { name: "c".into(), reference: false, manual: true },
            ]
        );
    }

    #[test]
    fn sink_gets_one_plot_per_count_with_layout_paths() {
        let (fm, names) = players();
        let reference = vec![names[8].clone(), names[9].clone()];
        let mut recorder = Recorder::default();
        ClusterEngine::new(Some(2))
            .with_output(OutputLayout::new("figs"))
            .analyze(
                &request(&fm, &names, &reference, ClusterCounts::Sweep(vec![2, 3]), ReductionMode::Unreduced),
                &mut recorder,
            )
            .unwrap();
        assert_eq!(
            recorder.outputs,
            vec![
                Some(PathBuf::from("figs/cluster_plots/test/2pca.svg")),
                Some(PathBuf::from("figs/cluster_plots/test/3pca.svg")),
            ]
        );
        assert_eq!(recorder.flagged, vec![2, 2]);
        assert_eq!(recorder.point_dims, vec![(20, 2), (20, 2)]);
        assert!(recorder.titles[0].ends_with("n_clusters = 2"));
    }

    #[test]
    fn final_run_uses_title_and_flat_path() {
        let (fm, names) = players();
        let mut recorder = Recorder::default();
        let mut req = request(&fm, &names, &[], ClusterCounts::Final(3), ReductionMode::Reduced);
        req.title = Some("Plot of Forwards".into());
        ClusterEngine::new(Some(2))
            .with_output(OutputLayout::new("figs"))
            .analyze(&req, &mut recorder)
            .unwrap();
        assert_eq!(recorder.titles, vec!["Plot of Forwards".to_string()]);
        assert_eq!(
            recorder.outputs,
            vec![Some(PathBuf::from("figs/cluster_plots/final_clusters/test.svg"))]
        );
    }

    #[test]
    fn render_failure_propagates() {
        let (fm, names) = players();
        let err = ClusterEngine::new(Some(2))
            .analyze(
                &request(&fm, &names, &[], ClusterCounts::Final(3), ReductionMode::Reduced),
                &mut FailingSink,
            )
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Render(_)));
    }

    // -- Errors --

    #[test]
    fn cluster_count_at_or_above_rows_is_insufficient_data() {
        let (fm, names) = players();
        let err = ClusterEngine::new(Some(1))
            .analyze(
                &request(&fm, &names, &[], ClusterCounts::Sweep(vec![2, 20]), ReductionMode::Reduced),
                &mut NoopSink,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientData { clusters: 20, rows: 20 }
        ));
    }

    #[test]
    fn single_cluster_is_degenerate() {
        let (fm, names) = players();
        let err = ClusterEngine::new(Some(1))
            .analyze(
                &request(&fm, &names, &[], ClusterCounts::Final(1), ReductionMode::Reduced),
                &mut NoopSink,
            )
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateCluster { distinct: 1, rows: 20 }));
    }

    #[test]
    fn empty_group_is_empty_input() {
        let cols = COLUMNS.iter().map(|c| c.to_string()).collect();
        let fm = FeatureMatrix::from_rows(cols, &[]).unwrap();
        let err = ClusterEngine::new(Some(1))
            .analyze(
                &request(&fm, &[], &[], ClusterCounts::Final(2), ReductionMode::Reduced),
                &mut NoopSink,
            )
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput(_)));
    }
}
