// Rendering seam: the engine hands finished runs to a sink and never draws
// anything itself.

use std::path::PathBuf;

use ndarray::{ArrayView1, ArrayView2};
use rinkscope_core::{ReductionMode, Result};

use crate::engine::PointLabel;
use crate::scree::ScreePoint;

/// Everything needed to draw one clustering run.
#[derive(Debug, Clone)]
pub struct ClusterPlot<'a> {
    pub title: String,
    pub n_clusters: usize,
    /// One 2D point per row.
    pub points: ArrayView2<'a, f64>,
    pub labels: &'a [usize],
    pub silhouettes: ArrayView1<'a, f64>,
    pub silhouette_avg: f64,
    pub annotations: &'a [PointLabel],
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// `None` means nothing is written.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ScreePlot<'a> {
    pub title: String,
    pub points: &'a [ScreePoint],
    pub output: Option<PathBuf>,
}

pub trait RenderSink {
    fn render_cluster(&mut self, plot: &ClusterPlot<'_>) -> Result<()>;
    fn render_scree(&mut self, plot: &ScreePlot<'_>) -> Result<()>;
}

/// Discards every plot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl RenderSink for NoopSink {
    fn render_cluster(&mut self, _plot: &ClusterPlot<'_>) -> Result<()> {
        Ok(())
    }

    fn render_scree(&mut self, _plot: &ScreePlot<'_>) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output naming
// ---------------------------------------------------------------------------

pub const FIGURE_EXTENSION: &str = "svg";
const CLUSTER_DIR: &str = "cluster_plots";
const FINAL_DIR: &str = "final_clusters";
const SCREE_DIR: &str = "scree_plots";

/// Where each figure lands under the figures directory.
///
/// ```text
/// cluster_plots/<analysis>/<k>.svg        reduced sweep
/// cluster_plots/<analysis>/<k>pca.svg     unreduced sweep
/// cluster_plots/final_clusters/<analysis>.svg
/// scree_plots/<analysis>.svg
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    figures_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(figures_dir: impl Into<PathBuf>) -> Self {
        OutputLayout {
            figures_dir: figures_dir.into(),
        }
    }

    pub fn cluster_path(&self, analysis: &str, n_clusters: usize, mode: ReductionMode) -> PathBuf {
        // Unreduced runs carry the legacy "pca" suffix.
        let suffix = match mode {
            ReductionMode::Reduced => "",
            ReductionMode::Unreduced => "pca",
        };
        self.figures_dir
            .join(CLUSTER_DIR)
            .join(analysis)
            .join(format!("{n_clusters}{suffix}.{FIGURE_EXTENSION}"))
    }

    pub fn final_path(&self, analysis: &str) -> PathBuf {
        self.figures_dir
            .join(CLUSTER_DIR)
            .join(FINAL_DIR)
            .join(format!("{analysis}.{FIGURE_EXTENSION}"))
    }

    pub fn scree_path(&self, analysis: &str) -> PathBuf {
        self.figures_dir
            .join(SCREE_DIR)
            .join(format!("{analysis}.{FIGURE_EXTENSION}"))
    }
}
