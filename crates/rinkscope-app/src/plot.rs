// SVG rendering of cluster and scree figures with plotters.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::PaletteColor;
use rinkscope_cluster::{ClusterPlot, RenderSink, ScreePlot};
use rinkscope_core::{AnalysisError, Result};
use tracing::info;

const CLUSTER_FIGURE_SIZE: (u32, u32) = (1400, 700);
const SCREE_FIGURE_SIZE: (u32, u32) = (800, 600);
/// Vertical gap between clusters in the silhouette panel, in sample rows.
const SILHOUETTE_GAP: usize = 10;
const MANUAL_HIGHLIGHT: RGBColor = RGBColor(255, 140, 0);

type DrawResult = std::result::Result<(), Box<dyn Error>>;

/// Writes each figure that carries an output path as an SVG file.
#[derive(Debug, Default)]
pub struct SvgSink {
    written: Vec<PathBuf>,
}

impl SvgSink {
    pub fn new() -> Self {
        SvgSink::default()
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn finish(&mut self, path: &Path, drawn: DrawResult) -> Result<()> {
        drawn.map_err(|e| AnalysisError::Render(format!("{}: {e}", path.display())))?;
        info!("Wrote figure {}", path.display());
        self.written.push(path.to_path_buf());
        Ok(())
    }
}

impl RenderSink for SvgSink {
    fn render_cluster(&mut self, plot: &ClusterPlot<'_>) -> Result<()> {
        let Some(path) = plot.output.as_deref() else {
            return Ok(());
        };
        ensure_parent(path)?;
        let drawn = draw_cluster(path, plot);
        self.finish(path, drawn)
    }

    fn render_scree(&mut self, plot: &ScreePlot<'_>) -> Result<()> {
        let Some(path) = plot.output.as_deref() else {
            return Ok(());
        };
        ensure_parent(path)?;
        let drawn = draw_scree(path, plot);
        self.finish(path, drawn)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Cluster figure
// ---------------------------------------------------------------------------

fn distinct_labels(labels: &[usize]) -> Vec<usize> {
    let mut distinct = labels.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    distinct
}

fn cluster_color(distinct: &[usize], label: usize) -> PaletteColor<Palette99> {
    Palette99::pick(distinct.binary_search(&label).unwrap_or(0))
}

fn draw_cluster(path: &Path, plot: &ClusterPlot<'_>) -> DrawResult {
    let root = SVGBackend::new(path, CLUSTER_FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&plot.title, ("sans-serif", 24))?;
    let panels = root.split_evenly((1, 2));
    draw_silhouette_panel(&panels[0], plot)?;
    draw_scatter_panel(&panels[1], plot)?;
    root.present()?;
    Ok(())
}

fn draw_silhouette_panel(area: &DrawingArea<SVGBackend<'_>, Shift>, plot: &ClusterPlot<'_>) -> DrawResult {
    let distinct = distinct_labels(plot.labels);
    let rows = plot.labels.len();
    let y_max = (rows + (distinct.len() + 1) * SILHOUETTE_GAP) as f64;
    let x_min = plot.silhouettes.iter().copied().fold(-0.1_f64, f64::min);

    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("Silhouette plot for {} clusters", plot.n_clusters),
            ("sans-serif", 18),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(30)
        .build_cartesian_2d(x_min..1.0_f64, 0.0..y_max)?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_desc("Silhouette coefficient values")
        .y_desc("Cluster label")
        .draw()?;

    let mut y_lower = SILHOUETTE_GAP as f64;
    for &label in &distinct {
        let mut values: Vec<f64> = plot
            .labels
            .iter()
            .zip(plot.silhouettes.iter())
            .filter(|(l, _)| **l == label)
            .map(|(_, s)| *s)
            .collect();
        values.sort_by(f64::total_cmp);
        let style = cluster_color(&distinct, label).mix(0.7).filled();
        chart.draw_series(values.iter().enumerate().map(|(i, v)| {
            let y = y_lower + i as f64;
            Rectangle::new([(0.0, y), (*v, y + 1.0)], style)
        }))?;
        chart.draw_series(std::iter::once(Text::new(
            label.to_string(),
            (x_min + 0.02, y_lower + values.len() as f64 / 2.0),
            ("sans-serif", 14).into_font(),
        )))?;
        y_lower += (values.len() + SILHOUETTE_GAP) as f64;
    }

    let avg = plot.silhouette_avg;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(avg, 0.0), (avg, y_max)],
        RED.stroke_width(2),
    )))?;
    Ok(())
}

/// Axis range covering `values` with a small margin.
fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return -1.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.08 } else { 1.0 };
    (lo - pad)..(hi + pad)
}

fn draw_scatter_panel(area: &DrawingArea<SVGBackend<'_>, Shift>, plot: &ClusterPlot<'_>) -> DrawResult {
    let distinct = distinct_labels(plot.labels);
    let points: Vec<(f64, f64)> = plot
        .points
        .outer_iter()
        .map(|row| (row[0], row[1]))
        .collect();
    let x_range = padded_range(points.iter().map(|p| p.0));
    let y_range = padded_range(points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(area)
        .caption("Visualization of the clustered data", ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc(plot.x_label)
        .y_desc(plot.y_label)
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .zip(plot.labels)
            .map(|(&p, &label)| Circle::new(p, 4, cluster_color(&distinct, label).mix(0.8).filled())),
    )?;

    for (&p, annotation) in points.iter().zip(plot.annotations) {
        if !annotation.is_flagged() {
            continue;
        }
        let color = if annotation.manual {
            MANUAL_HIGHLIGHT
        } else {
            BLACK
        };
        if annotation.manual {
            chart.draw_series(std::iter::once(Circle::new(p, 7, color.stroke_width(2))))?;
        }
        chart.draw_series(std::iter::once(Text::new(
            annotation.name.clone(),
            p,
            ("sans-serif", 12).into_font().color(&color),
        )))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scree figure
// ---------------------------------------------------------------------------

fn draw_scree(path: &Path, plot: &ScreePlot<'_>) -> DrawResult {
    let root = SVGBackend::new(path, SCREE_FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let max_k = plot.points.iter().map(|p| p.n_clusters).max().unwrap_or(1) as f64;
    let max_inertia = plot
        .points
        .iter()
        .map(|p| p.inertia)
        .fold(0.0_f64, f64::max);
    let y_top = if max_inertia > 0.0 { max_inertia * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(&root)
        .caption(&plot.title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.5..(max_k + 0.5), 0.0..y_top)?;
    chart
        .configure_mesh()
        .x_desc("Number of clusters")
        .y_desc("Inertia")
        .draw()?;

    let coords: Vec<(f64, f64)> = plot
        .points
        .iter()
        .map(|p| (p.n_clusters as f64, p.inertia))
        .collect();
    chart.draw_series(LineSeries::new(coords.iter().copied(), &BLUE))?;
    chart.draw_series(coords.iter().map(|&c| Circle::new(c, 5, BLUE.filled())))?;

    root.present()?;
    Ok(())
}
