// JSON summary and per-player assignment CSV written after each analysis.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use rinkscope_cluster::{ClusterAnalysis, ScreePoint};
use rinkscope_core::config::RoleSelection;
use rinkscope_core::ReductionMode;
use serde::Serialize;
use tracing::info;

use crate::pipeline::AnalysisOutcome;

#[derive(Debug, Clone, Serialize)]
pub struct FinalRunSummary {
    pub n_clusters: usize,
    pub silhouette_avg: f64,
    /// Rows per cluster label.
    pub cluster_sizes: BTreeMap<usize, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis: String,
    pub generated_at: DateTime<Utc>,
    pub cohort: String,
    pub role: RoleSelection,
    pub mode: ReductionMode,
    pub rows: usize,
    pub reference_subgroup: Vec<String>,
    /// Average silhouette per swept cluster count.
    pub silhouettes: BTreeMap<usize, f64>,
    /// Swept count with the highest average silhouette.
    pub best_n_clusters: Option<usize>,
    /// Variance captured by each principal component, reduced mode only.
    pub explained_variance: Option<Vec<f64>>,
    pub scree: Option<Vec<ScreePoint>>,
    pub final_run: Option<FinalRunSummary>,
}

impl AnalysisReport {
    pub fn from_outcome(outcome: &AnalysisOutcome) -> Self {
        AnalysisReport {
            analysis: outcome.name.clone(),
            generated_at: Utc::now(),
            cohort: outcome.cohort.clone(),
            role: outcome.role,
            mode: outcome.mode,
            rows: outcome.rows(),
            reference_subgroup: outcome.reference.clone(),
            silhouettes: outcome.sweep.silhouettes(),
            best_n_clusters: outcome.sweep.best().map(|run| run.n_clusters),
            explained_variance: outcome.sweep.explained_variance.clone(),
            scree: outcome.scree.as_ref().map(|s| s.points.clone()),
            final_run: outcome.final_run.as_ref().and_then(final_summary),
        }
    }
}

fn final_summary(analysis: &ClusterAnalysis) -> Option<FinalRunSummary> {
    let run = analysis.runs.first()?;
    let mut cluster_sizes = BTreeMap::new();
    for &label in &run.labels {
        *cluster_sizes.entry(label).or_insert(0) += 1;
    }
    Some(FinalRunSummary {
        n_clusters: run.n_clusters,
        silhouette_avg: run.silhouette_avg,
        cluster_sizes,
    })
}

/// One row of `<analysis>_assignments.csv`.
#[derive(Debug, Clone, Serialize)]
struct AssignmentRow<'a> {
    #[serde(rename = "Id")]
    id: &'a str,
    #[serde(rename = "Player")]
    player: &'a str,
    #[serde(rename = "Pos")]
    position: &'a str,
    cluster: usize,
    silhouette: f64,
    reference: bool,
    manual: bool,
}

pub fn report_path(reports_dir: &Path, analysis: &str) -> PathBuf {
    reports_dir.join(format!("{analysis}.json"))
}

pub fn assignments_path(reports_dir: &Path, analysis: &str) -> PathBuf {
    reports_dir.join(format!("{analysis}_assignments.csv"))
}

/// Write the JSON report and, when a final run exists, its assignments.
/// Returns the paths written.
pub fn write_reports(reports_dir: &Path, outcome: &AnalysisOutcome) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(reports_dir)
        .with_context(|| format!("failed to create {}", reports_dir.display()))?;

    let mut written = Vec::new();
    let report = AnalysisReport::from_outcome(outcome);
    let path = report_path(reports_dir, &outcome.name);
    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote report {}", path.display());
    written.push(path);

    if let Some(final_run) = &outcome.final_run {
        let path = assignments_path(reports_dir, &outcome.name);
        write_assignments(&path, outcome, final_run)?;
        info!("Wrote assignments {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn write_assignments(path: &Path, outcome: &AnalysisOutcome, analysis: &ClusterAnalysis) -> anyhow::Result<()> {
    let run = analysis
        .runs
        .first()
        .context("final analysis has no clustering run")?;
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let rows = outcome
        .identities
        .iter()
        .zip(&analysis.annotations)
        .zip(run.labels.iter().zip(run.sample_silhouettes.iter()));
    for (i, ((identity, label), (&cluster, &silhouette))) in rows.enumerate() {
        wtr.serialize(AssignmentRow {
            id: &identity.id,
            player: &identity.player,
            position: &identity.position,
            cluster,
            silhouette,
            reference: label.reference,
            manual: label.manual,
        })
        .with_context(|| format!("failed to write row {i} of {}", path.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}
