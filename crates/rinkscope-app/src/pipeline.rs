// Analysis orchestration: cohort -> role group -> reference subgroup ->
// cluster sweep, scree and final run, driven by one `[[analysis]]` entry.

use anyhow::{anyhow, Context};
use rinkscope_cluster::{
    ClusterAnalysis, ClusterCounts, ClusterEngine, ClusterRequest, OutputLayout, RenderSink,
    ScreeScorer, ScreeScores,
};
use rinkscope_core::config::{AnalysisConfig, Config, GoonScope, RoleSelection};
use rinkscope_core::ReductionMode;
use rinkscope_hockey::{
    combine_seasons, find_goons, group_title, prepare_group, split_roles, CombinedPlayerRecord,
    PlayerIdentity, ReferenceSubgroup,
};
use tracing::info;

/// Everything one analysis produced.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub name: String,
    pub cohort: String,
    pub role: RoleSelection,
    pub mode: ReductionMode,
    pub identities: Vec<PlayerIdentity>,
    pub reference: Vec<String>,
    pub sweep: ClusterAnalysis,
    pub scree: Option<ScreeScores>,
    pub final_run: Option<ClusterAnalysis>,
}

impl AnalysisOutcome {
    pub fn rows(&self) -> usize {
        self.identities.len()
    }
}

// ---------------------------------------------------------------------------
// Cohort helpers
// ---------------------------------------------------------------------------

/// Combine every season listed for `cohort`.
pub fn load_cohort(config: &Config, cohort: &str) -> anyhow::Result<Vec<CombinedPlayerRecord>> {
    let seasons = &config
        .cohort(cohort)
        .ok_or_else(|| anyhow!("unknown cohort `{cohort}`"))?
        .seasons;
    combine_seasons(seasons.as_slice()).with_context(|| format!("failed to combine cohort `{cohort}`"))
}

/// The players an analysis clusters.
pub fn select_role(players: &[CombinedPlayerRecord], role: RoleSelection) -> Vec<CombinedPlayerRecord> {
    match role {
        RoleSelection::All => players.to_vec(),
        RoleSelection::Offense => split_roles(players).offense,
        RoleSelection::Defense => split_roles(players).defense,
    }
}

/// Reference subgroup over the whole cohort or only the selected group.
pub fn reference_subgroup(
    cohort: &[CombinedPlayerRecord],
    group: &[CombinedPlayerRecord],
    scope: GoonScope,
) -> ReferenceSubgroup {
    match scope {
        GoonScope::Cohort => find_goons(cohort),
        GoonScope::Role => find_goons(group),
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Run one configured analysis end to end.
///
/// Figures are only given output paths when `config.output.render` is set;
/// the caller picks the sink.
pub fn run_analysis(
    config: &Config,
    analysis: &AnalysisConfig,
    sink: &mut dyn RenderSink,
) -> anyhow::Result<AnalysisOutcome> {
    info!(
        "Running analysis `{}` (cohort {}, role {:?}, mode {})",
        analysis.name,
        analysis.cohort,
        analysis.role,
        analysis.mode.label()
    );

    let cohort = load_cohort(config, &analysis.cohort)?;
    let group = select_role(&cohort, analysis.role);
    let goons = reference_subgroup(&cohort, &group, analysis.goons_from);
    let reference = goons.names();
    let prepared = prepare_group(&group)
        .with_context(|| format!("failed to prepare features for `{}`", analysis.name))?;
    let names = prepared.names();

    let pipeline = &config.pipeline;
    let layout = config
        .output
        .render
        .then(|| OutputLayout::new(&config.output.figures_dir));
    let mut engine = ClusterEngine::new(pipeline.seed)
        .with_projection_axes(&pipeline.projection_x, &pipeline.projection_y);
    if let Some(layout) = &layout {
        engine = engine.with_output(layout.clone());
    }

    let sweep = engine
        .analyze(
            &ClusterRequest {
                analysis: &analysis.name,
                features: &prepared.features,
                names: &names,
                reference: &reference,
                manual: &analysis.highlight,
                counts: ClusterCounts::Sweep(pipeline.cluster_counts.clone()),
                mode: analysis.mode,
                title: None,
            },
            sink,
        )
        .with_context(|| format!("cluster sweep failed for `{}`", analysis.name))?;

    let scree = if analysis.scree {
        let scores = ScreeScorer::new(pipeline.seed)
            .with_max_clusters(pipeline.scree_max_clusters)
            .score_and_render(
                &analysis.name,
                &prepared.features,
                analysis.mode,
                sink,
                layout.as_ref(),
            )
            .with_context(|| format!("scree scoring failed for `{}`", analysis.name))?;
        Some(scores)
    } else {
        None
    };

    let final_run = match analysis.final_clusters {
        Some(k) => {
            let run = engine
                .analyze(
                    &ClusterRequest {
                        analysis: &analysis.name,
                        features: &prepared.features,
                        names: &names,
                        reference: &reference,
                        manual: &analysis.highlight,
                        counts: ClusterCounts::Final(k),
                        mode: analysis.mode,
                        title: Some(group_title(&prepared.identities).to_string()),
                    },
                    sink,
                )
                .with_context(|| format!("final clustering failed for `{}`", analysis.name))?;
            Some(run)
        }
        None => None,
    };

    Ok(AnalysisOutcome {
        name: analysis.name.clone(),
        cohort: analysis.cohort.clone(),
        role: analysis.role,
        mode: analysis.mode,
        identities: prepared.identities,
        reference,
        sweep,
        scree,
        final_run,
    })
}

/// Analyses to run: all of them, or only those named in `only`.
pub fn select_analyses<'a>(
    config: &'a Config,
    only: &[String],
) -> anyhow::Result<Vec<&'a AnalysisConfig>> {
    if only.is_empty() {
        return Ok(config.analyses.iter().collect());
    }
    only.iter()
        .map(|name| {
            config
                .analysis(name)
                .ok_or_else(|| anyhow!("no analysis named `{name}` in configuration"))
        })
        .collect()
}
