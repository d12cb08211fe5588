use anyhow::Context;
use rinkscope_app::pipeline::{run_analysis, select_analyses};
use rinkscope_app::plot::SvgSink;
use rinkscope_app::report::write_reports;
use rinkscope_cluster::{NoopSink, RenderSink};
use tracing::info;

use super::GlobalArg;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct RunArg {
    /// Only run the named analysis (repeatable)
    #[arg(long = "analysis")]
    analyses: Vec<String>,
}

pub(crate) fn run(global: &GlobalArg, arg: &RunArg) -> anyhow::Result<()> {
    let config = global.load_config()?;
    let selected = select_analyses(&config, &arg.analyses)?;

    let mut svg = SvgSink::new();
    let mut noop = NoopSink;
    let sink: &mut dyn RenderSink = if config.output.render {
        &mut svg
    } else {
        &mut noop
    };

    for analysis in selected {
        let outcome = run_analysis(&config, analysis, sink)?;
        write_reports(&config.output.reports_dir, &outcome)
            .with_context(|| format!("failed to write reports for `{}`", analysis.name))?;
        info!(
            "Analysis `{}` done: {} players, {} in reference subgroup",
            outcome.name,
            outcome.rows(),
            outcome.reference.len()
        );
    }

    if config.output.render {
        info!("Wrote {} figures", svg.written().len());
    }
    Ok(())
}
