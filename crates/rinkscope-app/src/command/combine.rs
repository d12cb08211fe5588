use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use rinkscope_app::pipeline::load_cohort;
use rinkscope_hockey::write_combined;
use tracing::info;

use super::GlobalArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CombineArg {
    /// Cohort name from the configuration
    #[arg(long)]
    cohort: String,
    /// Output CSV path
    #[arg(long)]
    out: PathBuf,
}

pub(crate) fn run(global: &GlobalArg, arg: &CombineArg) -> anyhow::Result<()> {
    let config = global.load_config()?;
    let players = load_cohort(&config, &arg.cohort)?;

    if let Some(parent) = arg.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(&arg.out)
        .with_context(|| format!("failed to create {}", arg.out.display()))?;
    write_combined(file, &players)
        .with_context(|| format!("failed to write {}", arg.out.display()))?;
    info!(
        "Wrote {} combined players for `{}` to {}",
        players.len(),
        arg.cohort,
        arg.out.display()
    );
    Ok(())
}
