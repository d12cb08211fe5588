use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rinkscope_core::config::{self, Config};
use tracing::info;

use self::{combine::CombineArg, goons::GoonsArg, run::RunArg};

mod combine;
mod goons;
mod run;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[clap(flatten)]
    global: GlobalArg,
    /// What to do; defaults to running every configured analysis
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Run configured analyses (all, or those named with --analysis)
    Run(#[clap(flatten)] RunArg),
    /// Write a combined cohort as CSV
    Combine(#[clap(flatten)] CombineArg),
    /// List the reference subgroup of a cohort
    Goons(#[clap(flatten)] GoonsArg),
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GlobalArg {
    /// Directory holding config/ and defaults/; relative paths resolve here
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,
    /// Explicit configuration file (skips the defaults copy)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Skip figure rendering
    #[arg(long, global = true)]
    no_render: bool,
    /// Override the configured random seed
    #[arg(long, global = true)]
    seed: Option<u64>,
}

impl GlobalArg {
    /// Load the configuration and apply command-line overrides.
    pub(crate) fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => config::load_config_file(path, &self.base_dir)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => config::load_config(&self.base_dir).context("failed to load configuration")?,
        };
        if let Some(seed) = self.seed {
            config.pipeline.seed = Some(seed);
        }
        if self.no_render {
            config.output.render = false;
        }
        info!(
            "Config loaded: {} cohorts, {} analyses, seed {:?}",
            config.cohorts.len(),
            config.analyses.len(),
            config.pipeline.seed
        );
        Ok(config)
    }
}

impl CommandArgs {
    pub fn log_file(&self) -> Option<&Path> {
        self.global.log_file.as_deref()
    }
}

pub fn run(args: CommandArgs) -> anyhow::Result<()> {
    let global = args.global;
    match args.mode.unwrap_or(Mode::Run(RunArg::default())) {
        Mode::Run(arg) => run::run(&global, &arg)?,
        Mode::Combine(arg) => combine::run(&global, &arg)?,
        Mode::Goons(arg) => goons::run(&global, &arg)?,
    }
    Ok(())
}
