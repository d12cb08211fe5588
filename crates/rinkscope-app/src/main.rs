// rinkscope entry point: parse arguments, initialize tracing, dispatch.

mod command;

use std::path::Path;

use anyhow::Context;
use clap::Parser;

use crate::command::CommandArgs;

const DEFAULT_LOG_FILTER: &str =
    "rinkscope=info,rinkscope_app=info,rinkscope_cluster=info,rinkscope_hockey=info,warn";

fn main() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_tracing(args.log_file())?;
    command::run(args)
}

/// Initialize tracing to stderr, or to `log_file` when given.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
        None => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
    }
    Ok(())
}
