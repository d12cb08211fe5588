use rinkscope_app::pipeline::{load_cohort, select_role};
use rinkscope_core::config::RoleSelection;
use rinkscope_hockey::{find_goons, Stat};

use super::GlobalArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GoonsArg {
    /// Cohort name from the configuration
    #[arg(long)]
    cohort: String,
    /// Restrict to one role before selecting
    #[arg(long, value_enum, default_value_t = RoleArg::All)]
    role: RoleArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum RoleArg {
    All,
    Offense,
    Defense,
}

impl From<RoleArg> for RoleSelection {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::All => RoleSelection::All,
            RoleArg::Offense => RoleSelection::Offense,
            RoleArg::Defense => RoleSelection::Defense,
        }
    }
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

pub(crate) fn run(global: &GlobalArg, arg: &GoonsArg) -> anyhow::Result<()> {
    let config = global.load_config()?;
    let cohort = load_cohort(&config, &arg.cohort)?;
    let group = select_role(&cohort, arg.role.into());
    let goons = find_goons(&group);

    println!("{:<28} {:<4} {:>7} {:>7}", "Player", "Pos", "PIM", "PTS");
    for member in &goons.members {
        println!(
            "{:<28} {:<4} {:>7} {:>7}",
            member.player,
            member.position,
            fmt_stat(member.stat(Stat::PenaltyMinutes)),
            fmt_stat(member.stat(Stat::Points)),
        );
    }
    println!("{} of {} players", goons.len(), group.len());
    Ok(())
}
