// Role split and feature preparation for player groups.

use rinkscope_core::{FeatureMatrix, Result};
use tracing::info;

use crate::record::{feature_columns, CombinedPlayerRecord, PlayerIdentity};

/// Position code that marks a defenseman. Every other code is offense.
pub const DEFENSE_POSITION: &str = "D";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Offense,
    Defense,
}

impl Role {
    /// Exact match on the position code; goalies and unknown codes are
    /// treated as offense.
    pub fn of(position: &str) -> Role {
        if position == DEFENSE_POSITION {
            Role::Defense
        } else {
            Role::Offense
        }
    }
}

// ---------------------------------------------------------------------------
// Role split
// ---------------------------------------------------------------------------

/// Offense/defense partition of a combined cohort, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSplit {
    pub offense: Vec<CombinedPlayerRecord>,
    pub defense: Vec<CombinedPlayerRecord>,
}

pub fn split_roles(players: &[CombinedPlayerRecord]) -> RoleSplit {
    let (defense, offense): (Vec<_>, Vec<_>) = players
        .iter()
        .cloned()
        .partition(|p| Role::of(&p.position) == Role::Defense);
    info!(
        "Role split: {} offense, {} defense",
        offense.len(),
        defense.len()
    );
    RoleSplit { offense, defense }
}

// ---------------------------------------------------------------------------
// Feature preparation
// ---------------------------------------------------------------------------

/// A group ready for clustering: numeric features plus the identity rows
/// used to annotate plots, both in the same row order.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedGroup {
    pub features: FeatureMatrix,
    pub identities: Vec<PlayerIdentity>,
}

impl PreparedGroup {
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.identities.iter().map(|i| i.player.clone()).collect()
    }
}

/// Strip identity and text columns from a player group.
pub fn prepare_group(players: &[CombinedPlayerRecord]) -> Result<PreparedGroup> {
    let rows: Vec<Vec<Option<f64>>> = players.iter().map(|p| p.feature_row()).collect();
    let features = FeatureMatrix::from_rows(feature_columns(), &rows)?;
    let identities = players.iter().map(|p| p.identity()).collect();
    Ok(PreparedGroup {
        features,
        identities,
    })
}

/// Plot title for a final clustering run, keyed off the group's first row.
pub fn group_title(identities: &[PlayerIdentity]) -> &'static str {
    match identities.first() {
        Some(first) if Role::of(&first.position) == Role::Defense => "Plot of Defensemen",
        _ => "Plot of Forwards",
    }
}
