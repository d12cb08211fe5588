// Player record types for single-season rows and multi-season averages.

use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// Stat columns
// ---------------------------------------------------------------------------

/// Numeric performance fields carried by every season row, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stat {
    Age,
    GamesPlayed,
    Goals,
    Assists,
    Points,
    PlusMinus,
    PenaltyMinutes,
    PointShares,
    EvenStrengthGoals,
    PowerPlayGoals,
    ShortHandedGoals,
    GameWinningGoals,
    EvenStrengthAssists,
    PowerPlayAssists,
    ShortHandedAssists,
    Shots,
    ShootingPct,
}

impl Stat {
    pub const COUNT: usize = 17;

    pub const ALL: [Stat; Stat::COUNT] = [
        Stat::Age,
        Stat::GamesPlayed,
        Stat::Goals,
        Stat::Assists,
        Stat::Points,
        Stat::PlusMinus,
        Stat::PenaltyMinutes,
        Stat::PointShares,
        Stat::EvenStrengthGoals,
        Stat::PowerPlayGoals,
        Stat::ShortHandedGoals,
        Stat::GameWinningGoals,
        Stat::EvenStrengthAssists,
        Stat::PowerPlayAssists,
        Stat::ShortHandedAssists,
        Stat::Shots,
        Stat::ShootingPct,
    ];

    /// Column header used in season CSV files.
    pub fn column(&self) -> &'static str {
        match self {
            Stat::Age => "Age",
            Stat::GamesPlayed => "GP",
            Stat::Goals => "G",
            Stat::Assists => "A",
            Stat::Points => "PTS",
            Stat::PlusMinus => "+/-",
            Stat::PenaltyMinutes => "PIM",
            Stat::PointShares => "PS",
            Stat::EvenStrengthGoals => "EV",
            Stat::PowerPlayGoals => "PP",
            Stat::ShortHandedGoals => "SH",
            Stat::GameWinningGoals => "GW",
            Stat::EvenStrengthAssists => "EV.1",
            Stat::PowerPlayAssists => "PP.1",
            Stat::ShortHandedAssists => "SH.1",
            Stat::Shots => "S",
            Stat::ShootingPct => "S%",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Identity and roster columns.
pub const ID_COLUMN: &str = "Id";
pub const RANK_COLUMN: &str = "Rk";
pub const PLAYER_COLUMN: &str = "Player";
pub const TEAM_COLUMN: &str = "Tm";
pub const POSITION_COLUMN: &str = "Pos";

/// Every column a season file must provide, in canonical order.
pub const SEASON_COLUMNS: [&str; 22] = [
    ID_COLUMN,
    RANK_COLUMN,
    PLAYER_COLUMN,
    "Age",
    TEAM_COLUMN,
    POSITION_COLUMN,
    "GP",
    "G",
    "A",
    "PTS",
    "+/-",
    "PIM",
    "PS",
    "EV",
    "PP",
    "SH",
    "GW",
    "EV.1",
    "PP.1",
    "SH.1",
    "S",
    "S%",
];

/// Columns of the feature matrix: rank followed by every stat, with the
/// identity and text columns (`Player`, `Pos`, `Id`, `Tm`) removed.
pub fn feature_columns() -> Vec<String> {
    std::iter::once(RANK_COLUMN)
        .chain(Stat::ALL.iter().map(Stat::column))
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Stat line
// ---------------------------------------------------------------------------

/// One value per [`Stat`]; `None` marks a missing cell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatLine([Option<f64>; Stat::COUNT]);

impl StatLine {
    pub fn new(values: [Option<f64>; Stat::COUNT]) -> Self {
        StatLine(values)
    }

    pub fn get(&self, stat: Stat) -> Option<f64> {
        self.0[stat.index()]
    }

    pub fn set(&mut self, stat: Stat, value: Option<f64>) {
        self.0[stat.index()] = value;
    }

    pub fn values(&self) -> &[Option<f64>; Stat::COUNT] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One player's row from a single season file.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeasonRecord {
    pub id: String,
    pub rank: u32,
    pub player: String,
    pub team: String,
    pub position: String,
    pub stats: StatLine,
}

/// A player's stats averaged over every season of a cohort they appeared in.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedPlayerRecord {
    pub id: String,
    /// Rank from the earliest season the player appears in.
    pub rank: u32,
    pub player: String,
    /// Team from the most recent season.
    pub team: String,
    /// Position from the most recent season.
    pub position: String,
    pub stats: StatLine,
    /// Number of seasons the averages were taken over.
    pub seasons: usize,
}

impl CombinedPlayerRecord {
    pub fn stat(&self, stat: Stat) -> Option<f64> {
        self.stats.get(stat)
    }

    pub fn identity(&self) -> PlayerIdentity {
        PlayerIdentity {
            player: self.player.clone(),
            position: self.position.clone(),
            id: self.id.clone(),
        }
    }

    /// Values in [`feature_columns`] order.
    pub fn feature_row(&self) -> Vec<Option<f64>> {
        std::iter::once(Some(f64::from(self.rank)))
            .chain(self.stats.values().iter().copied())
            .collect()
    }
}

/// Display fields kept alongside a feature matrix for annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub player: String,
    pub position: String,
    pub id: String,
}

// ---------------------------------------------------------------------------
// Ordering helpers
// ---------------------------------------------------------------------------

/// Compare two optional stat values, always sorting missing values last.
pub(crate) fn compare_stat(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            if descending {
                y.total_cmp(&x)
            } else {
                x.total_cmp(&y)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
