// Season combiner: averages a cohort of season files into one row per player
// and drops the bottom quarter of the cohort by games played.

use std::collections::BTreeMap;
use std::path::Path;

use rinkscope_core::{AnalysisError, Result};
use tracing::info;

use crate::record::{compare_stat, CombinedPlayerRecord, PlayerSeasonRecord, Stat, StatLine};
use crate::season::load_season;

/// Share of the cohort (by mean games played) kept after combining.
pub const GAMES_PLAYED_KEEP_PERCENT: usize = 75;

/// Number of players kept from a cohort of `n`.
pub fn games_played_keep_count(n: usize) -> usize {
    n * GAMES_PLAYED_KEEP_PERCENT / 100
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Load every season file in order and combine them.
pub fn combine_seasons<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<CombinedPlayerRecord>> {
    if paths.is_empty() {
        return Err(AnalysisError::EmptyInput(
            "no season files supplied to combine".into(),
        ));
    }
    let seasons = paths
        .iter()
        .map(|p| load_season(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    combine_loaded(seasons)
}

/// Combine already-loaded seasons, given oldest first.
///
/// Rows accumulate across seasons and are then reduced per `Id`: rank and
/// name come from the first appearance, team and position from the last,
/// and every stat is the mean over the seasons where it was recorded.
pub fn combine_loaded(seasons: Vec<Vec<PlayerSeasonRecord>>) -> Result<Vec<CombinedPlayerRecord>> {
    if seasons.is_empty() {
        return Err(AnalysisError::EmptyInput(
            "no seasons supplied to combine".into(),
        ));
    }
    let season_count = seasons.len();

    let accumulated: Vec<PlayerSeasonRecord> = seasons.into_iter().flat_map(first_per_id).collect();
    let averaged = average_by_player(accumulated);
    let cohort_size = averaged.len();
    let kept = keep_top_games_played(averaged);

    info!(
        "Combined {season_count} seasons: {cohort_size} players, {} kept after games-played filter",
        kept.len()
    );
    Ok(kept)
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

fn first_per_id(rows: Vec<PlayerSeasonRecord>) -> Vec<PlayerSeasonRecord> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

struct PlayerAccumulator {
    rank: u32,
    player: String,
    team: String,
    position: String,
    sums: [f64; Stat::COUNT],
    counts: [usize; Stat::COUNT],
    seasons: usize,
}

impl PlayerAccumulator {
    fn start(row: &PlayerSeasonRecord) -> Self {
        PlayerAccumulator {
            rank: row.rank,
            player: row.player.clone(),
            team: String::new(),
            position: String::new(),
            sums: [0.0; Stat::COUNT],
            counts: [0; Stat::COUNT],
            seasons: 0,
        }
    }

    fn add(&mut self, row: &PlayerSeasonRecord) {
        if self.player.is_empty() {
            self.player = row.player.clone();
        }
        // Blank cells do not overwrite an earlier season's value.
        if !row.team.is_empty() {
            self.team = row.team.clone();
        }
        if !row.position.is_empty() {
            self.position = row.position.clone();
        }
        for (i, value) in row.stats.values().iter().enumerate() {
            if let Some(v) = value {
                self.sums[i] += v;
                self.counts[i] += 1;
            }
        }
        self.seasons += 1;
    }

    fn finish(self, id: String) -> CombinedPlayerRecord {
        let mut means = [None; Stat::COUNT];
        for (i, mean) in means.iter_mut().enumerate() {
            if self.counts[i] > 0 {
                *mean = Some(self.sums[i] / self.counts[i] as f64);
            }
        }
        CombinedPlayerRecord {
            id,
            rank: self.rank,
            player: self.player,
            team: self.team,
            position: self.position,
            stats: StatLine::new(means),
            seasons: self.seasons,
        }
    }
}

/// Group accumulated rows by `Id` (output ordered by `Id`).
fn average_by_player(rows: Vec<PlayerSeasonRecord>) -> Vec<CombinedPlayerRecord> {
    let mut groups: BTreeMap<String, PlayerAccumulator> = BTreeMap::new();
    for row in &rows {
        groups
            .entry(row.id.clone())
            .or_insert_with(|| PlayerAccumulator::start(row))
            .add(row);
    }
    groups
        .into_iter()
        .map(|(id, acc)| acc.finish(id))
        .collect()
}

/// Keep the top share by mean games played, then order by rank.
fn keep_top_games_played(mut players: Vec<CombinedPlayerRecord>) -> Vec<CombinedPlayerRecord> {
    let keep = games_played_keep_count(players.len());
    players.sort_by(|a, b| {
        compare_stat(a.stat(Stat::GamesPlayed), b.stat(Stat::GamesPlayed), true)
    });
    players.truncate(keep);
    players.sort_by_key(|p| p.rank);
    players
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, rank: u32, team: &str, pos: &str, gp: f64, pim: f64) -> PlayerSeasonRecord {
        let mut stats = StatLine::default();
        stats.set(Stat::GamesPlayed, Some(gp));
        stats.set(Stat::PenaltyMinutes, Some(pim));
        PlayerSeasonRecord {
            id: id.into(),
            rank,
            player: format!("Player {id}"),
            team: team.into(),
            position: pos.into(),
            stats,
        }
    }

    /// Ten distinct players, games played 80 down to 35 in steps of 5,
    /// ranks in reverse so the final rank sort is observable.
    fn season(offset: f64) -> Vec<PlayerSeasonRecord> {
        (0..10)
            .map(|i| {
                row(
                    &format!("p{i:02}"),
                    10 - i as u32,
                    "AAA",
                    "C",
                    80.0 - 5.0 * i as f64 + offset,
                    10.0 * i as f64,
                )
            })
            .collect()
    }

    // -- Games-played filter and ordering --

    #[test]
    fn two_seasons_of_ten_players_keep_seven_sorted_by_rank() {
        let combined = combine_loaded(vec![season(0.0), season(-2.0)]).unwrap();
        assert_eq!(combined.len(), 7);
        let ranks: Vec<u32> = combined.iter().map(|p| p.rank).collect();
        assert_eq!(ranks, vec![4, 5, 6, 7, 8, 9, 10]);
        assert!(combined.iter().all(|p| p.seasons == 2));
    }

    #[test]
    fn kept_players_outplay_dropped_players() {
        let combined = combine_loaded(vec![season(0.0)]).unwrap();
        let min_kept = combined
            .iter()
            .filter_map(|p| p.stat(Stat::GamesPlayed))
            .fold(f64::INFINITY, f64::min);
        // Players p07..p09 (45, 40, 35 GP) are dropped.
        assert_eq!(min_kept, 50.0);
    }

    #[test]
    fn keep_count_truncates() {
        assert_eq!(games_played_keep_count(10), 7);
        assert_eq!(games_played_keep_count(4), 3);
        assert_eq!(games_played_keep_count(1), 0);
        assert_eq!(games_played_keep_count(0), 0);
    }

    // -- Aggregation rules --

    #[test]
    fn stats_are_averaged_over_seasons_present() {
        let mut first = vec![row("a", 1, "BOS", "C", 80.0, 100.0)];
        first.extend((0..3).map(|i| row(&format!("f{i}"), 10 + i, "X", "C", 10.0, 0.0)));
        let second = vec![row("a", 3, "NYR", "LW", 60.0, 200.0)];
        let third = vec![row("a", 7, "", "", 70.0, 150.0)];

        let combined = combine_loaded(vec![first, second, third]).unwrap();
        let a = combined.iter().find(|p| p.id == "a").unwrap();

        assert_eq!(a.seasons, 3);
        assert_eq!(a.rank, 1);
        assert_eq!(a.team, "NYR");
        assert_eq!(a.position, "LW");
        assert_eq!(a.stat(Stat::GamesPlayed), Some(70.0));
        assert_eq!(a.stat(Stat::PenaltyMinutes), Some(150.0));
    }

    #[test]
    fn partial_season_players_average_only_their_seasons() {
        let s1 = vec![
            row("a", 1, "BOS", "C", 80.0, 10.0),
            row("b", 2, "BOS", "D", 40.0, 90.0),
            row("c", 3, "BOS", "D", 20.0, 0.0),
            row("d", 4, "BOS", "D", 20.0, 0.0),
        ];
        let s2 = vec![row("a", 1, "BOS", "C", 60.0, 30.0)];

        let combined = combine_loaded(vec![s1, s2]).unwrap();
        assert_eq!(combined.len(), 3);
        let a = combined.iter().find(|p| p.id == "a").unwrap();
        let b = combined.iter().find(|p| p.id == "b").unwrap();
        assert_eq!(a.stat(Stat::GamesPlayed), Some(70.0));
        assert_eq!(a.seasons, 2);
        assert_eq!(b.stat(Stat::GamesPlayed), Some(40.0));
        assert_eq!(b.seasons, 1);
    }

    #[test]
    fn missing_cells_are_skipped_in_means() {
        let mut blank = row("a", 1, "BOS", "C", 60.0, 0.0);
        blank.stats.set(Stat::PenaltyMinutes, None);
        let s1 = vec![row("a", 1, "BOS", "C", 80.0, 40.0), row("z", 2, "BOS", "C", 1.0, 0.0)];
        let s2 = vec![blank];

        let combined = combine_loaded(vec![s1, s2]).unwrap();
        let a = &combined[0];
        assert_eq!(a.stat(Stat::PenaltyMinutes), Some(40.0));
        assert_eq!(a.stat(Stat::GamesPlayed), Some(70.0));
        assert_eq!(a.stat(Stat::Points), None);
    }

    #[test]
    fn duplicate_ids_within_a_season_keep_the_first() {
        let s1 = vec![
            row("a", 1, "TOT", "C", 80.0, 100.0),
            row("a", 1, "BOS", "C", 30.0, 20.0),
            row("b", 2, "BOS", "C", 70.0, 0.0),
        ];
        let combined = combine_loaded(vec![s1]).unwrap();
        // 2 players -> keep 1, the 80 GP total row wins.
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].team, "TOT");
        assert_eq!(combined[0].seasons, 1);
    }

    // -- Determinism and errors --

    #[test]
    fn combining_twice_is_identical() {
        let first = combine_loaded(vec![season(0.0), season(3.0)]).unwrap();
        let second = combine_loaded(vec![season(0.0), season(3.0)]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_season_list_is_an_error() {
        let err = combine_loaded(vec![]).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput(_)));

        let paths: [&str; 0] = [];
        let err = combine_seasons(&paths).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput(_)));
    }
}
