// Reference subgroup ("goons"): heavy penalty minutes with little scoring.

use tracing::info;

use crate::record::{compare_stat, CombinedPlayerRecord, Stat};

/// Percentile used for both the penalty-minutes and the points cut.
pub const GOON_PERCENT: usize = 15;

/// Size of each candidate set for a group of `n` players.
pub fn candidate_count(n: usize) -> usize {
    n * GOON_PERCENT / 100
}

/// Players in both the top-PIM and bottom-PTS candidate sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSubgroup {
    pub members: Vec<CombinedPlayerRecord>,
}

impl ReferenceSubgroup {
    pub fn names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.player.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The `candidate_count` players with the most penalty minutes, most first.
pub fn top_penalty_minutes(group: &[CombinedPlayerRecord]) -> Vec<&CombinedPlayerRecord> {
    ranked_by(group, Stat::PenaltyMinutes, true)
}

/// The `candidate_count` players with the fewest points, fewest first.
pub fn bottom_points(group: &[CombinedPlayerRecord]) -> Vec<&CombinedPlayerRecord> {
    ranked_by(group, Stat::Points, false)
}

fn ranked_by(group: &[CombinedPlayerRecord], stat: Stat, descending: bool) -> Vec<&CombinedPlayerRecord> {
    let mut sorted: Vec<&CombinedPlayerRecord> = group.iter().collect();
    sorted.sort_by(|a, b| compare_stat(a.stat(stat), b.stat(stat), descending));
    sorted.truncate(candidate_count(group.len()));
    sorted
}

/// Intersect the two candidate sets on the whole record, keeping the
/// penalty-minutes order. Groups under 7 players yield an empty subgroup.
pub fn find_goons(group: &[CombinedPlayerRecord]) -> ReferenceSubgroup {
    let enforcers = top_penalty_minutes(group);
    let low_scorers = bottom_points(group);
    let members: Vec<CombinedPlayerRecord> = enforcers
        .into_iter()
        .filter(|p| low_scorers.iter().any(|q| *q == *p))
        .cloned()
        .collect();
    info!(
        "Reference subgroup: {} of {} players ({} per candidate set)",
        members.len(),
        group.len(),
        candidate_count(group.len())
    );
    ReferenceSubgroup { members }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StatLine;

    fn player(id: &str, pim: f64, pts: f64) -> CombinedPlayerRecord {
        let mut stats = StatLine::default();
        stats.set(Stat::PenaltyMinutes, Some(pim));
        stats.set(Stat::Points, Some(pts));
        CombinedPlayerRecord {
            id: id.into(),
            rank: 1,
            player: format!("Player {id}"),
            team: "TOR".into(),
            position: "RW".into(),
            stats,
            seasons: 2,
        }
    }

    /// Twenty skaters: PIM rises and PTS falls with the index, except
    /// `star` who takes lots of penalties and also scores.
    fn cohort() -> Vec<CombinedPlayerRecord> {
        let mut group: Vec<_> = (0..19)
            .map(|i| player(&format!("p{i:02}"), 10.0 * i as f64, 100.0 - 5.0 * i as f64))
            .collect();
        group.push(player("star", 500.0, 120.0));
        group
    }

    #[test]
    fn candidate_sets_have_percentile_size() {
        for n in [0usize, 5, 6, 7, 13, 20, 47] {
            let group: Vec<_> = (0..n)
                .map(|i| player(&format!("x{i}"), i as f64, (n - i) as f64))
                .collect();
            assert_eq!(top_penalty_minutes(&group).len(), n * 15 / 100);
            assert_eq!(bottom_points(&group).len(), n * 15 / 100);
            assert!(find_goons(&group).len() <= n * 15 / 100);
        }
    }

    #[test]
    fn group_of_five_yields_empty_subgroup() {
        let group: Vec<_> = (0..5).map(|i| player(&format!("x{i}"), 300.0, 1.0)).collect();
        let goons = find_goons(&group);
        assert!(goons.is_empty());
    }

    #[test]
    fn high_pim_high_points_player_is_excluded() {
        let group = cohort();
        // 20 * 15 / 100 = 3 per set.
        let top: Vec<_> = top_penalty_minutes(&group).iter().map(|p| p.id.clone()).collect();
        assert_eq!(top, vec!["star", "p18", "p17"]);
        let bottom: Vec<_> = bottom_points(&group).iter().map(|p| p.id.clone()).collect();
        assert_eq!(bottom, vec!["p18", "p17", "p16"]);

        let goons = find_goons(&group);
        assert_eq!(goons.names(), vec!["Player p18", "Player p17"]);
    }

    #[test]
    fn players_missing_pim_never_top_the_list() {
        let mut group = cohort();
        group[0].stats.set(Stat::PenaltyMinutes, None);
        group[0].stats.set(Stat::Points, None);
        let bottom = bottom_points(&group);
        assert!(bottom.iter().all(|p| p.id != "p00"));
        let top = top_penalty_minutes(&group);
        assert!(top.iter().all(|p| p.id != "p00"));
    }
}
