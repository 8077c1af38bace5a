// Elimination-order predictions: placements, ordinals, and ranking/weekly
// scoring.
//
// Placements count from the winner: 1st is the winner and `T` (the number of
// queens) is the first queen eliminated. Tied queens share the best placement
// their group covers.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConsistencyWarning, WarningKind};
use crate::model::{League, TieGroup};

// ---------------------------------------------------------------------------
// Placement derivation
// ---------------------------------------------------------------------------

/// Placement shared by every member of `eliminated[index]`, given `total`
/// queens:
///
/// `placement = total - queens_before - (group_size - 1)`
///
/// Returns `None` for an empty (placeholder) group or one that would push
/// placements past `total`.
pub fn placement_for_group(eliminated: &[TieGroup], index: usize, total: usize) -> Option<u32> {
    let group = eliminated.get(index)?;
    if group.is_empty() {
        return None;
    }
    let before: usize = eliminated[..index].iter().map(TieGroup::len).sum();
    if before + group.len() > total {
        return None;
    }
    Some((total - before - (group.len() - 1)) as u32)
}

/// Placement of every eliminated queen.
pub fn placements(eliminated: &[TieGroup], total: usize) -> HashMap<String, u32> {
    let mut out = HashMap::new();
    for (idx, group) in eliminated.iter().enumerate() {
        if let Some(placement) = placement_for_group(eliminated, idx, total) {
            for name in group.iter() {
                out.insert(name.to_string(), placement);
            }
        }
    }
    out
}

/// Placement a ranking slot predicts: slot 0 (first eliminated) is `total`,
/// the last slot is 1st.
pub fn predicted_placement(slot: usize, total: usize) -> Option<u32> {
    (slot < total).then(|| (total - slot) as u32)
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// English ordinal: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st, ...
pub fn ordinal(n: u32) -> String {
    let suffix = match n % 100 {
        11..=13 => "th",
        _ => match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{n}{suffix}")
}

/// Human list of names: `A`, `A & B`, `A, B, & C`.
pub fn format_names<S: AsRef<str>>(names: &[S]) -> String {
    match names {
        [] => String::new(),
        [one] => one.as_ref().to_string(),
        [a, b] => format!("{} & {}", a.as_ref(), b.as_ref()),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{}, & {}", head.join(", "), last.as_ref())
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// A ranking slot that matched the actual result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectPlacement {
    pub slot: usize,
    pub queen: String,
    pub placement: u32,
    pub points: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingScore {
    pub points: u32,
    pub correct: Vec<CorrectPlacement>,
    pub warnings: Vec<ConsistencyWarning>,
}

/// Whether a player has put at least one queen into their ranking.
pub fn has_submitted_ranking(rankings: &[String]) -> bool {
    rankings.iter().any(|r| !r.trim().is_empty())
}

/// Score an elimination-order prediction against the league's results.
///
/// Slot `idx` predicts placement `T - idx` and earns that placement's points
/// only when its queen is in the eliminated tie-group whose derived placement
/// is exactly `T - idx`. Matching is exact and case-sensitive. Unset slots,
/// unresolved placements, and queens missing from the cast never score.
pub fn score_rankings(rankings: &[String], league: &League) -> RankingScore {
    let total = league.queen_count();
    let mut score = RankingScore::default();

    let mut by_placement: HashMap<u32, &TieGroup> = HashMap::new();
    for (idx, group) in league.eliminated.iter().enumerate() {
        if group.is_empty() {
            continue;
        }
        match placement_for_group(&league.eliminated, idx, total) {
            Some(placement) => {
                by_placement.insert(placement, group);
            }
            None => score.warnings.push(ConsistencyWarning::new(
                WarningKind::GroupOverflow,
                format!("elimination slot {idx} ({group}) exceeds {total} queens"),
            )),
        }
        for name in group.iter().filter(|n| !league.has_queen(n)) {
            score.warnings.push(ConsistencyWarning::new(
                WarningKind::UnknownQueen,
                format!("elimination slot {idx} names `{name}`, who is not in the cast"),
            ));
        }
    }

    for (slot, queen) in rankings.iter().enumerate() {
        if queen.is_empty() {
            continue;
        }
        let Some(placement) = predicted_placement(slot, total) else {
            score.warnings.push(ConsistencyWarning::new(
                WarningKind::ExtraRankingSlot,
                format!("ranking slot {slot} is beyond the {total} queens"),
            ));
            continue;
        };
        if !league.has_queen(queen) {
            score.warnings.push(ConsistencyWarning::new(
                WarningKind::UnknownQueen,
                format!("ranking slot {slot} names `{queen}`, who is not in the cast"),
            ));
            continue;
        }
        let hit = by_placement
            .get(&placement)
            .is_some_and(|group| group.contains(queen));
        if hit {
            let points = league.placement_points.points_for(placement);
            debug!("{queen} correctly placed {}", ordinal(placement));
            score.points += points;
            score.correct.push(CorrectPlacement {
                slot,
                queen: queen.clone(),
                placement,
                points,
            });
        }
    }

    score
}

/// Per-week score for weekly picks or the lip-sync assassin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyScore {
    pub points: u32,
    /// Zero-based weeks that scored.
    pub correct_weeks: Vec<usize>,
    pub warnings: Vec<ConsistencyWarning>,
}

fn unknown_queen(cast: &[String], name: &str) -> bool {
    !cast.iter().any(|q| q == name)
}

/// `points` for every week whose pick is a member of that week's winners.
/// Empty picks and weeks with no recorded winner never score; picks naming a
/// queen outside `cast` are skipped with a warning.
pub fn score_weekly_picks(
    picks: &[String],
    winners: &[TieGroup],
    cast: &[String],
    points: u32,
) -> WeeklyScore {
    let mut score = WeeklyScore::default();
    for (week, pick) in picks.iter().enumerate() {
        if pick.is_empty() {
            continue;
        }
        if unknown_queen(cast, pick) {
            score.warnings.push(ConsistencyWarning::new(
                WarningKind::UnknownQueen,
                format!("week {} pick names `{pick}`, who is not in the cast", week + 1),
            ));
            continue;
        }
        if winners.get(week).is_some_and(|group| group.contains(pick)) {
            score.points += points;
            score.correct_weeks.push(week);
        }
    }
    score
}

/// `points` for every week the backed queen won the lip sync.
pub fn score_lip_sync_assassin(
    assassin: Option<&str>,
    lip_sync_winners: &[TieGroup],
    cast: &[String],
    points: u32,
) -> WeeklyScore {
    let mut score = WeeklyScore::default();
    let Some(assassin) = assassin.filter(|a| !a.is_empty()) else {
        return score;
    };
    if unknown_queen(cast, assassin) {
        score.warnings.push(ConsistencyWarning::new(
            WarningKind::UnknownQueen,
            format!("lip sync assassin `{assassin}` is not in the cast"),
        ));
        return score;
    }
    for (week, group) in lip_sync_winners.iter().enumerate() {
        if group.contains(assassin) {
            score.points += points;
            score.correct_weeks.push(week);
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::league::test_support::{league_with_queens, twelve_queen_league};
    use crate::model::PlacementPoints;

    fn groups(raw: &[&[&str]]) -> Vec<TieGroup> {
        raw.iter().map(|g| TieGroup::new(g.iter().copied())).collect()
    }

    fn ranking(slots: &[&str]) -> Vec<String> {
        slots.iter().map(|s| s.to_string()).collect()
    }

    // ------------------------------------------------------------------
    // Placements
    // ------------------------------------------------------------------

    #[test]
    fn placement_formula_with_tie() {
        let eliminated = groups(&[&["A"], &["B", "C"], &["D"]]);
        let map = placements(&eliminated, 12);
        assert_eq!(map["A"], 12);
        assert_eq!(map["B"], 10);
        assert_eq!(map["C"], 10);
        assert_eq!(map["D"], 9);
    }

    #[test]
    fn tie_for_first_elimination_shares_better_placement() {
        let eliminated = groups(&[&["A", "B"]]);
        assert_eq!(placement_for_group(&eliminated, 0, 12), Some(11));
    }

    #[test]
    fn empty_group_has_no_placement() {
        let eliminated = groups(&[&[], &["B"]]);
        assert_eq!(placement_for_group(&eliminated, 0, 12), None);
        assert_eq!(placement_for_group(&eliminated, 1, 12), Some(12));
    }

    #[test]
    fn overflowing_group_has_no_placement() {
        let eliminated = groups(&[&["A"], &["B", "C"]]);
        assert_eq!(placement_for_group(&eliminated, 1, 2), None);
    }

    #[test]
    fn predicted_placement_counts_from_bottom() {
        assert_eq!(predicted_placement(0, 12), Some(12));
        assert_eq!(predicted_placement(11, 12), Some(1));
        assert_eq!(predicted_placement(12, 12), None);
    }

    // ------------------------------------------------------------------
    // Formatting
    // ------------------------------------------------------------------

    #[test]
    fn ordinal_suffixes() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (22, "22nd"),
            (23, "23rd"),
            (101, "101st"),
            (111, "111th"),
        ];
        for (n, expected) in cases {
            assert_eq!(ordinal(n), expected, "ordinal({n})");
        }
    }

    #[test]
    fn name_lists() {
        assert_eq!(format_names(&["A"]), "A");
        assert_eq!(format_names(&["A", "B"]), "A & B");
        assert_eq!(format_names(&["A", "B", "C"]), "A, B, & C");
        assert_eq!(format_names(&["A", "B", "C", "D"]), "A, B, C, & D");
        assert_eq!(format_names::<&str>(&[]), "");
    }

    // ------------------------------------------------------------------
    // Ranking scoring
    // ------------------------------------------------------------------

    #[test]
    fn first_slot_scores_when_first_eliminated_matches() {
        let mut league = twelve_queen_league();
        league.placement_points = PlacementPoints::Table((1..=12).rev().collect());
        league.eliminated = groups(&[&["Q1"]]);

        let mut slots = vec![String::new(); 12];
        slots[0] = "Q1".to_string();

        let score = score_rankings(&slots, &league);
        // Table index 11 (12th place) holds 1.
        assert_eq!(score.points, 1);
        assert_eq!(score.correct[0].placement, 12);
        assert_eq!(score.correct[0].queen, "Q1");
    }

    #[test]
    fn first_slot_scores_zero_on_placeholder_or_other_queen() {
        let mut league = twelve_queen_league();
        let mut slots = vec![String::new(); 12];
        slots[0] = "Q1".to_string();

        league.eliminated = groups(&[&[]]);
        assert_eq!(score_rankings(&slots, &league).points, 0);

        league.eliminated = groups(&[&["Q2"]]);
        assert_eq!(score_rankings(&slots, &league).points, 0);
    }

    #[test]
    fn tie_only_scores_at_shared_placement() {
        let mut league = league_with_queens(&["A", "B", "C", "D"]);
        league.eliminated = groups(&[&["A", "B"]]);
        // Group placement is 3rd; slot 0 predicts 4th, slot 1 predicts 3rd.
        let score = score_rankings(&ranking(&["A", "B", "", ""]), &league);
        assert_eq!(score.points, 1);
        assert_eq!(score.correct[0].slot, 1);
        assert_eq!(score.correct[0].placement, 3);
    }

    #[test]
    fn match_is_case_sensitive() {
        let mut league = league_with_queens(&["Alaska", "Roxxxy"]);
        league.eliminated = groups(&[&["Roxxxy"]]);
        let score = score_rankings(&ranking(&["roxxxy", ""]), &league);
        assert_eq!(score.points, 0);
    }

    #[test]
    fn full_season_scores_every_correct_slot() {
        let mut league = league_with_queens(&["A", "B", "C"]);
        league.placement_points = PlacementPoints::Table(vec![5, 3, 1]);
        league.eliminated = groups(&[&["A"], &["B"], &["C"]]);

        let score = score_rankings(&ranking(&["A", "C", "B"]), &league);
        // A at 3rd (1 point) is right; C/B swapped are wrong.
        assert_eq!(score.points, 1);

        let perfect = score_rankings(&ranking(&["A", "B", "C"]), &league);
        assert_eq!(perfect.points, 9);
        assert_eq!(perfect.correct.len(), 3);
    }

    #[test]
    fn unknown_queens_are_skipped_with_warning() {
        let mut league = league_with_queens(&["A", "B"]);
        league.eliminated = groups(&[&["Ghost"]]);
        let score = score_rankings(&ranking(&["Ghost", "B"]), &league);
        assert_eq!(score.points, 0);
        assert!(score
            .warnings
            .iter()
            .all(|w| w.kind == WarningKind::UnknownQueen));
        assert_eq!(score.warnings.len(), 2);
    }

    #[test]
    fn overflowing_group_warns() {
        let mut league = league_with_queens(&["A", "B"]);
        league.eliminated = groups(&[&["A"], &["B", "C"]]);
        let score = score_rankings(&ranking(&["A", "B"]), &league);
        assert_eq!(score.points, 1);
        assert!(score.warnings.iter().any(|w| w.kind == WarningKind::GroupOverflow));
    }

    #[test]
    fn submitted_ranking_detection() {
        assert!(!has_submitted_ranking(&[]));
        assert!(!has_submitted_ranking(&ranking(&["", " "])));
        assert!(has_submitted_ranking(&ranking(&["", "A"])));
    }

    // ------------------------------------------------------------------
    // Weekly and lip-sync scoring
    // ------------------------------------------------------------------

    #[test]
    fn weekly_picks_score_per_matching_week() {
        let cast = ranking(&["A", "B", "C", "D"]);
        let winners = groups(&[&["A"], &[], &["B", "C"], &["D"]]);
        let picks = ranking(&["A", "A", "C", ""]);
        let score = score_weekly_picks(&picks, &winners, &cast, 2);
        assert_eq!(score.points, 4);
        assert_eq!(score.correct_weeks, vec![0, 2]);
        assert!(score.warnings.is_empty());
    }

    #[test]
    fn weekly_picks_ignore_unplayed_weeks() {
        let cast = ranking(&["A", "B"]);
        let winners = groups(&[&["A"]]);
        let picks = ranking(&["B", "A"]);
        assert_eq!(score_weekly_picks(&picks, &winners, &cast, 2).points, 0);
    }

    #[test]
    fn weekly_pick_outside_cast_warns() {
        let cast = ranking(&["A", "B"]);
        // Ghost was cut from the cast after the result was recorded.
        let winners = groups(&[&["Ghost"], &["A"]]);
        let picks = ranking(&["Ghost", "A"]);
        let score = score_weekly_picks(&picks, &winners, &cast, 2);
        assert_eq!(score.points, 2);
        assert_eq!(score.correct_weeks, vec![1]);
        assert_eq!(score.warnings.len(), 1);
        assert_eq!(score.warnings[0].kind, WarningKind::UnknownQueen);
    }

    #[test]
    fn lip_sync_assassin_scores_each_win() {
        let cast = ranking(&["A", "B", "C"]);
        let winners = groups(&[&["A"], &["B"], &["A", "C"]]);
        let score = score_lip_sync_assassin(Some("A"), &winners, &cast, 3);
        assert_eq!(score.points, 6);
        assert_eq!(score.correct_weeks, vec![0, 2]);

        assert_eq!(score_lip_sync_assassin(None, &winners, &cast, 3).points, 0);
        assert_eq!(score_lip_sync_assassin(Some(""), &winners, &cast, 3).points, 0);
    }

    #[test]
    fn lip_sync_assassin_outside_cast_warns() {
        let cast = ranking(&["B", "C"]);
        let winners = groups(&[&["A"], &["A"]]);
        let score = score_lip_sync_assassin(Some("A"), &winners, &cast, 3);
        assert_eq!(score.points, 0);
        assert_eq!(score.warnings.len(), 1);
        assert_eq!(score.warnings[0].kind, WarningKind::UnknownQueen);
    }
}
