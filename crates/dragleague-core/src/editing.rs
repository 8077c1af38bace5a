// Player prediction editing: rankings (swap-on-reassign), weekly picks, the
// lip-sync assassin, and bonus predictions, gated by the league deadlines.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::bonus::{BonusAnswer, BonusError, BonusPrediction};
use crate::error::LeagueError;
use crate::model::codec::sanitize;
use crate::model::{League, LeagueStatus, Player};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("slot {slot} is out of range (ranking has {len} slots)")]
    SlotOutOfRange { slot: usize, len: usize },

    #[error("week {week} is out of range (a season has at most {weeks} weeks)")]
    WeekOutOfRange { week: usize, weeks: usize },

    #[error("ranking has {len} slots but the cast has {expected} queens")]
    RankingLength { len: usize, expected: usize },

    #[error("`{name}` is ranked in both slot {first} and slot {second}")]
    DuplicateRanking {
        name: String,
        first: usize,
        second: usize,
    },

    #[error("`{name}` is not in this league's cast")]
    UnknownQueen { name: String },

    #[error("no bonus category at index {index}")]
    BonusIndexOutOfRange { index: usize },

    #[error("invalid answer for bonus category `{category}`: {source}")]
    InvalidBonusAnswer {
        category: String,
        source: BonusError,
    },
}

/// Which deadline locks a given prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Rankings and bonus predictions.
    Ranking,
    /// Weekly winner picks.
    Weekly,
}

/// A single change a player (or an admin on their behalf) makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEdit {
    AssignRanking { slot: usize, queen: String },
    ClearRanking { slot: usize },
    WeeklyPick { week: usize, queen: Option<String> },
    LipSyncAssassin { queen: Option<String> },
    BonusPrediction { index: usize, answer: String },
}

impl PlayerEdit {
    pub fn deadline(&self) -> Deadline {
        match self {
            PlayerEdit::WeeklyPick { .. } => Deadline::Weekly,
            _ => Deadline::Ranking,
        }
    }
}

/// Check that a prediction guarded by `deadline` may still be changed.
/// Admins bypass deadlines; nobody edits a finished league.
pub fn ensure_editable(
    league: &League,
    deadline: Deadline,
    now: DateTime<Utc>,
    is_admin: bool,
) -> Result<(), LeagueError> {
    if league.status == LeagueStatus::Finished {
        return Err(LeagueError::InvalidState {
            status: league.status,
            action: "edit predictions",
        });
    }
    if is_admin {
        return Ok(());
    }
    let (field, cutoff) = match deadline {
        Deadline::Ranking => ("ranking", Some(league.ranking_deadline)),
        Deadline::Weekly => ("weekly", league.weekly_deadline),
    };
    match cutoff {
        Some(cutoff) if now >= cutoff => Err(LeagueError::DeadlinePassed {
            field,
            deadline: cutoff,
        }),
        _ => Ok(()),
    }
}

/// Check the deadline for `edit`, then apply it to `player`.
pub fn apply_edit(
    league: &League,
    player: &mut Player,
    edit: PlayerEdit,
    now: DateTime<Utc>,
    is_admin: bool,
) -> Result<(), LeagueError> {
    ensure_editable(league, edit.deadline(), now, is_admin)?;
    match edit {
        PlayerEdit::AssignRanking { slot, queen } => assign_ranking(league, player, slot, &queen)?,
        PlayerEdit::ClearRanking { slot } => clear_ranking_slot(league, player, slot)?,
        PlayerEdit::WeeklyPick { week, queen } => {
            set_weekly_pick(league, player, week, queen.as_deref())?
        }
        PlayerEdit::LipSyncAssassin { queen } => {
            set_lip_sync_assassin(league, player, queen.as_deref())?
        }
        PlayerEdit::BonusPrediction { index, answer } => {
            set_bonus_prediction(league, player, index, &answer)?
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

/// Put `queen` into ranking `slot`. If she already sits in another slot, that
/// slot receives whatever `slot` held before, so no queen is ever listed
/// twice.
pub fn assign_ranking(
    league: &League,
    player: &mut Player,
    slot: usize,
    queen: &str,
) -> Result<(), EditError> {
    ensure_queen(league, queen)?;
    fit_rankings(league, player);
    let len = player.rankings.len();
    if slot >= len {
        return Err(EditError::SlotOutOfRange { slot, len });
    }

    match player.rankings.iter().position(|r| r == queen) {
        Some(prior) if prior != slot => player.rankings.swap(prior, slot),
        Some(_) => {}
        None => player.rankings[slot] = queen.to_string(),
    }
    Ok(())
}

pub fn clear_ranking_slot(league: &League, player: &mut Player, slot: usize) -> Result<(), EditError> {
    fit_rankings(league, player);
    let len = player.rankings.len();
    let entry = player
        .rankings
        .get_mut(slot)
        .ok_or(EditError::SlotOutOfRange { slot, len })?;
    entry.clear();
    Ok(())
}

/// Rankings always have one slot per queen. Older records may be short.
fn fit_rankings(league: &League, player: &mut Player) {
    if player.rankings.len() < league.queen_count() {
        player.rankings.resize(league.queen_count(), String::new());
    }
}

// ---------------------------------------------------------------------------
// Weekly picks / lip-sync assassin
// ---------------------------------------------------------------------------

pub fn set_weekly_pick(
    league: &League,
    player: &mut Player,
    week: usize,
    queen: Option<&str>,
) -> Result<(), EditError> {
    if week >= league.queen_count() {
        return Err(EditError::WeekOutOfRange {
            week,
            weeks: league.queen_count(),
        });
    }
    let value = match queen.filter(|q| !q.is_empty()) {
        Some(q) => {
            ensure_queen(league, q)?;
            q.to_string()
        }
        None => String::new(),
    };
    if player.weekly_picks.len() <= week {
        player.weekly_picks.resize(week + 1, String::new());
    }
    player.weekly_picks[week] = value;
    Ok(())
}

pub fn set_lip_sync_assassin(
    league: &League,
    player: &mut Player,
    queen: Option<&str>,
) -> Result<(), EditError> {
    player.lip_sync_assassin = match queen.filter(|q| !q.is_empty()) {
        Some(q) => {
            ensure_queen(league, q)?;
            Some(q.to_string())
        }
        None => None,
    };
    Ok(())
}

// ---------------------------------------------------------------------------
// Bonus predictions
// ---------------------------------------------------------------------------

/// Record a bonus answer. The text is sanitized, checked against the
/// category kind, and stored in canonical form. Blank text clears it.
pub fn set_bonus_prediction(
    league: &League,
    player: &mut Player,
    index: usize,
    raw: &str,
) -> Result<(), EditError> {
    let category = league
        .bonus_categories
        .get(index)
        .ok_or(EditError::BonusIndexOutOfRange { index })?;

    let cleaned = sanitize(raw);
    let answer = if cleaned.trim().is_empty() {
        String::new()
    } else {
        let parsed = BonusAnswer::parse(category.kind, &cleaned).map_err(|source| {
            EditError::InvalidBonusAnswer {
                category: category.name.clone(),
                source,
            }
        })?;
        if let BonusAnswer::Queen(name) = &parsed {
            ensure_queen(league, name)?;
        }
        parsed.to_raw()
    };

    if player.bonus_predictions.len() < league.bonus_categories.len() {
        let missing = &league.bonus_categories[player.bonus_predictions.len()..];
        player
            .bonus_predictions
            .extend(missing.iter().map(|c| BonusPrediction::unanswered(&c.name)));
    }
    player.bonus_predictions[index] = BonusPrediction {
        category: category.name.clone(),
        answer,
    };
    Ok(())
}

// ---------------------------------------------------------------------------
// Whole-snapshot validation
// ---------------------------------------------------------------------------

/// Check a complete set of predictions, as submitted by a direct admin edit
/// rather than built up one `PlayerEdit` at a time.
///
/// A ranking is either untouched (empty) or has one slot per queen with no
/// queen listed twice. Every named queen must be in the cast and every
/// bonus answer must parse for its category.
pub fn validate_predictions(league: &League, player: &Player) -> Result<(), EditError> {
    let queens = league.queen_count();
    if !player.rankings.is_empty() && player.rankings.len() != queens {
        return Err(EditError::RankingLength {
            len: player.rankings.len(),
            expected: queens,
        });
    }
    for (slot, queen) in player.rankings.iter().enumerate() {
        if queen.is_empty() {
            continue;
        }
        ensure_queen(league, queen)?;
        if let Some(first) = player.rankings[..slot].iter().position(|r| r == queen) {
            return Err(EditError::DuplicateRanking {
                name: queen.clone(),
                first,
                second: slot,
            });
        }
    }

    if player.weekly_picks.len() > queens {
        return Err(EditError::WeekOutOfRange {
            week: player.weekly_picks.len() - 1,
            weeks: queens,
        });
    }
    for pick in player.weekly_picks.iter().filter(|p| !p.is_empty()) {
        ensure_queen(league, pick)?;
    }
    if let Some(assassin) = player.lip_sync_assassin.as_deref().filter(|a| !a.is_empty()) {
        ensure_queen(league, assassin)?;
    }

    if player.bonus_predictions.len() > league.bonus_categories.len() {
        return Err(EditError::BonusIndexOutOfRange {
            index: league.bonus_categories.len(),
        });
    }
    for (prediction, category) in player.bonus_predictions.iter().zip(&league.bonus_categories) {
        if !prediction.is_answered() {
            continue;
        }
        let parsed = BonusAnswer::parse(category.kind, &prediction.answer).map_err(|source| {
            EditError::InvalidBonusAnswer {
                category: category.name.clone(),
                source,
            }
        })?;
        if let BonusAnswer::Queen(name) = &parsed {
            ensure_queen(league, name)?;
        }
    }
    Ok(())
}

fn ensure_queen(league: &League, name: &str) -> Result<(), EditError> {
    if league.has_queen(name) {
        Ok(())
    } else {
        Err(EditError::UnknownQueen {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::{BonusCategory, BonusKind};
    use crate::model::league::test_support::league_with_queens;
    use crate::model::PlayerRole;
    use chrono::Duration;

    fn setup() -> (League, Player) {
        let league = league_with_queens(&["A", "B", "C", "D"]);
        let player = Player::new(&league, "Jinkx", None, PlayerRole::Member);
        (league, player)
    }

    fn slots(player: &Player) -> Vec<&str> {
        player.rankings.iter().map(String::as_str).collect()
    }

    // ------------------------------------------------------------------
    // Swap-on-reassign
    // ------------------------------------------------------------------

    #[test]
    fn assign_into_empty_slot() {
        let (league, mut player) = setup();
        assign_ranking(&league, &mut player, 2, "B").unwrap();
        assert_eq!(slots(&player), vec!["", "", "B", ""]);
    }

    #[test]
    fn reassign_moves_previous_occupant_into_vacated_slot() {
        let (league, mut player) = setup();
        assign_ranking(&league, &mut player, 0, "A").unwrap();
        assign_ranking(&league, &mut player, 1, "B").unwrap();

        // A moves to slot 1; B (slot 1's old value) goes to slot 0.
        assign_ranking(&league, &mut player, 1, "A").unwrap();
        assert_eq!(slots(&player), vec!["B", "A", "", ""]);
    }

    #[test]
    fn reassign_into_empty_slot_leaves_old_slot_empty() {
        let (league, mut player) = setup();
        assign_ranking(&league, &mut player, 0, "A").unwrap();
        assign_ranking(&league, &mut player, 3, "A").unwrap();
        assert_eq!(slots(&player), vec!["", "", "", "A"]);
    }

    #[test]
    fn never_two_slots_hold_same_queen() {
        let (league, mut player) = setup();
        let moves = [(0, "A"), (1, "B"), (2, "A"), (0, "C"), (3, "B"), (1, "C")];
        for (slot, queen) in moves {
            assign_ranking(&league, &mut player, slot, queen).unwrap();
            for q in ["A", "B", "C", "D"] {
                let count = player.rankings.iter().filter(|r| *r == q).count();
                assert!(count <= 1, "{q} appears {count} times after ({slot}, {queen})");
            }
        }
    }

    #[test]
    fn assign_rejects_unknown_queen_and_bad_slot() {
        let (league, mut player) = setup();
        assert!(matches!(
            assign_ranking(&league, &mut player, 0, "Z"),
            Err(EditError::UnknownQueen { .. })
        ));
        assert_eq!(
            assign_ranking(&league, &mut player, 4, "A"),
            Err(EditError::SlotOutOfRange { slot: 4, len: 4 })
        );
    }

    #[test]
    fn short_legacy_ranking_is_extended() {
        let (league, mut player) = setup();
        player.rankings.clear();
        assign_ranking(&league, &mut player, 3, "D").unwrap();
        assert_eq!(player.rankings.len(), 4);
    }

    #[test]
    fn clear_slot() {
        let (league, mut player) = setup();
        assign_ranking(&league, &mut player, 1, "B").unwrap();
        clear_ranking_slot(&league, &mut player, 1).unwrap();
        assert!(player.rankings.iter().all(String::is_empty));
    }

    // ------------------------------------------------------------------
    // Weekly / bonus
    // ------------------------------------------------------------------

    #[test]
    fn weekly_pick_pads_and_clears() {
        let (league, mut player) = setup();
        set_weekly_pick(&league, &mut player, 2, Some("C")).unwrap();
        assert_eq!(player.weekly_picks, vec!["", "", "C"]);
        set_weekly_pick(&league, &mut player, 2, None).unwrap();
        assert_eq!(player.weekly_picks, vec!["", "", ""]);
    }

    #[test]
    fn weekly_pick_past_season_is_rejected() {
        let (league, mut player) = setup();
        assert_eq!(
            set_weekly_pick(&league, &mut player, 4, Some("A")),
            Err(EditError::WeekOutOfRange { week: 4, weeks: 4 })
        );
        assert_eq!(
            set_weekly_pick(&league, &mut player, usize::MAX, Some("A")),
            Err(EditError::WeekOutOfRange {
                week: usize::MAX,
                weeks: 4
            })
        );
        assert!(player.weekly_picks.is_empty());
        set_weekly_pick(&league, &mut player, 3, Some("A")).unwrap();
        assert_eq!(player.weekly_picks.len(), 4);
    }

    #[test]
    fn snapshot_with_duplicate_ranking_is_rejected() {
        let (league, mut player) = setup();
        player.rankings = vec!["A".into(), "B".into(), "A".into(), "".into()];
        assert_eq!(
            validate_predictions(&league, &player),
            Err(EditError::DuplicateRanking {
                name: "A".to_string(),
                first: 0,
                second: 2
            })
        );
    }

    #[test]
    fn snapshot_ranking_must_fit_cast() {
        let (league, mut player) = setup();
        assert_eq!(validate_predictions(&league, &player), Ok(()));

        player.rankings.push("E".into());
        assert_eq!(
            validate_predictions(&league, &player),
            Err(EditError::RankingLength { len: 5, expected: 4 })
        );

        player.rankings = vec!["A".into(), "Z".into(), "".into(), "".into()];
        assert!(matches!(
            validate_predictions(&league, &player),
            Err(EditError::UnknownQueen { name }) if name == "Z"
        ));

        // A player who never ranked is fine.
        player.rankings.clear();
        assert_eq!(validate_predictions(&league, &player), Ok(()));
    }

    #[test]
    fn snapshot_checks_picks_and_bonus_answers() {
        let (mut league, _) = setup();
        league.bonus_categories = vec![BonusCategory::new("Most wins", 3, BonusKind::Number)];
        let mut player = Player::new(&league, "Jinkx", None, PlayerRole::Member);

        player.weekly_picks = vec!["".into(), "Z".into()];
        assert!(matches!(
            validate_predictions(&league, &player),
            Err(EditError::UnknownQueen { .. })
        ));

        player.weekly_picks = vec!["A".into(); 5];
        assert!(matches!(
            validate_predictions(&league, &player),
            Err(EditError::WeekOutOfRange { week: 4, weeks: 4 })
        ));

        player.weekly_picks.clear();
        player.lip_sync_assassin = Some("Z".into());
        assert!(matches!(
            validate_predictions(&league, &player),
            Err(EditError::UnknownQueen { .. })
        ));

        player.lip_sync_assassin = Some("D".into());
        player.bonus_predictions[0].answer = "lots".into();
        assert!(matches!(
            validate_predictions(&league, &player),
            Err(EditError::InvalidBonusAnswer { .. })
        ));

        player.bonus_predictions[0].answer = "4".into();
        assert_eq!(validate_predictions(&league, &player), Ok(()));
    }

    #[test]
    fn bonus_prediction_is_canonicalised() {
        let (mut league, mut player) = setup();
        league.bonus_categories = vec![
            BonusCategory::new("Double shantay?", 2, BonusKind::YesNo),
            BonusCategory::new("Most wins", 3, BonusKind::Number),
        ];
        set_bonus_prediction(&league, &mut player, 0, "YES").unwrap();
        set_bonus_prediction(&league, &mut player, 1, " 4|").unwrap();

        assert_eq!(player.bonus_predictions[0].answer, "yes");
        assert_eq!(player.bonus_predictions[1].answer, "4");
        assert_eq!(player.bonus_predictions[1].category, "Most wins");
    }

    #[test]
    fn bonus_prediction_rejects_wrong_kind() {
        let (mut league, mut player) = setup();
        league.bonus_categories = vec![BonusCategory::new("Most wins", 3, BonusKind::Number)];
        assert!(matches!(
            set_bonus_prediction(&league, &mut player, 0, "many"),
            Err(EditError::InvalidBonusAnswer { .. })
        ));
    }

    // ------------------------------------------------------------------
    // Deadlines
    // ------------------------------------------------------------------

    #[test]
    fn ranking_locks_at_deadline_for_members() {
        let (league, mut player) = setup();
        let before = league.ranking_deadline - Duration::minutes(1);
        let at = league.ranking_deadline;

        let edit = PlayerEdit::AssignRanking {
            slot: 0,
            queen: "A".into(),
        };
        apply_edit(&league, &mut player, edit.clone(), before, false).unwrap();

        let err = apply_edit(&league, &mut player, edit.clone(), at, false).unwrap_err();
        assert!(matches!(err, LeagueError::DeadlinePassed { field: "ranking", .. }));

        // Admins may still correct it.
        apply_edit(&league, &mut player, edit, at, true).unwrap();
    }

    #[test]
    fn weekly_pick_uses_weekly_deadline() {
        let (mut league, mut player) = setup();
        let after_ranking = league.ranking_deadline + Duration::days(1);

        // No weekly deadline: picks stay open.
        let edit = PlayerEdit::WeeklyPick {
            week: 0,
            queen: Some("A".into()),
        };
        apply_edit(&league, &mut player, edit.clone(), after_ranking, false).unwrap();

        league.weekly_deadline = Some(after_ranking);
        let err = apply_edit(&league, &mut player, edit, after_ranking, false).unwrap_err();
        assert!(matches!(err, LeagueError::DeadlinePassed { field: "weekly", .. }));
    }

    #[test]
    fn finished_league_rejects_even_admins() {
        let (mut league, mut player) = setup();
        league.status = LeagueStatus::Finished;
        let err = apply_edit(
            &league,
            &mut player,
            PlayerEdit::LipSyncAssassin { queen: None },
            league.ranking_deadline,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, LeagueError::InvalidState { .. }));
    }
}
