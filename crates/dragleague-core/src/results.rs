// Admin results entry: eliminations, weekly winners, and bonus resolutions.
//
// These mutate an in-memory League; callers persist it (usually through the
// audit engine so the change is narrated).

use thiserror::Error;
use tracing::info;

use crate::bonus::{BonusAnswer, BonusError};
use crate::lifecycle;
use crate::model::{League, LeagueStatus, TieGroup};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultsError {
    #[error("`{name}` is not in this league's cast")]
    UnknownQueen { name: String },

    #[error("`{name}` is already eliminated in slot {slot}")]
    AlreadyEliminated { name: String, slot: usize },

    #[error("slot {slot} is out of range for a cast of {total} queens")]
    SlotOutOfRange { slot: usize, total: usize },

    #[error("recording {requested} eliminations would exceed the {total} queens in the cast")]
    TooManyEliminated { requested: usize, total: usize },

    #[error("league is finished; results are frozen")]
    LeagueFinished,

    #[error("no bonus category at index {index}")]
    BonusIndexOutOfRange { index: usize },

    #[error("invalid answer for bonus category `{category}`: {source}")]
    InvalidBonusAnswer {
        category: String,
        source: BonusError,
    },
}

/// Record the tie-group eliminated at `slot` (0 = first elimination). An
/// empty group clears the slot back to a placeholder.
///
/// Each queen may appear in at most one elimination slot across the season.
pub fn record_elimination(
    league: &mut League,
    slot: usize,
    group: TieGroup,
) -> Result<(), ResultsError> {
    ensure_open(league)?;
    ensure_slot(league, slot)?;
    ensure_cast(league, &group)?;

    for name in group.iter() {
        if let Some(existing) = league.elimination_slot_of(name) {
            if existing != slot {
                return Err(ResultsError::AlreadyEliminated {
                    name: name.to_string(),
                    slot: existing,
                });
            }
        }
    }

    let others: usize = league
        .eliminated
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != slot)
        .map(|(_, g)| g.len())
        .sum();
    let requested = others + group.len();
    if requested > league.queen_count() {
        return Err(ResultsError::TooManyEliminated {
            requested,
            total: league.queen_count(),
        });
    }

    let recorded = !group.is_empty();
    set_slot(&mut league.eliminated, slot, group);
    if recorded {
        begin_if_needed(league);
    }
    Ok(())
}

/// Record the challenge winner(s) for `week` (0-based). Empty = no winner.
pub fn record_challenge_winners(
    league: &mut League,
    week: usize,
    group: TieGroup,
) -> Result<(), ResultsError> {
    ensure_open(league)?;
    ensure_slot(league, week)?;
    ensure_cast(league, &group)?;
    let recorded = !group.is_empty();
    set_slot(&mut league.challenge_winners, week, group);
    if recorded {
        begin_if_needed(league);
    }
    Ok(())
}

/// Record the lip-sync winner(s) for `week` (0-based). Empty = no winner.
pub fn record_lip_sync_winners(
    league: &mut League,
    week: usize,
    group: TieGroup,
) -> Result<(), ResultsError> {
    ensure_open(league)?;
    ensure_slot(league, week)?;
    ensure_cast(league, &group)?;
    let recorded = !group.is_empty();
    set_slot(&mut league.lip_sync_winners, week, group);
    if recorded {
        begin_if_needed(league);
    }
    Ok(())
}

/// Set (or with `None`, clear) the resolved answer of a bonus category.
/// Queen answers must name a queen in the cast.
pub fn resolve_bonus(
    league: &mut League,
    index: usize,
    raw_answer: Option<&str>,
) -> Result<(), ResultsError> {
    ensure_open(league)?;
    let cast = league.queen_names.clone();
    let category = league
        .bonus_categories
        .get_mut(index)
        .ok_or(ResultsError::BonusIndexOutOfRange { index })?;

    let answer = match raw_answer {
        None => None,
        Some(raw) => {
            let answer = BonusAnswer::parse(category.kind, raw).map_err(|source| {
                ResultsError::InvalidBonusAnswer {
                    category: category.name.clone(),
                    source,
                }
            })?;
            if let BonusAnswer::Queen(name) = &answer {
                if !cast.iter().any(|q| q == name) {
                    return Err(ResultsError::UnknownQueen { name: name.clone() });
                }
            }
            Some(answer)
        }
    };
    category.answer = answer;
    Ok(())
}

/// Check a whole elimination sequence at once, as submitted by a direct
/// admin edit: every name in the cast, no queen in two slots, and no more
/// eliminations than queens.
pub fn validate_eliminations(league: &League) -> Result<(), ResultsError> {
    ensure_len(league, &league.eliminated)?;
    let mut seen: Vec<(&str, usize)> = Vec::new();
    for (slot, group) in league.eliminated.iter().enumerate() {
        ensure_cast(league, group)?;
        for name in group.iter() {
            if let Some((_, first)) = seen.iter().find(|(n, _)| *n == name) {
                return Err(ResultsError::AlreadyEliminated {
                    name: name.to_string(),
                    slot: *first,
                });
            }
            seen.push((name, slot));
        }
    }
    if seen.len() > league.queen_count() {
        return Err(ResultsError::TooManyEliminated {
            requested: seen.len(),
            total: league.queen_count(),
        });
    }
    Ok(())
}

/// Check every recorded result of a directly edited league: the elimination
/// sequence, plus weekly winners that stay within the cast and the season
/// length.
pub fn validate_results(league: &League) -> Result<(), ResultsError> {
    validate_eliminations(league)?;
    for weeks in [&league.challenge_winners, &league.lip_sync_winners] {
        ensure_len(league, weeks)?;
        for group in weeks {
            ensure_cast(league, group)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ensure_open(league: &League) -> Result<(), ResultsError> {
    if league.status == LeagueStatus::Finished {
        return Err(ResultsError::LeagueFinished);
    }
    Ok(())
}

/// A season has at most one elimination (and one week) per queen.
fn ensure_slot(league: &League, slot: usize) -> Result<(), ResultsError> {
    if slot >= league.queen_count() {
        return Err(ResultsError::SlotOutOfRange {
            slot,
            total: league.queen_count(),
        });
    }
    Ok(())
}

fn ensure_len(league: &League, slots: &[TieGroup]) -> Result<(), ResultsError> {
    match slots.len().checked_sub(1) {
        Some(last) => ensure_slot(league, last),
        None => Ok(()),
    }
}

fn ensure_cast(league: &League, group: &TieGroup) -> Result<(), ResultsError> {
    match group.iter().find(|name| !league.has_queen(name)) {
        Some(name) => Err(ResultsError::UnknownQueen {
            name: name.to_string(),
        }),
        None => Ok(()),
    }
}

/// Write `group` at `index`, padding with placeholders as needed. `index` is
/// already bounded by the cast size.
fn set_slot(slots: &mut Vec<TieGroup>, index: usize, group: TieGroup) {
    if slots.len() <= index {
        slots.resize(index + 1, TieGroup::empty());
    }
    slots[index] = group;
}

fn begin_if_needed(league: &mut League) {
    if lifecycle::start_on_first_results(league) {
        info!("league {} started on first recorded results", league.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::{BonusCategory, BonusKind};
    use crate::model::league::test_support::league_with_queens;

    #[test]
    fn elimination_pads_with_placeholders() {
        let mut league = league_with_queens(&["A", "B", "C", "D"]);
        record_elimination(&mut league, 2, TieGroup::single("C")).unwrap();
        assert_eq!(league.eliminated.len(), 3);
        assert!(league.eliminated[0].is_empty());
        assert!(league.eliminated[1].is_empty());
        assert!(league.eliminated[2].contains("C"));
    }

    #[test]
    fn first_result_starts_league() {
        let mut league = league_with_queens(&["A", "B"]);
        assert_eq!(league.status, LeagueStatus::NotStarted);
        record_elimination(&mut league, 0, TieGroup::single("A")).unwrap();
        assert_eq!(league.status, LeagueStatus::Active);
    }

    #[test]
    fn clearing_a_slot_does_not_start_league() {
        let mut league = league_with_queens(&["A", "B"]);
        record_elimination(&mut league, 0, TieGroup::empty()).unwrap();
        assert_eq!(league.status, LeagueStatus::NotStarted);
    }

    #[test]
    fn elimination_slots_stay_disjoint() {
        let mut league = league_with_queens(&["A", "B", "C"]);
        record_elimination(&mut league, 0, TieGroup::single("A")).unwrap();
        let err = record_elimination(&mut league, 1, TieGroup::new(["B", "A"])).unwrap_err();
        assert_eq!(
            err,
            ResultsError::AlreadyEliminated {
                name: "A".to_string(),
                slot: 0
            }
        );
        // Re-recording the same slot is fine.
        record_elimination(&mut league, 0, TieGroup::new(["A", "B"])).unwrap();
        assert_eq!(league.eliminated[0].len(), 2);
    }

    #[test]
    fn elimination_rejects_unknown_queen() {
        let mut league = league_with_queens(&["A", "B"]);
        let err = record_elimination(&mut league, 0, TieGroup::single("Z")).unwrap_err();
        assert!(matches!(err, ResultsError::UnknownQueen { name } if name == "Z"));
        assert!(league.eliminated.is_empty());
    }

    #[test]
    fn elimination_rejects_overflow() {
        // B and E were dropped from the cast after being eliminated.
        let mut league = league_with_queens(&["A", "C", "D"]);
        league.eliminated = vec![TieGroup::single("A"), TieGroup::new(["B", "E"])];
        let err = record_elimination(&mut league, 2, TieGroup::single("C")).unwrap_err();
        assert_eq!(
            err,
            ResultsError::TooManyEliminated {
                requested: 4,
                total: 3
            }
        );
    }

    #[test]
    fn elimination_slot_past_cast_is_rejected() {
        let mut league = league_with_queens(&["A", "B"]);
        assert_eq!(
            record_elimination(&mut league, 1000, TieGroup::single("A")),
            Err(ResultsError::SlotOutOfRange { slot: 1000, total: 2 })
        );
        assert_eq!(
            record_elimination(&mut league, usize::MAX, TieGroup::empty()),
            Err(ResultsError::SlotOutOfRange {
                slot: usize::MAX,
                total: 2
            })
        );
        assert!(league.eliminated.is_empty());

        // The last slot is still usable.
        record_elimination(&mut league, 1, TieGroup::single("B")).unwrap();
        assert_eq!(league.eliminated.len(), 2);
    }

    #[test]
    fn weekly_winner_week_past_cast_is_rejected() {
        let mut league = league_with_queens(&["A", "B", "C"]);
        assert_eq!(
            record_challenge_winners(&mut league, 3, TieGroup::single("A")),
            Err(ResultsError::SlotOutOfRange { slot: 3, total: 3 })
        );
        assert_eq!(
            record_lip_sync_winners(&mut league, usize::MAX, TieGroup::single("A")),
            Err(ResultsError::SlotOutOfRange {
                slot: usize::MAX,
                total: 3
            })
        );
        assert!(league.challenge_winners.is_empty());
        assert!(league.lip_sync_winners.is_empty());
    }

    #[test]
    fn validate_results_bounds_every_sequence() {
        let mut league = league_with_queens(&["A", "B"]);
        league.eliminated = vec![TieGroup::empty(); 3];
        assert_eq!(
            validate_results(&league),
            Err(ResultsError::SlotOutOfRange { slot: 2, total: 2 })
        );

        league.eliminated.clear();
        league.challenge_winners = vec![TieGroup::single("A"), TieGroup::single("Z")];
        assert!(matches!(
            validate_results(&league),
            Err(ResultsError::UnknownQueen { name }) if name == "Z"
        ));

        league.challenge_winners.pop();
        league.lip_sync_winners = vec![TieGroup::single("B"); 3];
        assert_eq!(
            validate_results(&league),
            Err(ResultsError::SlotOutOfRange { slot: 2, total: 2 })
        );

        league.lip_sync_winners.truncate(2);
        assert_eq!(validate_results(&league), Ok(()));
    }

    #[test]
    fn validate_eliminations_catches_repeats() {
        let mut league = league_with_queens(&["A", "B", "C"]);
        league.eliminated = vec![TieGroup::single("A"), TieGroup::empty(), TieGroup::new(["B", "A"])];
        assert_eq!(
            validate_eliminations(&league),
            Err(ResultsError::AlreadyEliminated {
                name: "A".to_string(),
                slot: 0
            })
        );

        league.eliminated = vec![TieGroup::single("A"), TieGroup::new(["B", "C"])];
        assert_eq!(validate_eliminations(&league), Ok(()));

        league.eliminated.push(TieGroup::single("Z"));
        assert!(matches!(
            validate_eliminations(&league),
            Err(ResultsError::UnknownQueen { .. })
        ));
    }

    #[test]
    fn finished_league_is_frozen() {
        let mut league = league_with_queens(&["A", "B"]);
        league.status = LeagueStatus::Finished;
        assert_eq!(
            record_challenge_winners(&mut league, 0, TieGroup::single("A")),
            Err(ResultsError::LeagueFinished)
        );
    }

    #[test]
    fn weekly_winners_allow_ties_and_no_winner() {
        let mut league = league_with_queens(&["A", "B", "C"]);
        record_challenge_winners(&mut league, 0, TieGroup::new(["A", "B"])).unwrap();
        record_challenge_winners(&mut league, 1, TieGroup::empty()).unwrap();
        record_lip_sync_winners(&mut league, 0, TieGroup::single("C")).unwrap();
        assert_eq!(league.challenge_winners.len(), 2);
        assert!(league.challenge_winners[1].is_empty());
        assert!(league.lip_sync_winners[0].contains("C"));
    }

    #[test]
    fn resolve_bonus_validates_kind_and_cast() {
        let mut league = league_with_queens(&["A", "B"]);
        league.bonus_categories = vec![
            BonusCategory::new("Miss Congeniality", 5, BonusKind::Queens),
            BonusCategory::new("Most wins", 3, BonusKind::Number),
        ];

        resolve_bonus(&mut league, 0, Some("B")).unwrap();
        assert_eq!(
            league.bonus_categories[0].answer,
            Some(BonusAnswer::Queen("B".to_string()))
        );

        assert!(matches!(
            resolve_bonus(&mut league, 0, Some("Z")),
            Err(ResultsError::UnknownQueen { .. })
        ));
        assert!(matches!(
            resolve_bonus(&mut league, 1, Some("lots")),
            Err(ResultsError::InvalidBonusAnswer { .. })
        ));
        assert_eq!(
            resolve_bonus(&mut league, 5, Some("1")),
            Err(ResultsError::BonusIndexOutOfRange { index: 5 })
        );

        resolve_bonus(&mut league, 0, None).unwrap();
        assert!(league.bonus_categories[0].answer.is_none());
    }
}
