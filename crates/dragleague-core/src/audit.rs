// Admin edit auditing: diff an edited league or player against the original,
// narrate the differences, and commit the edit plus its history line.
//
// The primary write always goes first and its failure propagates. The
// history append afterwards is best-effort: if it fails the edit still
// stands and the outcome reports `audit_recorded = false`.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::bonus::{BonusCategory, BonusPrediction};
use crate::error::{LeagueError, StoreError};
use crate::editing;
use crate::model::{HistoryEntry, League, LeagueStatus, Player, TieGroup};
use crate::ranking::{format_names, ordinal, placement_for_group, predicted_placement};
use crate::results;
use crate::store::RecordStore;

/// Tag that opens every narrated admin edit.
pub const ADMIN_EDIT_TAG: &str = "[ADMIN EDIT]";

/// Which part of a record a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Eliminated,
    ChallengeWinners,
    LipSyncWinners,
    BonusAnswers,
    /// Name, status, cast or point values.
    Settings,
    Rankings,
    WeeklyPicks,
    LipSyncAssassin,
    BonusPredictions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// One index-level difference. `before`/`after` are display strings; an
/// empty string means nothing was set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub field: Field,
    pub label: String,
    pub kind: ChangeKind,
    pub before: String,
    pub after: String,
}

impl Change {
    /// Classify a before/after pair. `None` when they are equal.
    fn between(field: Field, label: String, before: String, after: String) -> Option<Change> {
        let kind = match (before.is_empty(), after.is_empty()) {
            _ if before == after => return None,
            (true, _) => ChangeKind::Added,
            (_, true) => ChangeKind::Removed,
            _ => ChangeKind::Changed,
        };
        Some(Change {
            field,
            label,
            kind,
            before,
            after,
        })
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ChangeKind::Added => write!(f, "Added {} as {}", self.after, self.label),
            ChangeKind::Removed => write!(f, "Removed {} from {}", self.before, self.label),
            ChangeKind::Changed => {
                write!(f, "Changed {} from {} to {}", self.label, self.before, self.after)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Diffing
// ---------------------------------------------------------------------------

fn render_group(group: Option<&TieGroup>) -> String {
    group.map(|g| format_names(g.names())).unwrap_or_default()
}

fn place_label(placement: u32) -> String {
    format!("{} place", ordinal(placement))
}

/// Index-wise comparison of two tie-group sequences over the longer length.
fn diff_groups(
    field: Field,
    before: &[TieGroup],
    after: &[TieGroup],
    label: impl Fn(usize) -> String,
) -> Vec<Change> {
    (0..before.len().max(after.len()))
        .filter_map(|i| {
            Change::between(
                field,
                label(i),
                render_group(before.get(i)),
                render_group(after.get(i)),
            )
        })
        .collect()
}

/// Label for elimination slot `index`: the placement derived from the edited
/// sequence, or from the original when the edited slot is empty.
fn elimination_label(original: &League, edited: &League, index: usize) -> String {
    let edited_group = edited.eliminated.get(index).filter(|g| !g.is_empty());
    let placement = match edited_group {
        Some(_) => placement_for_group(&edited.eliminated, index, edited.queen_count()),
        None => placement_for_group(&original.eliminated, index, original.queen_count()),
    };
    match placement {
        Some(p) => place_label(p),
        None => format!("elimination {}", index + 1),
    }
}

fn bonus_answer_text(category: Option<&BonusCategory>) -> String {
    category
        .and_then(|c| c.answer.as_ref())
        .map(|a| a.to_raw())
        .unwrap_or_default()
}

/// Name, status, cast and point-value differences. Description, visibility,
/// admins and deadlines are written but not narrated.
fn diff_settings(original: &League, edited: &League) -> Vec<Change> {
    let pairs = [
        ("league name", original.name.clone(), edited.name.clone()),
        ("status", original.status.to_string(), edited.status.to_string()),
        (
            "cast",
            format_names(original.queen_names.as_slice()),
            format_names(edited.queen_names.as_slice()),
        ),
        (
            "placement points",
            original.placement_points.to_string(),
            edited.placement_points.to_string(),
        ),
        (
            "challenge points",
            original.challenge_points.to_string(),
            edited.challenge_points.to_string(),
        ),
        (
            "lip sync points",
            original.lip_sync_points.to_string(),
            edited.lip_sync_points.to_string(),
        ),
    ];
    pairs
        .into_iter()
        .filter_map(|(label, before, after)| {
            Change::between(Field::Settings, label.to_string(), before, after)
        })
        .collect()
}

/// Every difference in admin-entered results between two league states,
/// followed by any settings changes.
pub fn diff_league(original: &League, edited: &League) -> Vec<Change> {
    let mut changes = diff_groups(Field::Eliminated, &original.eliminated, &edited.eliminated, |i| {
        elimination_label(original, edited, i)
    });

    changes.extend(diff_groups(
        Field::ChallengeWinners,
        &original.challenge_winners,
        &edited.challenge_winners,
        |i| format!("Week {} challenge winner", i + 1),
    ));
    changes.extend(diff_groups(
        Field::LipSyncWinners,
        &original.lip_sync_winners,
        &edited.lip_sync_winners,
        |i| format!("Week {} lip sync winner", i + 1),
    ));

    let bonus_len = original.bonus_categories.len().max(edited.bonus_categories.len());
    for i in 0..bonus_len {
        let before = original.bonus_categories.get(i);
        let after = edited.bonus_categories.get(i);
        let label = after
            .or(before)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        changes.extend(Change::between(
            Field::BonusAnswers,
            label,
            bonus_answer_text(before),
            bonus_answer_text(after),
        ));
    }

    changes.extend(diff_settings(original, edited));
    changes
}

fn slot_text(values: &[String], index: usize) -> String {
    values.get(index).cloned().unwrap_or_default()
}

fn prediction_text(predictions: &[BonusPrediction], index: usize) -> String {
    predictions
        .get(index)
        .map(|p| p.answer.clone())
        .unwrap_or_default()
}

/// Every difference in predictions between two states of one player.
pub fn diff_player(original: &Player, edited: &Player, league: &League) -> Vec<Change> {
    let total = league.queen_count();
    let mut changes = Vec::new();

    for i in 0..original.rankings.len().max(edited.rankings.len()) {
        let label = match predicted_placement(i, total) {
            Some(p) => place_label(p),
            None => format!("ranking slot {}", i + 1),
        };
        changes.extend(Change::between(
            Field::Rankings,
            label,
            slot_text(&original.rankings, i),
            slot_text(&edited.rankings, i),
        ));
    }

    for i in 0..original.weekly_picks.len().max(edited.weekly_picks.len()) {
        changes.extend(Change::between(
            Field::WeeklyPicks,
            format!("Week {} pick", i + 1),
            slot_text(&original.weekly_picks, i),
            slot_text(&edited.weekly_picks, i),
        ));
    }

    changes.extend(Change::between(
        Field::LipSyncAssassin,
        "lip sync assassin".to_string(),
        original.lip_sync_assassin.clone().unwrap_or_default(),
        edited.lip_sync_assassin.clone().unwrap_or_default(),
    ));

    let bonus_len = original
        .bonus_predictions
        .len()
        .max(edited.bonus_predictions.len());
    for i in 0..bonus_len {
        let label = league
            .bonus_categories
            .get(i)
            .map(|c| c.name.clone())
            .or_else(|| edited.bonus_predictions.get(i).map(|p| p.category.clone()))
            .or_else(|| original.bonus_predictions.get(i).map(|p| p.category.clone()))
            .unwrap_or_default();
        changes.extend(Change::between(
            Field::BonusPredictions,
            label,
            prediction_text(&original.bonus_predictions, i),
            prediction_text(&edited.bonus_predictions, i),
        ));
    }

    changes
}

/// One audit line for `subject`, or `None` when nothing changed.
pub fn narrate(subject: &str, changes: &[Change]) -> Option<String> {
    if changes.is_empty() {
        return None;
    }
    let sentences: Vec<String> = changes.iter().map(Change::to_string).collect();
    Some(format!("{ADMIN_EDIT_TAG} {subject}: {}", sentences.join("; ")))
}

// ---------------------------------------------------------------------------
// Committing
// ---------------------------------------------------------------------------

/// What an admin edit did.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub changes: Vec<Change>,
    /// The history line that was (or should have been) appended.
    pub entry: Option<HistoryEntry>,
    /// `false` when the primary write succeeded but the history append did
    /// not. The edit is still committed.
    pub audit_recorded: bool,
}

impl EditOutcome {
    fn unchanged() -> Self {
        EditOutcome {
            changes: Vec::new(),
            entry: None,
            audit_recorded: true,
        }
    }
}

fn append_best_effort<S: RecordStore + ?Sized>(
    store: &S,
    league: &League,
    entry: &HistoryEntry,
) -> bool {
    match store.append_history(league.id, entry) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "edit to league {} committed but its history entry was not recorded: {}",
                league.id, e
            );
            false
        }
    }
}

/// Cast, bonus category definitions and point values are fixed once the
/// season is under way. Resolving a bonus answer is still allowed.
fn ensure_scoring_frozen(original: &League, edited: &League) -> Result<(), LeagueError> {
    if original.status < LeagueStatus::Active {
        return Ok(());
    }
    let same_categories = original.bonus_categories.len() == edited.bonus_categories.len()
        && original
            .bonus_categories
            .iter()
            .zip(&edited.bonus_categories)
            .all(|(a, b)| a.name == b.name && a.points == b.points && a.kind == b.kind);
    let unchanged = same_categories
        && original.queen_names == edited.queen_names
        && original.placement_points == edited.placement_points
        && original.challenge_points == edited.challenge_points
        && original.lip_sync_points == edited.lip_sync_points;
    if !unchanged {
        return Err(LeagueError::InvalidState {
            status: original.status,
            action: "change the cast or scoring rules",
        });
    }
    Ok(())
}

/// History is appended through the store, never rewritten by an edit.
fn differs_ignoring_history(original: &League, edited: &League) -> bool {
    let strip = |league: &League| League {
        history: Vec::new(),
        ..league.clone()
    };
    strip(original) != strip(edited)
}

/// Write `edited`, then narrate `changes` into `league`'s history.
fn record_edit<S, W>(
    store: &S,
    league: &League,
    subject: &str,
    changes: Vec<Change>,
    actor: &str,
    now: DateTime<Utc>,
    write: W,
) -> Result<EditOutcome, LeagueError>
where
    S: RecordStore + ?Sized,
    W: FnOnce(&S) -> Result<(), StoreError>,
{
    write(store)?;
    debug!("{} edited by {}: {} change(s)", subject, actor, changes.len());

    let Some(text) = narrate(subject, &changes) else {
        return Ok(EditOutcome {
            changes,
            entry: None,
            audit_recorded: true,
        });
    };
    let entry = HistoryEntry::new(now, actor, text);
    let audit_recorded = append_best_effort(store, league, &entry);
    Ok(EditOutcome {
        changes,
        entry: Some(entry),
        audit_recorded,
    })
}

/// Persist an admin's direct edit of a league and record what changed.
///
/// Rejects a status that moves backwards, changes to the cast or scoring
/// rules once the league is active, and results that name a queen twice,
/// outside the cast, or past the season length. Any other difference is
/// written even when nothing about it is narrated.
pub fn commit_league_edit<S: RecordStore + ?Sized>(
    store: &S,
    original: &League,
    edited: &League,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<EditOutcome, LeagueError> {
    if edited.status < original.status {
        return Err(LeagueError::InvalidState {
            status: original.status,
            action: "move the league status backwards",
        });
    }
    ensure_scoring_frozen(original, edited)?;
    results::validate_results(edited)?;

    if !differs_ignoring_history(original, edited) {
        return Ok(EditOutcome::unchanged());
    }
    let changes = diff_league(original, edited);
    record_edit(store, edited, &edited.name, changes, actor, now, |s| {
        s.update_league(edited)
    })
}

/// Persist an admin's edit of a player's predictions and record it in the
/// league's history. Deadlines do not apply to admins, but the snapshot must
/// still be a valid set of predictions and the league must not be finished.
pub fn commit_player_edit<S: RecordStore + ?Sized>(
    store: &S,
    league: &League,
    original: &Player,
    edited: &Player,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<EditOutcome, LeagueError> {
    if league.status == LeagueStatus::Finished {
        return Err(LeagueError::InvalidState {
            status: league.status,
            action: "edit predictions",
        });
    }
    editing::validate_predictions(league, edited)?;

    if original == edited {
        return Ok(EditOutcome::unchanged());
    }
    let changes = diff_player(original, edited, league);
    record_edit(store, league, &edited.display_name, changes, actor, now, |s| {
        s.update_player(edited)
    })
}
