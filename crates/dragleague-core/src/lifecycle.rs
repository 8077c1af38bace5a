// League lifecycle: not started -> active -> finished.
//
// A league starts either when its ranking deadline passes (pruning players
// who never submitted a ranking) or when the first result is recorded.
// Every transition re-reads the league right before acting so that repeated
// or overlapping triggers do nothing after the first.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::LeagueError;
use crate::model::{HistoryEntry, League, LeagueStatus};
use crate::ranking::{format_names, has_submitted_ranking};
use crate::store::{LeagueFilter, PlayerFilter, RecordStore};

/// What a transition attempt did. Only `Started` and `Finished` mean the
/// store was changed; the rest are informational and never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The league went active; `removed` names the pruned players.
    Started { removed: Vec<String> },
    /// The league was no longer "not started" when re-read.
    AlreadyStarted { status: LeagueStatus },
    DeadlineNotPassed { deadline: DateTime<Utc> },
    Finished,
    AlreadyFinished,
    /// `finish` was asked of a league that never started.
    NotStarted,
}

impl TransitionOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, TransitionOutcome::Started { .. } | TransitionOutcome::Finished)
    }
}

impl fmt::Display for TransitionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionOutcome::Started { removed } if removed.is_empty() => {
                write!(f, "started, no players removed")
            }
            TransitionOutcome::Started { removed } => {
                write!(f, "started, removed {}", format_names(removed.as_slice()))
            }
            TransitionOutcome::AlreadyStarted { status } => write!(f, "already {status}"),
            TransitionOutcome::DeadlineNotPassed { deadline } => {
                write!(f, "ranking deadline not reached ({deadline})")
            }
            TransitionOutcome::Finished => write!(f, "finished"),
            TransitionOutcome::AlreadyFinished => write!(f, "already finished"),
            TransitionOutcome::NotStarted => write!(f, "not started yet"),
        }
    }
}

/// History text for the deadline transition.
fn pruning_text(removed: &[String]) -> String {
    if removed.is_empty() {
        "Ranking deadline passed; league started with no players removed".to_string()
    } else {
        format!(
            "Ranking deadline passed; removed {} for not submitting a ranking",
            format_names(removed)
        )
    }
}

/// Start a league whose ranking deadline has passed, deleting every player
/// that never filled in a single ranking slot.
///
/// Idempotent: once the league has left "not started" this returns
/// `AlreadyStarted` without touching the store.
pub fn start_after_deadline<S: RecordStore + ?Sized>(
    store: &S,
    league_id: Uuid,
    now: DateTime<Utc>,
    actor: &str,
) -> Result<TransitionOutcome, LeagueError> {
    let mut league = store.get_league(league_id)?;

    if league.status != LeagueStatus::NotStarted {
        return Ok(TransitionOutcome::AlreadyStarted {
            status: league.status,
        });
    }
    if now < league.ranking_deadline {
        return Ok(TransitionOutcome::DeadlineNotPassed {
            deadline: league.ranking_deadline,
        });
    }

    let players = store.list_players(&PlayerFilter::in_league(league_id), None)?;
    let mut removed = Vec::new();
    for player in players.iter().filter(|p| !has_submitted_ranking(&p.rankings)) {
        store.delete_player(player.id)?;
        removed.push(player.display_name.clone());
    }

    store.append_history(league_id, &HistoryEntry::new(now, actor, pruning_text(&removed)))?;

    league.advance_status(LeagueStatus::Active);
    store.update_league(&league)?;

    info!(
        "league {} ({}) started after ranking deadline, {} player(s) removed",
        league.id,
        league.name,
        removed.len()
    );
    Ok(TransitionOutcome::Started { removed })
}

/// Flip a not-started league to active in memory because results are being
/// recorded. No pruning happens on this path. Returns whether the status
/// changed.
pub fn start_on_first_results(league: &mut League) -> bool {
    league.status == LeagueStatus::NotStarted && league.advance_status(LeagueStatus::Active)
}

/// Close an active league. Finished leagues freeze results and predictions.
pub fn finish<S: RecordStore + ?Sized>(
    store: &S,
    league_id: Uuid,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, LeagueError> {
    let mut league = store.get_league(league_id)?;

    match league.status {
        LeagueStatus::NotStarted => return Ok(TransitionOutcome::NotStarted),
        LeagueStatus::Finished => return Ok(TransitionOutcome::AlreadyFinished),
        LeagueStatus::Active => {}
    }

    league.advance_status(LeagueStatus::Finished);
    store.update_league(&league)?;
    store.append_history(league_id, &HistoryEntry::new(now, actor, "League finished"))?;

    info!("league {} ({}) finished", league.id, league.name);
    Ok(TransitionOutcome::Finished)
}

/// Result of one league's deadline check.
#[derive(Debug)]
pub struct DeadlineCheck {
    pub league_id: Uuid,
    pub league_name: String,
    pub result: Result<TransitionOutcome, LeagueError>,
}

/// Run the deadline transition over every not-started league. One league's
/// failure is logged and reported without stopping the others.
pub fn check_all_deadlines<S: RecordStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
    actor: &str,
) -> Result<Vec<DeadlineCheck>, LeagueError> {
    let leagues = store.list_leagues(&LeagueFilter::with_status(LeagueStatus::NotStarted), None)?;

    let checks = leagues
        .into_iter()
        .map(|league| {
            let result = start_after_deadline(store, league.id, now, actor);
            if let Err(e) = &result {
                warn!("deadline check failed for league {}: {}", league.id, e);
            }
            DeadlineCheck {
                league_id: league.id,
                league_name: league.name,
                result,
            }
        })
        .collect();

    Ok(checks)
}
