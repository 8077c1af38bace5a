// League record: cast, point values, actual results, lifecycle status and the
// audit history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::codec::CodecError;
use super::history::HistoryEntry;
use super::tie_group::TieGroup;
use crate::bonus::BonusCategory;

/// Where a league is in its season. Ordering follows the lifecycle, so a
/// status can be compared against the next one to reject regressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LeagueStatus {
    #[serde(rename = "not started")]
    NotStarted,
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "finished")]
    Finished,
}

impl LeagueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeagueStatus::NotStarted => "not started",
            LeagueStatus::Active => "active",
            LeagueStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for LeagueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeagueStatus {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not started" => Ok(LeagueStatus::NotStarted),
            "active" => Ok(LeagueStatus::Active),
            "finished" => Ok(LeagueStatus::Finished),
            _ => Err(CodecError::UnknownStatus { raw: s.to_string() }),
        }
    }
}

/// Points awarded for a correctly predicted placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPoints {
    /// The same value for every placement.
    Flat(u32),
    /// Per-placement values; index 0 is 1st place (the winner). Placements
    /// past the end of the table are worth nothing.
    Table(Vec<u32>),
}

impl PlacementPoints {
    pub fn points_for(&self, placement: u32) -> u32 {
        match self {
            PlacementPoints::Flat(points) => *points,
            PlacementPoints::Table(table) => placement
                .checked_sub(1)
                .and_then(|i| table.get(i as usize))
                .copied()
                .unwrap_or(0),
        }
    }
}

impl fmt::Display for PlacementPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementPoints::Flat(points) => write!(f, "{points}"),
            PlacementPoints::Table(table) => {
                let values: Vec<String> = table.iter().map(u32::to_string).collect();
                write!(f, "[{}]", values.join(", "))
            }
        }
    }
}

impl Default for PlacementPoints {
    fn default() -> Self {
        PlacementPoints::Flat(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// User ids allowed to administer the league.
    pub admins: Vec<String>,
    pub public: bool,
    /// Contestants in display order. Unique and pipe-free.
    pub queen_names: Vec<String>,
    pub placement_points: PlacementPoints,
    pub challenge_points: u32,
    pub lip_sync_points: u32,
    pub bonus_categories: Vec<BonusCategory>,
    /// Elimination tie-groups, index 0 = first eliminated.
    pub eliminated: Vec<TieGroup>,
    /// Weekly challenge winners, one tie-group per week.
    pub challenge_winners: Vec<TieGroup>,
    /// Weekly lip-sync winners, one tie-group per week.
    pub lip_sync_winners: Vec<TieGroup>,
    pub ranking_deadline: DateTime<Utc>,
    pub weekly_deadline: Option<DateTime<Utc>>,
    pub status: LeagueStatus,
    /// Append-only audit log.
    pub history: Vec<HistoryEntry>,
}

impl League {
    /// Total number of contestants (`T` in the placement formula).
    pub fn queen_count(&self) -> usize {
        self.queen_names.len()
    }

    pub fn has_queen(&self, name: &str) -> bool {
        self.queen_names.iter().any(|q| q == name)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|a| a == user_id)
    }

    /// Index of the elimination slot holding `name`, if any.
    pub fn elimination_slot_of(&self, name: &str) -> Option<usize> {
        self.eliminated.iter().position(|g| g.contains(name))
    }

    /// Move the status forward. Returns `false` (and leaves the status alone)
    /// when `next` is not strictly later than the current status.
    pub fn advance_status(&mut self, next: LeagueStatus) -> bool {
        if next <= self.status {
            return false;
        }
        self.status = next;
        true
    }

    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn status_ordering_follows_lifecycle() {
        assert!(LeagueStatus::NotStarted < LeagueStatus::Active);
        assert!(LeagueStatus::Active < LeagueStatus::Finished);
    }

    #[test]
    fn status_parses_wire_strings() {
        assert_eq!("not started".parse::<LeagueStatus>().unwrap(), LeagueStatus::NotStarted);
        assert_eq!("Active".parse::<LeagueStatus>().unwrap(), LeagueStatus::Active);
        assert!("paused".parse::<LeagueStatus>().is_err());
        assert_eq!(LeagueStatus::Finished.to_string(), "finished");
    }

    #[test]
    fn advance_status_never_regresses() {
        let mut league = league_with_queens(&["A", "B"]);
        assert!(league.advance_status(LeagueStatus::Active));
        assert!(!league.advance_status(LeagueStatus::NotStarted));
        assert!(!league.advance_status(LeagueStatus::Active));
        assert_eq!(league.status, LeagueStatus::Active);
        assert!(league.advance_status(LeagueStatus::Finished));
        assert!(!league.advance_status(LeagueStatus::Active));
        assert_eq!(league.status, LeagueStatus::Finished);
    }

    #[test]
    fn placement_points_table_lookup() {
        let table = PlacementPoints::Table(vec![10, 6, 4]);
        assert_eq!(table.points_for(1), 10);
        assert_eq!(table.points_for(3), 4);
        assert_eq!(table.points_for(4), 0);
        assert_eq!(table.points_for(0), 0);
        assert_eq!(PlacementPoints::Flat(3).points_for(12), 3);
        assert_eq!(table.to_string(), "[10, 6, 4]");
    }

    #[test]
    fn elimination_slot_lookup() {
        let mut league = league_with_queens(&["A", "B", "C"]);
        league.eliminated = vec![TieGroup::single("A"), TieGroup::new(["B", "C"])];
        assert_eq!(league.elimination_slot_of("C"), Some(1));
        assert_eq!(league.elimination_slot_of("Z"), None);
    }
}
