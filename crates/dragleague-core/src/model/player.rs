// Player record: one user's participation in one league.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::codec::CodecError;
use super::league::League;
use crate::bonus::BonusPrediction;

/// Role tag shown next to a player. Never used for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerRole {
    Admin,
    Member,
}

impl PlayerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerRole::Admin => "Admin",
            PlayerRole::Member => "Member",
        }
    }
}

impl fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerRole {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Admin" | "admin" => Ok(PlayerRole::Admin),
            // Older rows carry an empty status for regular members.
            "Member" | "member" | "" => Ok(PlayerRole::Member),
            _ => Err(CodecError::UnknownRole { raw: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub league_id: Uuid,
    pub user_id: Option<String>,
    pub display_name: String,
    pub role: PlayerRole,
    /// Predicted elimination order; index 0 = first eliminated, last index =
    /// predicted winner. Empty strings are unset slots.
    pub rankings: Vec<String>,
    /// Weekly challenge-winner picks; empty string = no pick that week.
    pub weekly_picks: Vec<String>,
    /// The queen this player backs to win lip syncs.
    pub lip_sync_assassin: Option<String>,
    /// Parallel to the league's bonus categories.
    pub bonus_predictions: Vec<BonusPrediction>,
}

impl Player {
    /// A freshly joined player with every prediction unset, sized to `league`.
    pub fn new(
        league: &League,
        display_name: impl Into<String>,
        user_id: Option<String>,
        role: PlayerRole,
    ) -> Self {
        Player {
            id: Uuid::new_v4(),
            league_id: league.id,
            user_id,
            display_name: display_name.into(),
            role,
            rankings: vec![String::new(); league.queen_count()],
            weekly_picks: Vec::new(),
            lip_sync_assassin: None,
            bonus_predictions: league
                .bonus_categories
                .iter()
                .map(|c| BonusPrediction::unanswered(&c.name))
                .collect(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == PlayerRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::{BonusCategory, BonusKind};
    use crate::model::league::test_support::league_with_queens;

    #[test]
    fn new_player_is_sized_to_league() {
        let mut league = league_with_queens(&["A", "B", "C"]);
        league.bonus_categories.push(BonusCategory::new("Miss Congeniality", 5, BonusKind::Queens));

        let player = Player::new(&league, "Alyssa", Some("u1".into()), PlayerRole::Member);
        assert_eq!(player.league_id, league.id);
        assert_eq!(player.rankings, vec![String::new(); 3]);
        assert!(player.weekly_picks.is_empty());
        assert_eq!(player.bonus_predictions.len(), 1);
        assert_eq!(player.bonus_predictions[0].category, "Miss Congeniality");
        assert!(!player.bonus_predictions[0].is_answered());
    }

    #[test]
    fn role_parses_legacy_empty_status() {
        assert_eq!("".parse::<PlayerRole>().unwrap(), PlayerRole::Member);
        assert_eq!("Admin".parse::<PlayerRole>().unwrap(), PlayerRole::Admin);
        assert!("Owner".parse::<PlayerRole>().is_err());
    }
}
