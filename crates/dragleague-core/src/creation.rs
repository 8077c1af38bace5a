// League creation and joining.
//
// A `LeagueDraft` is what the creator fills in. It is sanitized (pipes
// stripped) and validated as a whole before anything reaches the store, so
// the caller sees every bad field at once.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::bonus::{BonusCategory, BonusKind};
use crate::config::ScoringDefaults;
use crate::error::{LeagueError, ValidationErrors};
use crate::model::codec::sanitize;
use crate::model::{HistoryEntry, League, LeagueStatus, PlacementPoints, Player, PlayerRole};
use crate::store::RecordStore;

/// Fewest queens a league can be created with.
pub const MIN_QUEENS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BonusCategoryDraft {
    pub name: String,
    pub points: u32,
    pub kind: BonusKind,
}

/// User-entered fields for a new league. Point values left out fall back to
/// the configured defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeagueDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub creator_display_name: String,
    #[serde(default)]
    pub creator_user_id: Option<String>,
    #[serde(default)]
    pub public: bool,
    pub queen_count: usize,
    pub queen_names: Vec<String>,
    #[serde(default)]
    pub placement_points: Option<PlacementPoints>,
    #[serde(default)]
    pub challenge_points: Option<u32>,
    #[serde(default)]
    pub lip_sync_points: Option<u32>,
    #[serde(default)]
    pub bonus_enabled: bool,
    #[serde(default)]
    pub bonus_categories: Vec<BonusCategoryDraft>,
    pub ranking_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub weekly_deadline: Option<DateTime<Utc>>,
}

fn clean(text: &str) -> String {
    sanitize(text).trim().to_string()
}

impl LeagueDraft {
    /// Strip the stored-field separator from every free-text field.
    pub fn sanitize(&mut self) {
        self.name = clean(&self.name);
        self.description = clean(&self.description);
        self.creator_display_name = clean(&self.creator_display_name);
        for queen in &mut self.queen_names {
            *queen = clean(queen);
        }
        for category in &mut self.bonus_categories {
            category.name = clean(&category.name);
        }
    }

    /// Every field that would make this draft an invalid league.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.name.trim().is_empty() {
            errors.push("name", "is required");
        }
        if self.creator_display_name.trim().is_empty() {
            errors.push("creator_display_name", "is required");
        }

        if self.queen_count < MIN_QUEENS {
            errors.push("queen_count", format!("must be at least {MIN_QUEENS}"));
        } else if self.queen_count != self.queen_names.len() {
            errors.push(
                "queen_count",
                format!(
                    "is {} but {} queen names were given",
                    self.queen_count,
                    self.queen_names.len()
                ),
            );
        }

        if self.queen_names.iter().any(|q| q.trim().is_empty()) {
            errors.push("queen_names", "must not contain blank names");
        }
        let mut seen: Vec<&str> = Vec::new();
        for queen in self.queen_names.iter().map(|q| q.trim()).filter(|q| !q.is_empty()) {
            if seen.contains(&queen) {
                errors.push("queen_names", format!("`{queen}` appears more than once"));
            } else {
                seen.push(queen);
            }
        }

        if self.ranking_deadline.is_none() {
            errors.push("ranking_deadline", "is required");
        }
        if let (Some(ranking), Some(weekly)) = (self.ranking_deadline, self.weekly_deadline) {
            if ranking >= weekly {
                errors.push("weekly_deadline", "must be after the ranking deadline");
            }
        }

        if self.bonus_enabled && self.bonus_categories.is_empty() {
            errors.push("bonus_categories", "at least one category is required when bonus is enabled");
        }
        for (i, category) in self.bonus_categories.iter().enumerate() {
            if category.name.trim().is_empty() {
                errors.push(format!("bonus_categories[{i}].name"), "is required");
            }
            if category.points == 0 {
                errors.push(format!("bonus_categories[{i}].points"), "must be greater than 0");
            }
        }

        errors.into_result()
    }

    /// Sanitize, validate, and build the league plus its creator's admin
    /// player.
    pub fn into_league(
        mut self,
        id: Uuid,
        defaults: &ScoringDefaults,
    ) -> Result<(League, Player), ValidationErrors> {
        self.sanitize();
        self.validate()?;

        let bonus_categories = if self.bonus_enabled {
            self.bonus_categories
                .into_iter()
                .map(|c| BonusCategory::new(c.name, c.points, c.kind))
                .collect()
        } else {
            Vec::new()
        };

        let league = League {
            id,
            name: self.name,
            description: self.description,
            admins: self.creator_user_id.iter().cloned().collect(),
            public: self.public,
            queen_names: self.queen_names,
            placement_points: self
                .placement_points
                .unwrap_or(PlacementPoints::Flat(defaults.placement_points)),
            challenge_points: self.challenge_points.unwrap_or(defaults.challenge_points),
            lip_sync_points: self.lip_sync_points.unwrap_or(defaults.lip_sync_points),
            bonus_categories,
            eliminated: Vec::new(),
            challenge_winners: Vec::new(),
            lip_sync_winners: Vec::new(),
            // validate() guarantees the deadline is present.
            ranking_deadline: self.ranking_deadline.unwrap_or_default(),
            weekly_deadline: self.weekly_deadline,
            status: LeagueStatus::NotStarted,
            history: Vec::new(),
        };

        let admin = Player::new(
            &league,
            self.creator_display_name,
            self.creator_user_id,
            PlayerRole::Admin,
        );
        Ok((league, admin))
    }
}

/// A new member for `league`. Joining closes once the league has started.
pub fn new_player(
    league: &League,
    display_name: &str,
    user_id: Option<String>,
) -> Result<Player, LeagueError> {
    if league.status != LeagueStatus::NotStarted {
        return Err(LeagueError::InvalidState {
            status: league.status,
            action: "join",
        });
    }
    let display_name = clean(display_name);
    if display_name.is_empty() {
        let mut errors = ValidationErrors::default();
        errors.push("display_name", "is required");
        return Err(errors.into());
    }
    Ok(Player::new(league, display_name, user_id, PlayerRole::Member))
}

/// Validate `draft`, then store the league (with its creation history line)
/// and the creator's admin player.
pub fn create_league<S: RecordStore + ?Sized>(
    store: &S,
    draft: LeagueDraft,
    defaults: &ScoringDefaults,
    now: DateTime<Utc>,
) -> Result<(League, Player), LeagueError> {
    let (mut league, admin) = draft.into_league(Uuid::new_v4(), defaults)?;
    league.push_history(HistoryEntry::new(
        now,
        admin.display_name.clone(),
        format!("League created with {} queens", league.queen_count()),
    ));

    store.create_league(&league)?;
    store.create_player(&admin)?;

    info!("created league {} ({})", league.id, league.name);
    Ok((league, admin))
}

/// Add a member to a stored league.
pub fn join_league<S: RecordStore + ?Sized>(
    store: &S,
    league_id: Uuid,
    display_name: &str,
    user_id: Option<String>,
) -> Result<Player, LeagueError> {
    let league = store.get_league(league_id)?;
    let player = new_player(&league, display_name, user_id)?;
    store.create_player(&player)?;
    info!("{} joined league {}", player.display_name, league.id);
    Ok(player)
}
