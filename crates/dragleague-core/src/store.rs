// The record store the core runs against: CRUD over users, leagues and
// players, plus a change feed.
//
// Implementations own persistence; the core only sees snapshots and performs
// read-then-write sequences with no optimistic-concurrency guard.

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{HistoryEntry, League, LeagueStatus, Player, User};

/// Filter for [`RecordStore::list_leagues`]. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeagueFilter {
    pub public: Option<bool>,
    pub status: Option<LeagueStatus>,
}

impl LeagueFilter {
    pub fn with_status(status: LeagueStatus) -> Self {
        LeagueFilter {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Filter for [`RecordStore::list_players`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerFilter {
    pub league_id: Option<Uuid>,
    pub user_id: Option<String>,
}

impl PlayerFilter {
    pub fn in_league(league_id: Uuid) -> Self {
        PlayerFilter {
            league_id: Some(league_id),
            ..Default::default()
        }
    }
}

/// A change published by the store after a successful write.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    UserCreated(User),
    UserDeleted(String),
    LeagueCreated(League),
    LeagueUpdated(League),
    LeagueDeleted(Uuid),
    HistoryAppended { league_id: Uuid, entry: HistoryEntry },
    PlayerCreated(Player),
    PlayerUpdated(Player),
    PlayerDeleted(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

impl StoreEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StoreEvent::UserCreated(_)
            | StoreEvent::LeagueCreated(_)
            | StoreEvent::PlayerCreated(_) => EventKind::Create,
            StoreEvent::LeagueUpdated(_)
            | StoreEvent::HistoryAppended { .. }
            | StoreEvent::PlayerUpdated(_) => EventKind::Update,
            StoreEvent::UserDeleted(_)
            | StoreEvent::LeagueDeleted(_)
            | StoreEvent::PlayerDeleted(_) => EventKind::Delete,
        }
    }
}

/// CRUD + change-feed contract over the three record kinds.
///
/// `update_*` replaces the stored record wholesale (last write wins).
/// `update_league` never touches history; history only grows through
/// [`RecordStore::append_history`].
pub trait RecordStore {
    fn get_user(&self, id: &str) -> Result<User, StoreError>;
    fn create_user(&self, user: &User) -> Result<(), StoreError>;
    fn delete_user(&self, id: &str) -> Result<(), StoreError>;

    fn get_league(&self, id: Uuid) -> Result<League, StoreError>;
    fn list_leagues(&self, filter: &LeagueFilter, limit: Option<usize>) -> Result<Vec<League>, StoreError>;
    fn create_league(&self, league: &League) -> Result<(), StoreError>;
    fn update_league(&self, league: &League) -> Result<(), StoreError>;
    fn delete_league(&self, id: Uuid) -> Result<(), StoreError>;
    fn append_history(&self, league_id: Uuid, entry: &HistoryEntry) -> Result<(), StoreError>;

    fn get_player(&self, id: Uuid) -> Result<Player, StoreError>;
    fn list_players(&self, filter: &PlayerFilter, limit: Option<usize>) -> Result<Vec<Player>, StoreError>;
    fn create_player(&self, player: &Player) -> Result<(), StoreError>;
    fn update_player(&self, player: &Player) -> Result<(), StoreError>;
    fn delete_player(&self, id: Uuid) -> Result<(), StoreError>;

    /// Receive every subsequent write. Slow receivers may lag and miss
    /// events; nothing in the core depends on them.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
