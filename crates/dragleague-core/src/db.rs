// SQLite-backed record store.
//
// Column names follow the League/Player field contract (lgName,
// lgEliminatedPlayers, plRankings, ...). Array fields are JSON arrays of the
// pipe-delimited wire strings produced by `model::codec`.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::bonus::BonusPrediction;
use crate::error::StoreError;
use crate::model::codec;
use crate::model::{HistoryEntry, League, Player, TieGroup, User};
use crate::store::{LeagueFilter, PlayerFilter, RecordStore, StoreEvent};

/// Capacity of the change-feed channel before slow subscribers start lagging.
const EVENT_CAPACITY: usize = 256;

const LEAGUE_COLUMNS: &str = "id, lgName, lgDescription, lgAdmin, lgPublic, lgQueenNames,
    lgPlacementPoints, lgChallengePoints, lgLipSyncPoints, lgBonusPoints,
    lgEliminatedPlayers, lgChallengeWinners, lgLipSyncWinners,
    lgRankingDeadline, lgDeadline, lgFinished";

const PLAYER_COLUMNS: &str =
    "id, leagueId, userId, plName, plStatus, plLipSyncAssassin, plRankings, plWinners, plBonuses";

/// SQLite persistence for users, leagues (with their history) and players.
pub struct Database {
    conn: Mutex<Connection>,
    events: broadcast::Sender<StoreEvent>,
}

impl Database {
    /// Open the league database at `path`, creating the schema on first use.
    /// `":memory:"` gives a private database that disappears on drop.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id       TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                email    TEXT
            );

            CREATE TABLE IF NOT EXISTS leagues (
                id                  TEXT PRIMARY KEY,
                lgName              TEXT NOT NULL,
                lgDescription       TEXT NOT NULL DEFAULT '',
                lgAdmin             TEXT NOT NULL DEFAULT '[]',
                lgPublic            INTEGER NOT NULL DEFAULT 0,
                lgQueenNames        TEXT NOT NULL,
                lgPlacementPoints   TEXT NOT NULL,
                lgChallengePoints   INTEGER NOT NULL,
                lgLipSyncPoints     INTEGER NOT NULL,
                lgBonusPoints       TEXT NOT NULL DEFAULT '[]',
                lgEliminatedPlayers TEXT NOT NULL DEFAULT '[]',
                lgChallengeWinners  TEXT NOT NULL DEFAULT '[]',
                lgLipSyncWinners    TEXT NOT NULL DEFAULT '[]',
                lgRankingDeadline   TEXT NOT NULL,
                lgDeadline          TEXT,
                lgFinished          TEXT NOT NULL DEFAULT 'not started'
            );

            CREATE TABLE IF NOT EXISTS league_history (
                seq       INTEGER PRIMARY KEY AUTOINCREMENT,
                league_id TEXT NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                timestamp TEXT NOT NULL,
                actor     TEXT NOT NULL,
                text      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS players (
                id                TEXT PRIMARY KEY,
                leagueId          TEXT NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                userId            TEXT,
                plName            TEXT NOT NULL,
                plStatus          TEXT NOT NULL,
                plLipSyncAssassin TEXT,
                plRankings        TEXT NOT NULL DEFAULT '[]',
                plWinners         TEXT NOT NULL DEFAULT '[]',
                plBonuses         TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_players_league ON players(leagueId);
            CREATE INDEX IF NOT EXISTS idx_history_league ON league_history(league_id, seq);
            ",
        )?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            conn: Mutex::new(conn),
            events,
        })
    }

    /// Every store call runs under this lock; a poisoned lock is a bug.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn load_history(conn: &Connection, league_id: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT timestamp, actor, text FROM league_history
             WHERE league_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt
            .query_map(params![league_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(ts, actor, text)| Ok(HistoryEntry::new(parse_timestamp(&ts)?, actor, text)))
            .collect()
    }

    fn league_exists(conn: &Connection, id: &str) -> Result<bool, StoreError> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM leagues WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl RecordStore for Database {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    fn get_user(&self, id: &str) -> Result<User, StoreError> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, email FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| not_found("user", id))
    }

    fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (id, username, email) VALUES (?1, ?2, ?3)",
            params![user.id, user.username, user.email],
        )?;
        drop(conn);
        self.publish(StoreEvent::UserCreated(user.clone()));
        Ok(())
    }

    fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn();
        let n = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        drop(conn);
        if n == 0 {
            return Err(not_found("user", id));
        }
        self.publish(StoreEvent::UserDeleted(id.to_string()));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Leagues
    // ------------------------------------------------------------------

    fn get_league(&self, id: Uuid) -> Result<League, StoreError> {
        let conn = self.conn();
        let id_str = id.to_string();
        let row = conn
            .query_row(
                &format!("SELECT {LEAGUE_COLUMNS} FROM leagues WHERE id = ?1"),
                params![id_str],
                LeagueRow::from_row,
            )
            .optional()?
            .ok_or_else(|| not_found("league", &id_str))?;
        let history = Self::load_history(&conn, &id_str)?;
        row.into_league(history)
    }

    fn list_leagues(&self, filter: &LeagueFilter, limit: Option<usize>) -> Result<Vec<League>, StoreError> {
        let mut sql = format!("SELECT {LEAGUE_COLUMNS} FROM leagues WHERE 1=1");
        let mut args: Vec<Value> = Vec::new();

        if let Some(public) = filter.public {
            sql.push_str(" AND lgPublic = ?");
            args.push(Value::Integer(public as i64));
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND lgFinished = ?");
            args.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY rowid LIMIT ?");
        args.push(Value::Integer(sql_limit(limit)));

        let conn = self.conn();
        let rows = {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(args), LeagueRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter()
            .map(|row| {
                let history = Self::load_history(&conn, &row.id)?;
                row.into_league(history)
            })
            .collect()
    }

    fn create_league(&self, league: &League) -> Result<(), StoreError> {
        let fields = LeagueFields::encode(league)?;
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO leagues ({LEAGUE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            params![
                league.id.to_string(),
                league.name,
                league.description,
                fields.admins,
                league.public,
                fields.queen_names,
                fields.placement_points,
                league.challenge_points,
                league.lip_sync_points,
                fields.bonus,
                fields.eliminated,
                fields.challenge_winners,
                fields.lip_sync_winners,
                format_timestamp(&league.ranking_deadline),
                league.weekly_deadline.as_ref().map(format_timestamp),
                league.status.as_str(),
            ],
        )?;
        for entry in &league.history {
            insert_history(&tx, &league.id.to_string(), entry)?;
        }
        tx.commit()?;
        drop(conn);

        debug!("created league {} ({})", league.id, league.name);
        self.publish(StoreEvent::LeagueCreated(league.clone()));
        Ok(())
    }

    fn update_league(&self, league: &League) -> Result<(), StoreError> {
        let fields = LeagueFields::encode(league)?;
        let conn = self.conn();
        let n = conn.execute(
            "UPDATE leagues SET
                lgName = ?2, lgDescription = ?3, lgAdmin = ?4, lgPublic = ?5,
                lgQueenNames = ?6, lgPlacementPoints = ?7, lgChallengePoints = ?8,
                lgLipSyncPoints = ?9, lgBonusPoints = ?10, lgEliminatedPlayers = ?11,
                lgChallengeWinners = ?12, lgLipSyncWinners = ?13,
                lgRankingDeadline = ?14, lgDeadline = ?15, lgFinished = ?16
             WHERE id = ?1",
            params![
                league.id.to_string(),
                league.name,
                league.description,
                fields.admins,
                league.public,
                fields.queen_names,
                fields.placement_points,
                league.challenge_points,
                league.lip_sync_points,
                fields.bonus,
                fields.eliminated,
                fields.challenge_winners,
                fields.lip_sync_winners,
                format_timestamp(&league.ranking_deadline),
                league.weekly_deadline.as_ref().map(format_timestamp),
                league.status.as_str(),
            ],
        )?;
        drop(conn);
        if n == 0 {
            return Err(not_found("league", &league.id.to_string()));
        }
        self.publish(StoreEvent::LeagueUpdated(league.clone()));
        Ok(())
    }

    fn delete_league(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.conn();
        let n = conn.execute("DELETE FROM leagues WHERE id = ?1", params![id.to_string()])?;
        drop(conn);
        if n == 0 {
            return Err(not_found("league", &id.to_string()));
        }
        self.publish(StoreEvent::LeagueDeleted(id));
        Ok(())
    }

    fn append_history(&self, league_id: Uuid, entry: &HistoryEntry) -> Result<(), StoreError> {
        let id_str = league_id.to_string();
        let conn = self.conn();
        if !Self::league_exists(&conn, &id_str)? {
            return Err(not_found("league", &id_str));
        }
        insert_history(&conn, &id_str, entry)?;
        drop(conn);
        self.publish(StoreEvent::HistoryAppended {
            league_id,
            entry: entry.clone(),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    fn get_player(&self, id: Uuid) -> Result<Player, StoreError> {
        let conn = self.conn();
        let id_str = id.to_string();
        let row = conn
            .query_row(
                &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1"),
                params![id_str],
                PlayerRow::from_row,
            )
            .optional()?
            .ok_or_else(|| not_found("player", &id_str))?;
        row.into_player()
    }

    fn list_players(&self, filter: &PlayerFilter, limit: Option<usize>) -> Result<Vec<Player>, StoreError> {
        let mut sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE 1=1");
        let mut args: Vec<Value> = Vec::new();

        if let Some(league_id) = filter.league_id {
            sql.push_str(" AND leagueId = ?");
            args.push(Value::Text(league_id.to_string()));
        }
        if let Some(user_id) = &filter.user_id {
            sql.push_str(" AND userId = ?");
            args.push(Value::Text(user_id.clone()));
        }
        sql.push_str(" ORDER BY rowid LIMIT ?");
        args.push(Value::Integer(sql_limit(limit)));

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), PlayerRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(PlayerRow::into_player).collect()
    }

    fn create_player(&self, player: &Player) -> Result<(), StoreError> {
        let fields = PlayerFields::encode(player)?;
        let conn = self.conn();
        let league_id = player.league_id.to_string();
        if !Self::league_exists(&conn, &league_id)? {
            return Err(not_found("league", &league_id));
        }
        conn.execute(
            &format!(
                "INSERT INTO players ({PLAYER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                player.id.to_string(),
                league_id,
                player.user_id,
                player.display_name,
                player.role.as_str(),
                player.lip_sync_assassin,
                fields.rankings,
                fields.weekly_picks,
                fields.bonus,
            ],
        )?;
        drop(conn);
        self.publish(StoreEvent::PlayerCreated(player.clone()));
        Ok(())
    }

    fn update_player(&self, player: &Player) -> Result<(), StoreError> {
        let fields = PlayerFields::encode(player)?;
        let conn = self.conn();
        let n = conn.execute(
            "UPDATE players SET
                leagueId = ?2, userId = ?3, plName = ?4, plStatus = ?5,
                plLipSyncAssassin = ?6, plRankings = ?7, plWinners = ?8, plBonuses = ?9
             WHERE id = ?1",
            params![
                player.id.to_string(),
                player.league_id.to_string(),
                player.user_id,
                player.display_name,
                player.role.as_str(),
                player.lip_sync_assassin,
                fields.rankings,
                fields.weekly_picks,
                fields.bonus,
            ],
        )?;
        drop(conn);
        if n == 0 {
            return Err(not_found("player", &player.id.to_string()));
        }
        self.publish(StoreEvent::PlayerUpdated(player.clone()));
        Ok(())
    }

    fn delete_player(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.conn();
        let n = conn.execute("DELETE FROM players WHERE id = ?1", params![id.to_string()])?;
        drop(conn);
        if n == 0 {
            return Err(not_found("player", &id.to_string()));
        }
        self.publish(StoreEvent::PlayerDeleted(id));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Raw league columns as stored, before decoding.
struct LeagueRow {
    id: String,
    name: String,
    description: String,
    admins: String,
    public: bool,
    queen_names: String,
    placement_points: String,
    challenge_points: u32,
    lip_sync_points: u32,
    bonus: String,
    eliminated: String,
    challenge_winners: String,
    lip_sync_winners: String,
    ranking_deadline: String,
    weekly_deadline: Option<String>,
    status: String,
}

impl LeagueRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(LeagueRow {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            admins: row.get(3)?,
            public: row.get(4)?,
            queen_names: row.get(5)?,
            placement_points: row.get(6)?,
            challenge_points: row.get(7)?,
            lip_sync_points: row.get(8)?,
            bonus: row.get(9)?,
            eliminated: row.get(10)?,
            challenge_winners: row.get(11)?,
            lip_sync_winners: row.get(12)?,
            ranking_deadline: row.get(13)?,
            weekly_deadline: row.get(14)?,
            status: row.get(15)?,
        })
    }

    fn into_league(self, history: Vec<HistoryEntry>) -> Result<League, StoreError> {
        let bonus_raw: Vec<String> = serde_json::from_str(&self.bonus)?;
        let bonus_categories = bonus_raw
            .iter()
            .map(|raw| codec::decode_bonus_category(raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(League {
            id: parse_uuid(&self.id)?,
            name: self.name,
            description: self.description,
            admins: serde_json::from_str(&self.admins)?,
            public: self.public,
            queen_names: serde_json::from_str(&self.queen_names)?,
            placement_points: serde_json::from_str(&self.placement_points)?,
            challenge_points: self.challenge_points,
            lip_sync_points: self.lip_sync_points,
            bonus_categories,
            eliminated: decode_groups(&self.eliminated)?,
            challenge_winners: decode_groups(&self.challenge_winners)?,
            lip_sync_winners: decode_groups(&self.lip_sync_winners)?,
            ranking_deadline: parse_timestamp(&self.ranking_deadline)?,
            weekly_deadline: self
                .weekly_deadline
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            status: self.status.parse()?,
            history,
        })
    }
}

/// League array fields encoded for storage.
struct LeagueFields {
    admins: String,
    queen_names: String,
    placement_points: String,
    bonus: String,
    eliminated: String,
    challenge_winners: String,
    lip_sync_winners: String,
}

impl LeagueFields {
    fn encode(league: &League) -> Result<Self, StoreError> {
        let bonus: Vec<String> = league
            .bonus_categories
            .iter()
            .map(codec::encode_bonus_category)
            .collect();
        Ok(LeagueFields {
            admins: serde_json::to_string(&league.admins)?,
            queen_names: serde_json::to_string(&league.queen_names)?,
            placement_points: serde_json::to_string(&league.placement_points)?,
            bonus: serde_json::to_string(&bonus)?,
            eliminated: encode_groups(&league.eliminated)?,
            challenge_winners: encode_groups(&league.challenge_winners)?,
            lip_sync_winners: encode_groups(&league.lip_sync_winners)?,
        })
    }
}

struct PlayerRow {
    id: String,
    league_id: String,
    user_id: Option<String>,
    display_name: String,
    role: String,
    lip_sync_assassin: Option<String>,
    rankings: String,
    weekly_picks: String,
    bonus: String,
}

impl PlayerRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PlayerRow {
            id: row.get(0)?,
            league_id: row.get(1)?,
            user_id: row.get(2)?,
            display_name: row.get(3)?,
            role: row.get(4)?,
            lip_sync_assassin: row.get(5)?,
            rankings: row.get(6)?,
            weekly_picks: row.get(7)?,
            bonus: row.get(8)?,
        })
    }

    fn into_player(self) -> Result<Player, StoreError> {
        let bonus_raw: Vec<String> = serde_json::from_str(&self.bonus)?;
        Ok(Player {
            id: parse_uuid(&self.id)?,
            league_id: parse_uuid(&self.league_id)?,
            user_id: self.user_id,
            display_name: self.display_name,
            role: self.role.parse()?,
            rankings: serde_json::from_str(&self.rankings)?,
            weekly_picks: serde_json::from_str(&self.weekly_picks)?,
            lip_sync_assassin: self.lip_sync_assassin.filter(|s| !s.is_empty()),
            bonus_predictions: bonus_raw
                .iter()
                .map(|raw| codec::decode_bonus_prediction(raw))
                .collect(),
        })
    }
}

struct PlayerFields {
    rankings: String,
    weekly_picks: String,
    bonus: String,
}

impl PlayerFields {
    fn encode(player: &Player) -> Result<Self, StoreError> {
        let bonus: Vec<String> = player
            .bonus_predictions
            .iter()
            .map(|p: &BonusPrediction| codec::encode_bonus_prediction(p))
            .collect();
        Ok(PlayerFields {
            rankings: serde_json::to_string(&player.rankings)?,
            weekly_picks: serde_json::to_string(&player.weekly_picks)?,
            bonus: serde_json::to_string(&bonus)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_history(conn: &Connection, league_id: &str, entry: &HistoryEntry) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO league_history (league_id, timestamp, actor, text) VALUES (?1, ?2, ?3, ?4)",
        params![league_id, format_timestamp(&entry.timestamp), entry.actor, entry.text],
    )?;
    Ok(())
}

fn encode_groups(groups: &[TieGroup]) -> Result<String, StoreError> {
    let raw: Vec<String> = groups.iter().map(codec::encode_tie_group).collect();
    Ok(serde_json::to_string(&raw)?)
}

fn decode_groups(json: &str) -> Result<Vec<TieGroup>, StoreError> {
    let raw: Vec<String> = serde_json::from_str(json)?;
    Ok(raw.iter().map(|r| codec::decode_tie_group(r)).collect())
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| StoreError::Timestamp {
            value: value.to_string(),
            source,
        })
}

fn parse_uuid(value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|_| StoreError::InvalidId {
        value: value.to_string(),
    })
}

/// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l as i64).unwrap_or(-1)
}

fn not_found(kind: &'static str, id: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}
