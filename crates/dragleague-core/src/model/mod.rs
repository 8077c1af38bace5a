// Plain data records shared by every part of the core.

pub mod codec;
pub mod history;
pub mod league;
pub mod player;
pub mod tie_group;
pub mod user;

pub use history::HistoryEntry;
pub use league::{League, LeagueStatus, PlacementPoints};
pub use player::{Player, PlayerRole};
pub use tie_group::TieGroup;
pub use user::User;
