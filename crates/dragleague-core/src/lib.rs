// Library root: league scoring, lifecycle, and audit logic for the fantasy
// league, plus the record store it runs against.

pub mod audit;
pub mod bonus;
pub mod config;
pub mod creation;
pub mod db;
pub mod editing;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod ranking;
pub mod results;
pub mod standings;
pub mod store;
