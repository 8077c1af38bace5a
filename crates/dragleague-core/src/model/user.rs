// User accounts; a user takes part in leagues through Player records.

use serde::{Deserialize, Serialize};

/// An account that can join leagues. A user in N leagues has N Player records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
}
