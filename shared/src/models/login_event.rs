//! Login Event Model

use serde::{Deserialize, Serialize};

/// Append-only record of a member login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEvent {
    pub id: String,
    pub timestamp: i64,
    pub user_id: String,
    pub username: String,
    pub name: String,
}
