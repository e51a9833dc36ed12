//! Code Request Model

use serde::{Deserialize, Serialize};

/// Code request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// An account's request for a one-time bonus referral code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRequest {
    pub id: String,
    pub requester_id: String,
    pub status: RequestStatus,
    pub created_at: i64,
}

impl CodeRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}
