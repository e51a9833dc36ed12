//! Referral Code Model

use serde::{Deserialize, Serialize};

/// Single-use referral code gating a registration
///
/// `used_by` is set if and only if `is_used`; a used code never changes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralCode {
    pub code: String,
    pub owner_id: String,
    pub is_used: bool,
    pub used_by: Option<String>,
    pub created_at: i64,
}

impl ReferralCode {
    pub fn new(code: String, owner_id: String, created_at: i64) -> Self {
        Self {
            code,
            owner_id,
            is_used: false,
            used_by: None,
            created_at,
        }
    }

    /// Storage key: codes are looked up case-insensitively
    pub fn lookup_key(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn is_available(&self) -> bool {
        !self.is_used
    }
}
