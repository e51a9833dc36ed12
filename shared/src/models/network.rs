//! Network reporting models
//!
//! Read-only views derived from the account collection: the nested referral
//! tree, milestone progress and dashboard aggregates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountResponse, CodeRequest, ReferralCode};

/// Nested referral tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    pub username: String,
    pub name: String,
    pub points: u64,
    pub task1_completed: bool,
    pub task2_completed: bool,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of accounts below this node
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }

    /// Depth of the subtree (a leaf has depth 0)
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.depth())
            .max()
            .unwrap_or(0)
    }
}

/// Milestone task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Locked,
    InProgress,
    Completed,
}

/// Progress towards one milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub title: String,
    pub description: String,
    pub reward_points: u64,
    pub progress: u64,
    pub total: u64,
    pub status: TaskStatus,
}

/// Points converted to their cash value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub points: u64,
    pub cash_value: Decimal,
    pub minimum_withdrawal: Decimal,
    /// Points balance at which `can_withdraw` turns true
    pub minimum_withdrawal_points: u64,
    pub can_withdraw: bool,
}

/// Everything a member dashboard shows about one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberOverview {
    pub account: AccountResponse,
    pub available_codes: Vec<ReferralCode>,
    pub pending_request: Option<CodeRequest>,
    /// No pending request and no bonus code granted before
    pub can_request_code: bool,
    pub tasks: Vec<TaskProgress>,
    pub wallet: WalletSummary,
}

/// Admin dashboard aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_members: u64,
    pub available_codes: u64,
    pub pending_requests: u64,
    pub total_member_logins: u64,
}
