//! Reward propagation engine
//!
//! After the tree grows, the chain of referrers is walked upward from the
//! account that gained a child, all the way to the root:
//!
//! ```text
//!            admin            ◀── evaluated last
//!              │
//!            top              ◀── may unlock Milestone 2 (grandchildren)
//!              │
//!          referrer           ◀── may unlock Milestone 1 (direct referrals)
//!              │
//!          new member
//! ```
//!
//! | Milestone | Condition | Reward |
//! |-----------|-----------|--------|
//! | 1 team-build | direct referrals ≥ 3 | +1000 |
//! | 2 network-expand | Milestone 1 done, grandchildren ≥ 9 | +2000 |
//!
//! Each milestone triggers at most once per account. Milestone 2 is checked
//! after Milestone 1 in the same pass, so both can unlock in one step. The
//! walk never stops early: several ancestors can cross their own thresholds
//! in the same event.

pub mod wallet;

use crate::ledger::{LedgerError, LedgerResult};
use crate::network::ReferralNetwork;
use serde::{Deserialize, Serialize};
use shared::models::{Account, TaskProgress, TaskStatus};
use std::collections::HashSet;

/// Milestone thresholds and reward amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPolicy {
    /// Direct referrals needed for Milestone 1
    pub team_build_threshold: usize,
    pub team_build_reward: u64,
    /// Grandchildren needed for Milestone 2
    pub network_expand_threshold: usize,
    pub network_expand_reward: u64,
    /// Points credited when a bonus code request is approved
    pub bonus_code_reward: u64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            team_build_threshold: 3,
            team_build_reward: 1000,
            network_expand_threshold: 9,
            network_expand_reward: 2000,
            bonus_code_reward: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    TeamBuild,
    NetworkExpand,
}

/// One milestone unlocked during a walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneAward {
    pub account_id: String,
    pub milestone: Milestone,
    pub points: u64,
}

/// Walk from `start_id` up to the root, awarding every milestone newly reached
///
/// Re-running on accounts whose milestones are already complete changes
/// nothing. A referrer id that names no account, or a chain that loops back
/// on itself, is reported as an integrity violation.
pub fn propagate(
    network: &mut ReferralNetwork,
    start_id: &str,
    policy: &RewardPolicy,
) -> LedgerResult<Vec<MilestoneAward>> {
    let mut awards = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(start_id.to_string());

    while let Some(account_id) = current {
        if !visited.insert(account_id.clone()) {
            return Err(LedgerError::Integrity(format!(
                "referrer chain loops through account {}",
                account_id
            )));
        }

        let account = network.get(&account_id).ok_or_else(|| {
            LedgerError::Integrity(format!(
                "account {} in referrer chain does not exist",
                account_id
            ))
        })?;

        let unlock_team = !account.task1_completed
            && network.direct_referral_count(&account_id) >= policy.team_build_threshold;
        let unlock_network = (account.task1_completed || unlock_team)
            && !account.task2_completed
            && network.grandchild_count(&account_id) >= policy.network_expand_threshold;
        current = account.referrer_id.clone();

        if !unlock_team && !unlock_network {
            continue;
        }

        let Some(account) = network.get_mut(&account_id) else {
            continue;
        };
        if unlock_team {
            award(account, Milestone::TeamBuild, policy, &mut awards);
        }
        if unlock_network {
            award(account, Milestone::NetworkExpand, policy, &mut awards);
        }
    }

    Ok(awards)
}

fn award(
    account: &mut Account,
    milestone: Milestone,
    policy: &RewardPolicy,
    awards: &mut Vec<MilestoneAward>,
) {
    let points = match milestone {
        Milestone::TeamBuild => {
            account.task1_completed = true;
            policy.team_build_reward
        }
        Milestone::NetworkExpand => {
            account.task2_completed = true;
            policy.network_expand_reward
        }
    };
    account.points = account.points.saturating_add(points);

    tracing::info!(
        account_id = %account.id,
        username = %account.username,
        milestone = ?milestone,
        points,
        balance = account.points,
        "Milestone reward credited"
    );

    awards.push(MilestoneAward {
        account_id: account.id.clone(),
        milestone,
        points,
    });
}

/// Dashboard view of both milestones for one account
pub fn task_progress(
    network: &ReferralNetwork,
    account: &Account,
    policy: &RewardPolicy,
) -> Vec<TaskProgress> {
    let team = TaskProgress {
        title: "Task 1: Build Your Team".to_string(),
        description: format!(
            "Recruit {} new members under your referral.",
            policy.team_build_threshold
        ),
        reward_points: policy.team_build_reward,
        progress: account.referrals.len() as u64,
        total: policy.team_build_threshold as u64,
        status: if account.task1_completed {
            TaskStatus::Completed
        } else {
            TaskStatus::InProgress
        },
    };

    let (status, progress) = match (account.task1_completed, account.task2_completed) {
        (false, _) => (TaskStatus::Locked, 0),
        (true, true) => (
            TaskStatus::Completed,
            network.grandchild_count(&account.id) as u64,
        ),
        (true, false) => (
            TaskStatus::InProgress,
            network.grandchild_count(&account.id) as u64,
        ),
    };
    let expand = TaskProgress {
        title: "Task 2: Expand the Network".to_string(),
        description: "Help your referred members each bring in new people.".to_string(),
        reward_points: policy.network_expand_reward,
        progress,
        total: policy.network_expand_threshold as u64,
        status,
    };

    vec![team, expand]
}
