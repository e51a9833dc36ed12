//! Tree invariant checks

use super::ReferralNetwork;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// A violated referral tree invariant
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityViolation {
    #[error("no admin account exists")]
    MissingAdmin,

    #[error("more than one admin account: {ids:?}")]
    MultipleAdmins { ids: Vec<String> },

    #[error("admin {account_id} has a referrer")]
    AdminHasReferrer { account_id: String },

    #[error("member {account_id} has no referrer")]
    MemberWithoutReferrer { account_id: String },

    #[error("referrer {referrer_id} of {account_id} does not exist")]
    MissingReferrer {
        account_id: String,
        referrer_id: String,
    },

    #[error("{account_id} is not listed in the referrals of {referrer_id}")]
    NotListedByReferrer {
        account_id: String,
        referrer_id: String,
    },

    #[error("{parent_id} lists {child_id}, whose referrer is different")]
    ForeignChild { parent_id: String, child_id: String },

    #[error("{parent_id} lists {child_id} more than once")]
    DuplicateChild { parent_id: String, child_id: String },

    #[error("{account_id} is not reachable from the admin")]
    Unreachable { account_id: String },

    #[error("referral code {code}: used_by does not match is_used")]
    CodeUsageMismatch { code: String },

    #[error("referral code {code} is owned by missing account {owner_id}")]
    CodeOwnerMissing { code: String, owner_id: String },
}

impl ReferralNetwork {
    /// Check the account-side invariants of the tree
    ///
    /// Dangling child ids are tolerated here, matching how the tree is read.
    pub fn check_invariants(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();

        let mut admins: Vec<String> = self
            .accounts()
            .filter(|account| account.is_admin())
            .map(|account| account.id.clone())
            .collect();
        admins.sort();
        match admins.len() {
            0 => violations.push(IntegrityViolation::MissingAdmin),
            1 => {}
            _ => violations.push(IntegrityViolation::MultipleAdmins {
                ids: admins.clone(),
            }),
        }

        let mut accounts: Vec<_> = self.accounts().collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));

        for account in &accounts {
            match (&account.referrer_id, account.is_admin()) {
                (Some(_), true) => violations.push(IntegrityViolation::AdminHasReferrer {
                    account_id: account.id.clone(),
                }),
                (None, false) => violations.push(IntegrityViolation::MemberWithoutReferrer {
                    account_id: account.id.clone(),
                }),
                (Some(referrer_id), false) => match self.get(referrer_id) {
                    None => violations.push(IntegrityViolation::MissingReferrer {
                        account_id: account.id.clone(),
                        referrer_id: referrer_id.clone(),
                    }),
                    Some(referrer) if !referrer.referrals.contains(&account.id) => {
                        violations.push(IntegrityViolation::NotListedByReferrer {
                            account_id: account.id.clone(),
                            referrer_id: referrer_id.clone(),
                        })
                    }
                    Some(_) => {}
                },
                (None, true) => {}
            }

            let mut seen = HashSet::new();
            for child_id in &account.referrals {
                if !seen.insert(child_id.as_str()) {
                    violations.push(IntegrityViolation::DuplicateChild {
                        parent_id: account.id.clone(),
                        child_id: child_id.clone(),
                    });
                    continue;
                }
                if let Some(child) = self.get(child_id)
                    && child.referrer_id.as_deref() != Some(account.id.as_str())
                {
                    violations.push(IntegrityViolation::ForeignChild {
                        parent_id: account.id.clone(),
                        child_id: child_id.clone(),
                    });
                }
            }
        }

        // Reachability from the admin also rules out cycles among members
        if let [admin_id] = admins.as_slice() {
            let mut reachable = HashSet::new();
            let mut stack = vec![admin_id.as_str()];
            while let Some(id) = stack.pop() {
                if !reachable.insert(id) {
                    continue;
                }
                for child in self.children(id) {
                    stack.push(child.id.as_str());
                }
            }
            for account in &accounts {
                if !reachable.contains(account.id.as_str()) {
                    violations.push(IntegrityViolation::Unreachable {
                        account_id: account.id.clone(),
                    });
                }
            }
        }

        violations
    }
}
