//! Referral tree model
//!
//! [`ReferralNetwork`] is an in-memory working copy of the account
//! collection. Workflows load it inside their write transaction, mutate it
//! freely, and write back only the accounts they touched:
//!
//! ```text
//! load (txn) ──▶ ReferralNetwork ──mutate──▶ into_changes() ──▶ put/remove (txn) ──▶ commit
//! ```
//!
//! Navigation follows `referrer_id` upward and `referrals` downward. Child
//! ids that name no account are skipped silently.

mod integrity;
mod tree;

pub use integrity::IntegrityViolation;

use shared::models::Account;
use std::collections::{HashMap, HashSet};

/// Accounts written or deleted by a workflow
#[derive(Debug, Default)]
pub struct NetworkChanges {
    pub updated: Vec<Account>,
    pub removed: Vec<String>,
}

impl NetworkChanges {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Mutable working copy of the referral tree
#[derive(Debug, Default, Clone)]
pub struct ReferralNetwork {
    accounts: HashMap<String, Account>,
    dirty: HashSet<String>,
    removed: HashSet<String>,
}

impl ReferralNetwork {
    pub fn from_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|account| (account.id.clone(), account))
                .collect(),
            dirty: HashSet::new(),
            removed: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn get(&self, account_id: &str) -> Option<&Account> {
        self.accounts.get(account_id)
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.accounts.contains_key(account_id)
    }

    /// Mutable access; the account is written back on commit
    pub fn get_mut(&mut self, account_id: &str) -> Option<&mut Account> {
        let account = self.accounts.get_mut(account_id)?;
        self.dirty.insert(account_id.to_string());
        Some(account)
    }

    pub fn insert(&mut self, account: Account) {
        self.removed.remove(&account.id);
        self.dirty.insert(account.id.clone());
        self.accounts.insert(account.id.clone(), account);
    }

    pub fn remove(&mut self, account_id: &str) -> Option<Account> {
        let account = self.accounts.remove(account_id)?;
        self.dirty.remove(account_id);
        self.removed.insert(account_id.to_string());
        Some(account)
    }

    /// The designated root. With a healthy ledger there is exactly one.
    pub fn admin(&self) -> Option<&Account> {
        self.accounts.values().find(|account| account.is_admin())
    }

    pub fn find_by_username(&self, username: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|account| account.username_matches(username))
    }

    pub fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|account| account.email_matches(email))
    }

    pub fn parent(&self, account_id: &str) -> Option<&Account> {
        let referrer_id = self.accounts.get(account_id)?.referrer_id.as_deref()?;
        self.accounts.get(referrer_id)
    }

    /// Direct referrals in insertion order, dangling ids skipped
    pub fn children(&self, account_id: &str) -> Vec<&Account> {
        self.accounts
            .get(account_id)
            .map(|account| {
                account
                    .referrals
                    .iter()
                    .filter_map(|child_id| self.accounts.get(child_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn direct_referral_count(&self, account_id: &str) -> usize {
        self.accounts
            .get(account_id)
            .map(|account| account.referrals.len())
            .unwrap_or(0)
    }

    /// Sum of the direct-referral counts of every existing direct referral
    pub fn grandchild_count(&self, account_id: &str) -> usize {
        self.children(account_id)
            .iter()
            .map(|child| child.referrals.len())
            .sum()
    }

    /// Consume the working copy, returning what must be written back
    pub fn into_changes(mut self) -> NetworkChanges {
        let mut updated: Vec<Account> = self
            .dirty
            .iter()
            .filter_map(|id| self.accounts.remove(id))
            .collect();
        updated.sort_by(|a, b| a.id.cmp(&b.id));

        let mut removed: Vec<String> = self.removed.into_iter().collect();
        removed.sort();

        NetworkChanges { updated, removed }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use shared::models::{Account, Role};

    pub fn account(id: &str, referrer: Option<&str>, referrals: &[&str]) -> Account {
        Account {
            id: id.to_string(),
            username: id.to_string(),
            credential_hash: String::new(),
            name: id.to_uppercase(),
            email: format!("{}@example.com", id),
            mobile: "5550100".to_string(),
            role: if referrer.is_none() {
                Role::Admin
            } else {
                Role::Member
            },
            referrer_id: referrer.map(str::to_string),
            referrals: referrals.iter().map(|s| s.to_string()).collect(),
            points: 0,
            task1_completed: false,
            task2_completed: false,
            created_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::account;
    use super::*;

    fn sample() -> ReferralNetwork {
        ReferralNetwork::from_accounts(vec![
            account("root", None, &["a", "b"]),
            account("a", Some("root"), &["a1", "a2", "ghost"]),
            account("b", Some("root"), &["b1"]),
            account("a1", Some("a"), &[]),
            account("a2", Some("a"), &[]),
            account("b1", Some("b"), &[]),
        ])
    }

    #[test]
    fn test_navigation() {
        let network = sample();
        assert_eq!(network.admin().map(|a| a.id.as_str()), Some("root"));
        assert_eq!(network.parent("a1").map(|a| a.id.as_str()), Some("a"));
        assert!(network.parent("root").is_none());

        let children: Vec<&str> = network
            .children("a")
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(children, vec!["a1", "a2"]);
    }

    #[test]
    fn test_counts() {
        let network = sample();
        // The dangling id still counts as a listed referral
        assert_eq!(network.direct_referral_count("a"), 3);
        assert_eq!(network.grandchild_count("root"), 4);
        assert_eq!(network.grandchild_count("missing"), 0);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let network = sample();
        assert!(network.find_by_username("ROOT").is_some());
        assert!(network.find_by_email("A1@EXAMPLE.COM").is_some());
    }

    #[test]
    fn test_changes_track_mutations() {
        let mut network = sample();
        assert!(network.clone().into_changes().is_empty());

        network.get_mut("a").unwrap().points += 10;
        network.insert(account("c", Some("root"), &[]));
        network.remove("b1");

        let changes = network.into_changes();
        let updated: Vec<&str> = changes.updated.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(updated, vec!["a", "c"]);
        assert_eq!(changes.removed, vec!["b1".to_string()]);
    }

    #[test]
    fn test_removed_account_is_not_written_back() {
        let mut network = sample();
        network.get_mut("b1").unwrap().points = 5;
        network.remove("b1");

        let changes = network.into_changes();
        assert!(changes.updated.is_empty());
        assert_eq!(changes.removed, vec!["b1".to_string()]);
    }
}
