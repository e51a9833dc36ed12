//! ReferralLedger - workflows over the referral tree
//!
//! This module handles:
//! - Admin bootstrap and member login
//! - Registration (code redemption + reward propagation)
//! - Code issuance and bonus code requests
//! - Account cancellation with subtree re-parenting
//! - Snapshot reads (lists, tree, dashboards, integrity checks)
//!
//! # Write Flow
//!
//! ```text
//! register(input)
//!     ├─ 1. Validate input, hash credential (no lock held)
//!     ├─ 2. Acquire write lock (bounded wait)
//!     ├─ 3. Begin write transaction, load ReferralNetwork
//!     ├─ 4. Reject duplicate username / email
//!     ├─ 5. Look up code (case-insensitive), resolve referrer
//!     ├─ 6. Create account, append to referrer.referrals, mark code used
//!     ├─ 7. Propagate rewards from referrer to root
//!     ├─ 8. Write back touched accounts + code
//!     └─ 9. Commit
//! ```
//!
//! Any error before step 9 drops the transaction, so no partial state is
//! ever visible. Reads never take the lock: each opens one redb read
//! transaction and sees a single committed snapshot.

mod error;
pub use error::*;

#[cfg(test)]
mod tests;

use super::storage::{LedgerSnapshot, LedgerStorage, StorageError, StorageStats};
use crate::auth::{Argon2Hasher, CredentialHasher};
use crate::codes;
use crate::core::{AdminBootstrap, Config};
use crate::network::{IntegrityViolation, NetworkChanges, ReferralNetwork};
use crate::rewards::wallet::WalletPolicy;
use crate::rewards::{self, MilestoneAward, RewardPolicy};
use parking_lot::{Mutex, MutexGuard};
use redb::WriteTransaction;
use serde::Serialize;
use shared::models::{
    Account, CodeRequest, LedgerStats, LoginEvent, MemberOverview, ReferralCode,
    RegistrationInput, RequestStatus, Role, TreeNode,
};
use shared::util::{new_id, now_millis};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

/// Default bound on waiting for the write lock
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// What a cancellation changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancellationSummary {
    pub member_id: String,
    pub username: String,
    /// Children moved under the admin
    pub reassigned_children: Vec<String>,
    /// Codes deleted with the account, used or not
    pub revoked_codes: Vec<String>,
}

/// Single-writer referral ledger
///
/// Shared across threads via `Arc`. All mutating workflows are serialized by
/// one process-wide mutex and run inside one redb write transaction.
pub struct ReferralLedger {
    storage: LedgerStorage,
    write_lock: Mutex<()>,
    hasher: Arc<dyn CredentialHasher>,
    policy: RewardPolicy,
    wallet: WalletPolicy,
    lock_timeout: Duration,
}

impl std::fmt::Debug for ReferralLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferralLedger")
            .field("storage", &"<LedgerStorage>")
            .field("hasher", &"<CredentialHasher>")
            .field("policy", &self.policy)
            .field("wallet", &self.wallet)
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

impl ReferralLedger {
    pub fn new(storage: LedgerStorage, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
            hasher,
            policy: RewardPolicy::default(),
            wallet: WalletPolicy::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Open the ledger described by `config` with the Argon2 hasher
    pub fn open(config: &Config) -> LedgerResult<Self> {
        if let Some(parent) = config.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::Unavailable(format!(
                    "cannot create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let storage = LedgerStorage::open(&config.db_path)?;
        tracing::info!(path = %config.db_path.display(), "Ledger opened");

        Ok(Self::new(storage, Arc::new(Argon2Hasher))
            .with_policy(config.rewards)
            .with_wallet_policy(config.wallet)
            .with_lock_timeout(config.lock_timeout()))
    }

    pub fn with_policy(mut self, policy: RewardPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_wallet_policy(mut self, wallet: WalletPolicy) -> Self {
        self.wallet = wallet;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    // ========== Internals ==========

    fn lock(&self) -> LedgerResult<MutexGuard<'_, ()>> {
        self.write_lock
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| {
                tracing::warn!(
                    timeout_ms = self.lock_timeout.as_millis() as u64,
                    "Timed out waiting for the ledger write lock"
                );
                LedgerError::Unavailable("ledger is busy, try again later".to_string())
            })
    }

    fn load_network(&self, txn: &WriteTransaction) -> LedgerResult<ReferralNetwork> {
        Ok(ReferralNetwork::from_accounts(
            self.storage.list_accounts_txn(txn)?,
        ))
    }

    fn write_changes(&self, txn: &WriteTransaction, changes: NetworkChanges) -> LedgerResult<()> {
        for account in &changes.updated {
            self.storage.put_account(txn, account)?;
        }
        for account_id in &changes.removed {
            self.storage.remove_account(txn, account_id)?;
        }
        Ok(())
    }

    fn commit(txn: WriteTransaction) -> LedgerResult<()> {
        txn.commit().map_err(StorageError::from)?;
        Ok(())
    }

    fn snapshot(&self) -> LedgerResult<(LedgerSnapshot, ReferralNetwork)> {
        let mut snapshot = self.storage.load_snapshot()?;
        let accounts = std::mem::take(&mut snapshot.accounts);
        Ok((snapshot, ReferralNetwork::from_accounts(accounts)))
    }

    /// Generate, collision-check and store the next code for `owner`
    fn issue_code_txn(&self, txn: &WriteTransaction, owner: &Account) -> LedgerResult<ReferralCode> {
        let existing = self.storage.list_codes_txn(txn)?;
        let Some(code) = codes::next_code(owner, &existing, now_millis()) else {
            tracing::warn!(owner_id = %owner.id, "Owner has used every code sequence");
            return Err(LedgerError::CodeLimitReached(owner.username.clone()));
        };

        if self.storage.get_code_txn(txn, &code.code)?.is_some() {
            tracing::error!(
                code = %code.code,
                owner_id = %owner.id,
                "Generated referral code collides with an existing code"
            );
            return Err(LedgerError::Integrity(format!(
                "generated referral code {} already exists",
                code.code
            )));
        }

        self.storage.put_code(txn, &code)?;
        Ok(code)
    }

    // ========== Bootstrap & Authentication ==========

    /// Create the admin account when the ledger holds no accounts
    ///
    /// Returns `None` when any account already exists.
    pub fn bootstrap_if_empty(&self, admin: &AdminBootstrap) -> LedgerResult<Option<Account>> {
        if self.storage.get_stats()?.account_count > 0 {
            return Ok(None);
        }

        let password = admin
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                LedgerError::Validation(
                    "an admin password is required to bootstrap an empty ledger".to_string(),
                )
            })?;
        let credential_hash = self.hasher.hash(password)?;

        let _guard = self.lock()?;
        let txn = self.storage.begin_write()?;
        // Re-check under the lock
        if self.storage.count_accounts_txn(&txn)? > 0 {
            return Ok(None);
        }

        let account = Account {
            id: new_id(),
            username: admin.username.clone(),
            credential_hash,
            name: admin.name.clone(),
            email: admin.email.clone(),
            mobile: admin.mobile.clone(),
            role: Role::Admin,
            referrer_id: None,
            referrals: Vec::new(),
            points: admin.initial_points,
            // The admin does not take part in milestones
            task1_completed: true,
            task2_completed: true,
            created_at: now_millis(),
        };
        self.storage.put_account(&txn, &account)?;
        Self::commit(txn)?;

        crate::audit_log!(
            "system",
            "bootstrap",
            format!("account:{}", account.id).as_str(),
            account.username.as_str()
        );
        Ok(Some(account))
    }

    /// Verify a username/credential pair
    ///
    /// Unknown username and wrong credential fail identically. Member logins
    /// are appended to the login log; admin logins are not.
    pub fn authenticate(&self, username: &str, credential: &str) -> LedgerResult<Account> {
        let account = self
            .storage
            .list_accounts()?
            .into_iter()
            .find(|account| account.username_matches(username));

        let Some(account) = account else {
            crate::security_log!(WARN, "login_failed", username = %username, reason = "unknown_username");
            return Err(LedgerError::InvalidCredentials);
        };

        if !self.hasher.verify(credential, &account.credential_hash)? {
            crate::security_log!(WARN, "login_failed", username = %username, reason = "wrong_credential");
            return Err(LedgerError::InvalidCredentials);
        }

        if !account.is_admin() {
            self.record_login(&account)?;
        }

        crate::security_log!(INFO, "login_success", account_id = %account.id, username = %account.username);
        Ok(account)
    }

    /// Append a login event for a verified member
    ///
    /// The account is re-read under the write lock; a cancellation that landed
    /// after verification turns the login into `InvalidCredentials`.
    fn record_login(&self, account: &Account) -> LedgerResult<()> {
        let _guard = self.lock()?;
        let txn = self.storage.begin_write()?;
        let Some(current) = self.storage.get_account_txn(&txn, &account.id)? else {
            crate::security_log!(WARN, "login_failed", username = %account.username, reason = "account_cancelled");
            return Err(LedgerError::InvalidCredentials);
        };

        self.storage.append_login_event(
            &txn,
            &LoginEvent {
                id: new_id(),
                timestamp: now_millis(),
                user_id: current.id,
                username: current.username,
                name: current.name,
            },
        )?;
        Self::commit(txn)
    }

    // ========== Registration ==========

    /// Register a member by redeeming a referral code
    pub fn register(&self, input: RegistrationInput) -> LedgerResult<Account> {
        input.validate()?;
        let credential_hash = self.hasher.hash(&input.password)?;

        let _guard = self.lock()?;
        let txn = self.storage.begin_write()?;
        let mut network = self.load_network(&txn)?;

        if network.find_by_username(&input.username).is_some() {
            return Err(LedgerError::DuplicateUsername(input.username));
        }
        if network.find_by_email(&input.email).is_some() {
            return Err(LedgerError::DuplicateEmail(input.email));
        }

        let mut code = self
            .storage
            .get_code_txn(&txn, &input.referral_code)?
            .filter(|code| code.is_available())
            .ok_or_else(|| LedgerError::InvalidCode(input.referral_code.trim().to_string()))?;

        let referrer_id = code.owner_id.clone();
        if !network.contains(&referrer_id) {
            tracing::error!(
                code = %code.code,
                owner_id = %referrer_id,
                "Referral code belongs to an account that no longer exists"
            );
            return Err(LedgerError::Integrity(format!(
                "referral code {} belongs to missing account {}",
                code.code, referrer_id
            )));
        }

        let account = Account {
            id: new_id(),
            username: input.username,
            credential_hash,
            name: input.name,
            email: input.email,
            mobile: input.mobile,
            role: Role::Member,
            referrer_id: Some(referrer_id.clone()),
            referrals: Vec::new(),
            points: 0,
            task1_completed: false,
            task2_completed: false,
            created_at: now_millis(),
        };
        network.insert(account.clone());
        if let Some(referrer) = network.get_mut(&referrer_id) {
            referrer.referrals.push(account.id.clone());
        }
        code.is_used = true;
        code.used_by = Some(account.id.clone());

        let awards = rewards::propagate(&mut network, &referrer_id, &self.policy)?;

        self.write_changes(&txn, network.into_changes())?;
        self.storage.put_code(&txn, &code)?;
        Self::commit(txn)?;

        tracing::info!(
            account_id = %account.id,
            username = %account.username,
            referrer_id = %referrer_id,
            code = %code.code,
            awards = awards.len(),
            "Member registered"
        );
        Ok(account)
    }

    /// Re-run reward propagation from `account_id` up to the root
    ///
    /// A no-op for accounts whose reachable milestones are already awarded.
    pub fn propagate_rewards(&self, account_id: &str) -> LedgerResult<Vec<MilestoneAward>> {
        let _guard = self.lock()?;
        let txn = self.storage.begin_write()?;
        let mut network = self.load_network(&txn)?;

        if !network.contains(account_id) {
            return Err(LedgerError::AccountNotFound(account_id.to_string()));
        }

        let awards = rewards::propagate(&mut network, account_id, &self.policy)?;
        let changes = network.into_changes();
        if changes.is_empty() {
            return Ok(awards);
        }

        self.write_changes(&txn, changes)?;
        Self::commit(txn)?;
        Ok(awards)
    }

    // ========== Codes & Requests ==========

    /// Issue the owner's next referral code
    pub fn issue_code(&self, owner_id: &str) -> LedgerResult<ReferralCode> {
        let _guard = self.lock()?;
        let txn = self.storage.begin_write()?;

        let owner = self
            .storage
            .get_account_txn(&txn, owner_id)?
            .ok_or_else(|| LedgerError::AccountNotFound(owner_id.to_string()))?;
        let code = self.issue_code_txn(&txn, &owner)?;
        Self::commit(txn)?;

        tracing::info!(code = %code.code, owner_id = %owner.id, "Referral code issued");
        Ok(code)
    }

    /// Ask the admin for a bonus code
    ///
    /// Returns `None` without writing anything if a request is already
    /// pending for this account.
    pub fn request_code(&self, account_id: &str) -> LedgerResult<Option<CodeRequest>> {
        let _guard = self.lock()?;
        let txn = self.storage.begin_write()?;

        if self.storage.get_account_txn(&txn, account_id)?.is_none() {
            return Err(LedgerError::AccountNotFound(account_id.to_string()));
        }

        let requests = self.storage.list_requests_txn(&txn)?;
        let mut own = requests.iter().filter(|r| r.requester_id == account_id);
        if own.clone().any(CodeRequest::is_pending) {
            tracing::debug!(account_id = %account_id, "Code request already pending");
            return Ok(None);
        }
        if own.any(|r| r.status == RequestStatus::Approved) {
            return Err(LedgerError::BonusAlreadyGranted(account_id.to_string()));
        }

        let request = CodeRequest {
            id: new_id(),
            requester_id: account_id.to_string(),
            status: RequestStatus::Pending,
            created_at: now_millis(),
        };
        self.storage.put_request(&txn, &request)?;
        Self::commit(txn)?;

        tracing::info!(request_id = %request.id, account_id = %account_id, "Code request created");
        Ok(Some(request))
    }

    /// Approve a pending request: issue a code and credit the bonus
    pub fn approve_request(&self, request_id: &str) -> LedgerResult<ReferralCode> {
        let _guard = self.lock()?;
        let txn = self.storage.begin_write()?;

        let mut request = self
            .storage
            .get_request_txn(&txn, request_id)?
            .ok_or_else(|| LedgerError::RequestNotFound(request_id.to_string()))?;
        if !request.is_pending() {
            return Err(LedgerError::AlreadyProcessed(request_id.to_string()));
        }

        // One bonus code per account, ever
        let already_granted = self.storage.list_requests_txn(&txn)?.iter().any(|r| {
            r.requester_id == request.requester_id
                && r.id != request.id
                && r.status == RequestStatus::Approved
        });
        if already_granted {
            return Err(LedgerError::BonusAlreadyGranted(request.requester_id));
        }

        let mut network = self.load_network(&txn)?;
        let requester = network
            .get(&request.requester_id)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(request.requester_id.clone()))?;

        request.status = RequestStatus::Approved;
        let code = self.issue_code_txn(&txn, &requester)?;
        if let Some(account) = network.get_mut(&requester.id) {
            account.points = account.points.saturating_add(self.policy.bonus_code_reward);
        }

        self.write_changes(&txn, network.into_changes())?;
        self.storage.put_request(&txn, &request)?;
        Self::commit(txn)?;

        crate::audit_log!(
            "admin",
            "approve_code_request",
            format!("code_request:{}", request.id).as_str(),
            format!("issued {} to {}", code.code, requester.username).as_str()
        );
        Ok(code)
    }

    /// Reject a pending request; no code, no points
    pub fn reject_request(&self, request_id: &str) -> LedgerResult<CodeRequest> {
        let _guard = self.lock()?;
        let txn = self.storage.begin_write()?;

        let mut request = self
            .storage
            .get_request_txn(&txn, request_id)?
            .ok_or_else(|| LedgerError::RequestNotFound(request_id.to_string()))?;
        if !request.is_pending() {
            return Err(LedgerError::AlreadyProcessed(request_id.to_string()));
        }

        request.status = RequestStatus::Rejected;
        self.storage.put_request(&txn, &request)?;
        Self::commit(txn)?;

        crate::audit_log!(
            "admin",
            "reject_code_request",
            format!("code_request:{}", request.id).as_str()
        );
        Ok(request)
    }

    // ========== Cancellation ==========

    /// Delete a member, moving its children under the admin
    ///
    /// Earned points are never revoked and the admin's milestones are not
    /// re-evaluated after absorbing the children.
    pub fn cancel_account(&self, member_id: &str) -> LedgerResult<CancellationSummary> {
        let _guard = self.lock()?;
        let txn = self.storage.begin_write()?;
        let mut network = self.load_network(&txn)?;

        let member = network
            .get(member_id)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(member_id.to_string()))?;
        if member.is_admin() {
            return Err(LedgerError::Forbidden(
                "the admin account cannot be cancelled".to_string(),
            ));
        }
        let admin_id = match network.admin() {
            Some(admin) => admin.id.clone(),
            None => {
                tracing::error!(member_id = %member_id, "No admin account to absorb orphaned referrals");
                return Err(LedgerError::Integrity(
                    "no admin account exists to absorb referrals".to_string(),
                ));
            }
        };

        let mut reassigned_children = Vec::new();
        for child_id in &member.referrals {
            if let Some(child) = network.get_mut(child_id) {
                child.referrer_id = Some(admin_id.clone());
                reassigned_children.push(child_id.clone());
            }
        }
        if let Some(admin) = network.get_mut(&admin_id) {
            for child_id in &reassigned_children {
                if !admin.referrals.contains(child_id) {
                    admin.referrals.push(child_id.clone());
                }
            }
        }

        if let Some(referrer_id) = member.referrer_id.as_deref()
            && let Some(referrer) = network.get_mut(referrer_id)
        {
            referrer.referrals.retain(|id| id != &member.id);
        }

        network.remove(&member.id);

        let mut revoked_codes = Vec::new();
        for code in self.storage.list_codes_txn(&txn)? {
            if code.owner_id == member.id {
                self.storage.remove_code(&txn, &code.code)?;
                revoked_codes.push(code.code);
            }
        }
        revoked_codes.sort();

        self.write_changes(&txn, network.into_changes())?;
        Self::commit(txn)?;

        crate::security_log!(
            WARN,
            "account_cancelled",
            member_id = %member.id,
            username = %member.username,
            reassigned = reassigned_children.len(),
            revoked_codes = revoked_codes.len()
        );

        Ok(CancellationSummary {
            member_id: member.id,
            username: member.username,
            reassigned_children,
            revoked_codes,
        })
    }

    // ========== Reads ==========

    /// All accounts, oldest first
    pub fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        let mut accounts = self.storage.list_accounts()?;
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(accounts)
    }

    /// All referral codes, oldest first
    pub fn list_codes(&self) -> LedgerResult<Vec<ReferralCode>> {
        let mut codes = self.storage.list_codes()?;
        codes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.code.cmp(&b.code)));
        Ok(codes)
    }

    /// All code requests, oldest first
    pub fn list_requests(&self) -> LedgerResult<Vec<CodeRequest>> {
        let mut requests = self.storage.list_requests()?;
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(requests)
    }

    /// Member logins, most recent first
    pub fn list_login_events(&self) -> LedgerResult<Vec<LoginEvent>> {
        Ok(self.storage.list_login_events()?)
    }

    pub fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        Ok(self.storage.get_account(account_id)?)
    }

    /// Nested view of the subtree rooted at `root_id`
    pub fn build_network_tree(&self, root_id: &str) -> LedgerResult<Option<TreeNode>> {
        let (_, network) = self.snapshot()?;
        Ok(network.build_tree(root_id))
    }

    /// Admin dashboard counters
    pub fn stats(&self) -> LedgerResult<LedgerStats> {
        let (snapshot, network) = self.snapshot()?;
        Ok(LedgerStats {
            total_members: network.accounts().filter(|a| !a.is_admin()).count() as u64,
            available_codes: snapshot.codes.iter().filter(|c| c.is_available()).count() as u64,
            pending_requests: snapshot.requests.iter().filter(|r| r.is_pending()).count() as u64,
            total_member_logins: snapshot.login_event_count,
        })
    }

    /// Member dashboard: codes, pending request, tasks and wallet
    pub fn member_overview(&self, account_id: &str) -> LedgerResult<MemberOverview> {
        let (snapshot, network) = self.snapshot()?;
        let account = network
            .get(account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        let mut available_codes: Vec<ReferralCode> = snapshot
            .codes
            .into_iter()
            .filter(|c| c.owner_id == account.id && c.is_available())
            .collect();
        available_codes.sort_by(|a, b| a.code.cmp(&b.code));

        let own: Vec<&CodeRequest> = snapshot
            .requests
            .iter()
            .filter(|r| r.requester_id == account.id)
            .collect();
        let pending_request = own.iter().find(|r| r.is_pending()).map(|r| (*r).clone());
        let bonus_granted = own.iter().any(|r| r.status == RequestStatus::Approved);

        Ok(MemberOverview {
            account: account.into(),
            available_codes,
            can_request_code: pending_request.is_none() && !bonus_granted,
            pending_request,
            tasks: rewards::task_progress(&network, account, &self.policy),
            wallet: self.wallet.summary(account.points),
        })
    }

    /// Check every tree and code invariant against one snapshot
    pub fn verify_integrity(&self) -> LedgerResult<Vec<IntegrityViolation>> {
        let (snapshot, network) = self.snapshot()?;
        let mut violations = network.check_invariants();

        for code in &snapshot.codes {
            if code.is_used != code.used_by.is_some() {
                violations.push(IntegrityViolation::CodeUsageMismatch {
                    code: code.code.clone(),
                });
            }
            if !network.contains(&code.owner_id) {
                violations.push(IntegrityViolation::CodeOwnerMissing {
                    code: code.code.clone(),
                    owner_id: code.owner_id.clone(),
                });
            }
        }

        if !violations.is_empty() {
            tracing::error!(count = violations.len(), "Ledger integrity violations found");
        }
        Ok(violations)
    }

    pub fn storage_stats(&self) -> LedgerResult<StorageStats> {
        Ok(self.storage.get_stats()?)
    }
}
