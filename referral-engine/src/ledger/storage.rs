//! redb-based storage layer for the referral ledger
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `accounts` | `account_id` | `Account` | Account records |
//! | `referral_codes` | `UPPERCASE(code)` | `ReferralCode` | Case-insensitive code lookup |
//! | `code_requests` | `request_id` | `CodeRequest` | Bonus code requests |
//! | `login_events` | `sequence` | `LoginEvent` | Member login log (append-only) |
//! | `sequence_counter` | name | `u64` | Login event sequence |
//!
//! # Consistency
//!
//! Every mutating workflow runs in exactly one write transaction. Nothing
//! becomes visible to readers until `commit()` returns, and a dropped
//! transaction leaves no trace. Readers open a read transaction and see a
//! single committed snapshot across all tables.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{Account, CodeRequest, LoginEvent, ReferralCode};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for accounts: key = account id, value = JSON-serialized Account
const ACCOUNTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Table for referral codes: key = upper-cased code, value = JSON-serialized ReferralCode
const CODES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("referral_codes");

/// Table for code requests: key = request id, value = JSON-serialized CodeRequest
const REQUESTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("code_requests");

/// Table for login events: key = sequence, value = JSON-serialized LoginEvent
const LOGIN_EVENTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("login_events");

/// Table for sequence counters: key = counter name, value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const LOGIN_SEQUENCE_KEY: &str = "login_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// All ledger collections read from one committed snapshot
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub accounts: Vec<Account>,
    pub codes: Vec<ReferralCode>,
    pub requests: Vec<CodeRequest>,
    pub login_event_count: u64,
}

/// Ledger storage backed by redb
#[derive(Clone)]
pub struct LedgerStorage {
    db: Arc<Database>,
}

impl LedgerStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the change is on disk, and the copy-on-write pointer swap keeps
    /// the file consistent across crashes.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(ACCOUNTS_TABLE)?;
            let _ = write_txn.open_table(CODES_TABLE)?;
            let _ = write_txn.open_table(REQUESTS_TABLE)?;
            let _ = write_txn.open_table(LOGIN_EVENTS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(LOGIN_SEQUENCE_KEY)?.is_none() {
                seq_table.insert(LOGIN_SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Load every collection from a single snapshot
    pub fn load_snapshot(&self) -> StorageResult<LedgerSnapshot> {
        let read_txn = self.db.begin_read()?;
        Ok(LedgerSnapshot {
            accounts: decode_all(&read_txn.open_table(ACCOUNTS_TABLE)?)?,
            codes: decode_all(&read_txn.open_table(CODES_TABLE)?)?,
            requests: decode_all(&read_txn.open_table(REQUESTS_TABLE)?)?,
            login_event_count: read_txn.open_table(LOGIN_EVENTS_TABLE)?.len()?,
        })
    }

    // ========== Account Operations ==========

    /// List all accounts
    pub fn list_accounts(&self) -> StorageResult<Vec<Account>> {
        let read_txn = self.db.begin_read()?;
        decode_all(&read_txn.open_table(ACCOUNTS_TABLE)?)
    }

    /// List all accounts (within transaction)
    pub fn list_accounts_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<Account>> {
        decode_all(&txn.open_table(ACCOUNTS_TABLE)?)
    }

    /// Get an account by id
    pub fn get_account(&self, account_id: &str) -> StorageResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        decode_one(&read_txn.open_table(ACCOUNTS_TABLE)?, account_id)
    }

    /// Get an account by id (within transaction)
    pub fn get_account_txn(
        &self,
        txn: &WriteTransaction,
        account_id: &str,
    ) -> StorageResult<Option<Account>> {
        decode_one(&txn.open_table(ACCOUNTS_TABLE)?, account_id)
    }

    /// Count accounts (within transaction)
    pub fn count_accounts_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        Ok(txn.open_table(ACCOUNTS_TABLE)?.len()?)
    }

    /// Store an account (upsert)
    pub fn put_account(&self, txn: &WriteTransaction, account: &Account) -> StorageResult<()> {
        put_json(txn, ACCOUNTS_TABLE, &account.id, account)
    }

    /// Remove an account
    pub fn remove_account(&self, txn: &WriteTransaction, account_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACCOUNTS_TABLE)?;
        table.remove(account_id)?;
        Ok(())
    }

    // ========== Referral Code Operations ==========

    /// List all referral codes
    pub fn list_codes(&self) -> StorageResult<Vec<ReferralCode>> {
        let read_txn = self.db.begin_read()?;
        decode_all(&read_txn.open_table(CODES_TABLE)?)
    }

    /// List all referral codes (within transaction)
    pub fn list_codes_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<ReferralCode>> {
        decode_all(&txn.open_table(CODES_TABLE)?)
    }

    /// Get a referral code, case-insensitively (within transaction)
    pub fn get_code_txn(
        &self,
        txn: &WriteTransaction,
        code: &str,
    ) -> StorageResult<Option<ReferralCode>> {
        let key = ReferralCode::lookup_key(code);
        decode_one(&txn.open_table(CODES_TABLE)?, &key)
    }

    /// Store a referral code (upsert)
    pub fn put_code(&self, txn: &WriteTransaction, code: &ReferralCode) -> StorageResult<()> {
        let key = ReferralCode::lookup_key(&code.code);
        put_json(txn, CODES_TABLE, &key, code)
    }

    /// Remove a referral code
    pub fn remove_code(&self, txn: &WriteTransaction, code: &str) -> StorageResult<()> {
        let key = ReferralCode::lookup_key(code);
        let mut table = txn.open_table(CODES_TABLE)?;
        table.remove(key.as_str())?;
        Ok(())
    }

    // ========== Code Request Operations ==========

    /// List all code requests
    pub fn list_requests(&self) -> StorageResult<Vec<CodeRequest>> {
        let read_txn = self.db.begin_read()?;
        decode_all(&read_txn.open_table(REQUESTS_TABLE)?)
    }

    /// List all code requests (within transaction)
    pub fn list_requests_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<CodeRequest>> {
        decode_all(&txn.open_table(REQUESTS_TABLE)?)
    }

    /// Get a code request by id (within transaction)
    pub fn get_request_txn(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
    ) -> StorageResult<Option<CodeRequest>> {
        decode_one(&txn.open_table(REQUESTS_TABLE)?, request_id)
    }

    /// Store a code request (upsert)
    pub fn put_request(&self, txn: &WriteTransaction, request: &CodeRequest) -> StorageResult<()> {
        put_json(txn, REQUESTS_TABLE, &request.id, request)
    }

    // ========== Login Event Operations ==========

    /// Append a login event under the next sequence number
    pub fn append_login_event(
        &self,
        txn: &WriteTransaction,
        event: &LoginEvent,
    ) -> StorageResult<u64> {
        let sequence = {
            let mut seq_table = txn.open_table(SEQUENCE_TABLE)?;
            let current = seq_table
                .get(LOGIN_SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            let next = current + 1;
            seq_table.insert(LOGIN_SEQUENCE_KEY, next)?;
            next
        };

        let mut table = txn.open_table(LOGIN_EVENTS_TABLE)?;
        let value = serde_json::to_vec(event)?;
        table.insert(sequence, value.as_slice())?;
        Ok(sequence)
    }

    /// List login events, most recent first
    pub fn list_login_events(&self) -> StorageResult<Vec<LoginEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOGIN_EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.iter()?.rev() {
            let (_key, value) = result?;
            events.push(serde_json::from_slice(value.value())?);
        }
        Ok(events)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let accounts_table = read_txn.open_table(ACCOUNTS_TABLE)?;
        let codes_table = read_txn.open_table(CODES_TABLE)?;
        let requests_table = read_txn.open_table(REQUESTS_TABLE)?;
        let events_table = read_txn.open_table(LOGIN_EVENTS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            account_count: accounts_table.len()?,
            code_count: codes_table.len()?,
            request_count: requests_table.len()?,
            login_event_count: events_table.len()?,
            login_sequence: seq_table
                .get(LOGIN_SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    pub account_count: u64,
    pub code_count: u64,
    pub request_count: u64,
    pub login_event_count: u64,
    pub login_sequence: u64,
}

fn decode_all<T, R>(table: &R) -> StorageResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let mut items = Vec::new();
    for result in table.iter()? {
        let (_key, value) = result?;
        items.push(serde_json::from_slice(value.value())?);
    }
    Ok(items)
}

fn decode_one<T, R>(table: &R, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn put_json<T: Serialize>(
    txn: &WriteTransaction,
    definition: TableDefinition<'static, &'static str, &'static [u8]>,
    key: &str,
    item: &T,
) -> StorageResult<()> {
    let mut table = txn.open_table(definition)?;
    let value = serde_json::to_vec(item)?;
    table.insert(key, value.as_slice())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{RequestStatus, Role};

    fn create_test_account(id: &str, username: &str) -> Account {
        Account {
            id: id.to_string(),
            username: username.to_string(),
            credential_hash: "hash".to_string(),
            name: username.to_string(),
            email: format!("{}@example.com", username),
            mobile: "5550100".to_string(),
            role: Role::Member,
            referrer_id: None,
            referrals: vec![],
            points: 0,
            task1_completed: false,
            task2_completed: false,
            created_at: shared::util::now_millis(),
        }
    }

    fn create_test_login(id: &str) -> LoginEvent {
        LoginEvent {
            id: id.to_string(),
            timestamp: shared::util::now_millis(),
            user_id: "acc-1".to_string(),
            username: "alice".to_string(),
            name: "Alice".to_string(),
        }
    }

    #[test]
    fn test_account_roundtrip_and_remove() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let account = create_test_account("acc-1", "alice");

        let txn = storage.begin_write().unwrap();
        storage.put_account(&txn, &account).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_account("acc-1").unwrap(), Some(account));
        assert_eq!(storage.list_accounts().unwrap().len(), 1);

        let txn = storage.begin_write().unwrap();
        storage.remove_account(&txn, "acc-1").unwrap();
        txn.commit().unwrap();

        assert!(storage.get_account("acc-1").unwrap().is_none());
    }

    #[test]
    fn test_uncommitted_write_is_invisible() {
        let storage = LedgerStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage
            .put_account(&txn, &create_test_account("acc-1", "alice"))
            .unwrap();
        // Readers see the last committed snapshot
        assert!(storage.list_accounts().unwrap().is_empty());
        drop(txn);

        assert!(storage.list_accounts().unwrap().is_empty());
    }

    #[test]
    fn test_code_lookup_is_case_insensitive() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let code = ReferralCode::new("ALICE0001".to_string(), "acc-1".to_string(), 0);

        let txn = storage.begin_write().unwrap();
        storage.put_code(&txn, &code).unwrap();
        let found = storage.get_code_txn(&txn, "alice0001").unwrap();
        assert_eq!(found, Some(code.clone()));
        storage.remove_code(&txn, "Alice0001").unwrap();
        assert!(storage.get_code_txn(&txn, "ALICE0001").unwrap().is_none());
        txn.commit().unwrap();
    }

    #[test]
    fn test_request_storage() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let request = CodeRequest {
            id: "req-1".to_string(),
            requester_id: "acc-1".to_string(),
            status: RequestStatus::Pending,
            created_at: 0,
        };

        let txn = storage.begin_write().unwrap();
        storage.put_request(&txn, &request).unwrap();
        assert_eq!(
            storage.get_request_txn(&txn, "req-1").unwrap(),
            Some(request.clone())
        );
        txn.commit().unwrap();

        assert_eq!(storage.list_requests().unwrap(), vec![request]);
    }

    #[test]
    fn test_login_events_most_recent_first() {
        let storage = LedgerStorage::open_in_memory().unwrap();

        for id in ["log-1", "log-2", "log-3"] {
            let txn = storage.begin_write().unwrap();
            storage
                .append_login_event(&txn, &create_test_login(id))
                .unwrap();
            txn.commit().unwrap();
        }

        let ids: Vec<String> = storage
            .list_login_events()
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["log-3", "log-2", "log-1"]);
        assert_eq!(storage.get_stats().unwrap().login_sequence, 3);
    }

    #[test]
    fn test_snapshot_and_stats() {
        let storage = LedgerStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage
            .put_account(&txn, &create_test_account("acc-1", "alice"))
            .unwrap();
        storage
            .put_code(
                &txn,
                &ReferralCode::new("ALICE0001".to_string(), "acc-1".to_string(), 0),
            )
            .unwrap();
        assert_eq!(storage.count_accounts_txn(&txn).unwrap(), 1);
        txn.commit().unwrap();

        let snapshot = storage.load_snapshot().unwrap();
        assert_eq!(snapshot.accounts.len(), 1);
        assert_eq!(snapshot.codes.len(), 1);
        assert!(snapshot.requests.is_empty());
        assert_eq!(snapshot.login_event_count, 0);

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.account_count, 1);
        assert_eq!(stats.code_count, 1);
        assert_eq!(stats.request_count, 0);
    }
}
