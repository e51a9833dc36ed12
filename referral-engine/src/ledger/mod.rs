//! Ledger module - durable state and the workflows that mutate it
//!
//! - [`storage`] - redb tables, one write transaction per workflow
//! - [`manager`] - [`ReferralLedger`], the single-writer workflow handle

pub mod manager;
pub mod storage;

pub use manager::{CancellationSummary, ErrorKind, LedgerError, LedgerResult, ReferralLedger};
pub use storage::{LedgerSnapshot, LedgerStorage, StorageError, StorageStats};
