use super::super::storage::StorageError;
use crate::auth::CredentialError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Username is already taken: {0}")]
    DuplicateUsername(String),

    #[error("Email is already registered: {0}")]
    DuplicateEmail(String),

    #[error("Invalid or used referral code: {0}")]
    InvalidCode(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("No referral code sequences left for: {0}")]
    CodeLimitReached(String),

    #[error("Code request not found: {0}")]
    RequestNotFound(String),

    #[error("Code request already processed: {0}")]
    AlreadyProcessed(String),

    #[error("Bonus code already granted to account: {0}")]
    BonusAlreadyGranted(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Coarse error taxonomy exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or conflicting input, user-correctable
    Validation,
    /// Code absent or already used
    InvalidCode,
    /// Unknown id referenced by the caller
    NotFound,
    /// Operation not allowed
    Forbidden,
    /// Wrong username or credential
    Auth,
    /// A guaranteed invariant was found broken
    Integrity,
    /// Store unreachable or busy
    Unavailable,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Storage(StorageError::Serialization(_)) => ErrorKind::Integrity,
            LedgerError::Storage(_) => ErrorKind::Unavailable,
            LedgerError::Credential(_) => ErrorKind::Integrity,
            LedgerError::Validation(_)
            | LedgerError::DuplicateUsername(_)
            | LedgerError::DuplicateEmail(_)
            | LedgerError::AlreadyProcessed(_) => ErrorKind::Validation,
            LedgerError::InvalidCode(_) => ErrorKind::InvalidCode,
            LedgerError::AccountNotFound(_) | LedgerError::RequestNotFound(_) => {
                ErrorKind::NotFound
            }
            LedgerError::Forbidden(_)
            | LedgerError::BonusAlreadyGranted(_)
            | LedgerError::CodeLimitReached(_) => ErrorKind::Forbidden,
            LedgerError::InvalidCredentials => ErrorKind::Auth,
            LedgerError::Integrity(_) => ErrorKind::Integrity,
            LedgerError::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}

impl From<validator::ValidationErrors> for LedgerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        messages.sort();
        LedgerError::Validation(messages.join("; "))
    }
}

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    if let StorageError::Serialization(_) = e {
        return ErrorCode::StorageCorrupted;
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    // 内存不足
    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return ErrorCode::OutOfMemory;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：暂时不可用（Database/Transaction/Table/Storage/Commit 错误）
    ErrorCode::ServiceUnavailable
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            // Operator-facing failures: full context to the log, generic message out
            LedgerError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(
                    error = %e,
                    error_code = %code,
                    error_category = code.category().name(),
                    "Ledger storage error"
                );
                AppError::new(code)
            }
            LedgerError::Credential(e) => {
                tracing::error!(error = %e, "Credential hasher failure");
                AppError::internal("Internal error")
            }
            LedgerError::Integrity(detail) => {
                tracing::error!(detail = %detail, "Ledger integrity violation");
                AppError::integrity()
            }
            LedgerError::Unavailable(detail) => {
                tracing::error!(detail = %detail, "Ledger unavailable");
                AppError::unavailable()
            }

            // User-correctable failures keep actionable messages
            LedgerError::Validation(msg) => AppError::validation(msg),
            LedgerError::DuplicateUsername(username) => {
                AppError::new(ErrorCode::UsernameTaken).with_detail("username", username)
            }
            LedgerError::DuplicateEmail(email) => {
                AppError::new(ErrorCode::EmailTaken).with_detail("email", email)
            }
            LedgerError::InvalidCode(code) => {
                AppError::new(ErrorCode::ReferralCodeInvalid).with_detail("code", code)
            }
            LedgerError::AccountNotFound(id) => {
                AppError::new(ErrorCode::AccountNotFound).with_detail("account_id", id)
            }
            LedgerError::CodeLimitReached(username) => {
                AppError::new(ErrorCode::ReferralCodeLimitReached).with_detail("username", username)
            }
            LedgerError::RequestNotFound(id) => {
                AppError::new(ErrorCode::CodeRequestNotFound).with_detail("request_id", id)
            }
            LedgerError::AlreadyProcessed(id) => {
                AppError::new(ErrorCode::CodeRequestAlreadyProcessed).with_detail("request_id", id)
            }
            LedgerError::BonusAlreadyGranted(id) => {
                AppError::new(ErrorCode::BonusCodeAlreadyGranted).with_detail("account_id", id)
            }
            LedgerError::Forbidden(msg) => AppError::with_message(ErrorCode::CannotCancelAdmin, msg),
            LedgerError::InvalidCredentials => AppError::invalid_credentials(),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
