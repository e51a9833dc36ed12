//! 账本错误码
//!
//! 按千位分段:
//! - 0xxx: 通用
//! - 1xxx: 认证
//! - 2xxx: 权限
//! - 3xxx: 账户
//! - 4xxx: 推荐码
//! - 5xxx: 推荐码申请
//! - 9xxx: 系统 / 存储

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric ledger error code, serialized as a bare `u16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    ValidationFailed = 2,

    InvalidCredentials = 1002,

    /// The admin is the tree root and cannot be cancelled
    CannotCancelAdmin = 2003,

    AccountNotFound = 3001,
    UsernameTaken = 3002,
    EmailTaken = 3003,

    /// Unknown or already redeemed referral code
    ReferralCodeInvalid = 4001,
    /// Owner already holds all 9999 code sequences
    ReferralCodeLimitReached = 4002,

    CodeRequestNotFound = 5001,
    CodeRequestAlreadyProcessed = 5002,
    /// Each member gets at most one approved bonus code
    BonusCodeAlreadyGranted = 5003,

    InternalError = 9001,
    /// Tree or code invariant found broken
    IntegrityViolation = 9004,
    /// Write lock timed out or the store is unreachable
    ServiceUnavailable = 9005,

    // redb failures classified by cause
    StorageFull = 9401,
    OutOfMemory = 9402,
    StorageCorrupted = 9403,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Canonical English message, used when no custom message is given
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "OK",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidCredentials => "Invalid username or password",
            ErrorCode::CannotCancelAdmin => "Cannot cancel an admin account",
            ErrorCode::AccountNotFound => "Account not found",
            ErrorCode::UsernameTaken => "Username is already taken",
            ErrorCode::EmailTaken => "Email is already registered",
            ErrorCode::ReferralCodeInvalid => {
                "Invalid or used referral code. A valid code is required to register"
            }
            ErrorCode::ReferralCodeLimitReached => "No referral codes left for this account",
            ErrorCode::CodeRequestNotFound => "Code request not found",
            ErrorCode::CodeRequestAlreadyProcessed => "Code request has already been processed",
            ErrorCode::BonusCodeAlreadyGranted => "Bonus referral code has already been granted",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::IntegrityViolation => "Ledger integrity violation",
            ErrorCode::ServiceUnavailable => "Ledger is temporarily unavailable",
            ErrorCode::StorageFull => "Ledger storage is full",
            ErrorCode::OutOfMemory => "Out of memory",
            ErrorCode::StorageCorrupted => "Ledger file is damaged",
        }
    }

    /// Every code, in numeric order
    pub const ALL: [ErrorCode; 18] = [
        ErrorCode::Success,
        ErrorCode::ValidationFailed,
        ErrorCode::InvalidCredentials,
        ErrorCode::CannotCancelAdmin,
        ErrorCode::AccountNotFound,
        ErrorCode::UsernameTaken,
        ErrorCode::EmailTaken,
        ErrorCode::ReferralCodeInvalid,
        ErrorCode::ReferralCodeLimitReached,
        ErrorCode::CodeRequestNotFound,
        ErrorCode::CodeRequestAlreadyProcessed,
        ErrorCode::BonusCodeAlreadyGranted,
        ErrorCode::InternalError,
        ErrorCode::IntegrityViolation,
        ErrorCode::ServiceUnavailable,
        ErrorCode::StorageFull,
        ErrorCode::OutOfMemory,
        ErrorCode::StorageCorrupted,
    ];
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// A `u16` that names no [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_sorted_and_complete() {
        assert!(ErrorCode::ALL.windows(2).all(|w| w[0].code() < w[1].code()));
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_registration_codes() {
        assert_eq!(ErrorCode::UsernameTaken.code(), 3002);
        assert_eq!(ErrorCode::EmailTaken.code(), 3003);
        assert_eq!(ErrorCode::ReferralCodeInvalid.code(), 4001);
        assert!(!ErrorCode::ReferralCodeInvalid.is_success());
        assert!(ErrorCode::Success.is_success());
    }

    #[test]
    fn test_wire_form_is_a_number() {
        let json = serde_json::to_string(&ErrorCode::BonusCodeAlreadyGranted).unwrap();
        assert_eq!(json, "5003");
        let parsed: ErrorCode = serde_json::from_str("2003").unwrap();
        assert_eq!(parsed, ErrorCode::CannotCancelAdmin);
        assert_eq!(ErrorCode::IntegrityViolation.to_string(), "9004");
    }

    #[test]
    fn test_unassigned_numbers_are_rejected() {
        assert!(serde_json::from_str::<ErrorCode>("3004").is_err());
        assert_eq!(
            ErrorCode::try_from(6000),
            Err(InvalidErrorCode(6000))
        );
        assert_eq!(InvalidErrorCode(6000).to_string(), "invalid error code: 6000");
    }
}
