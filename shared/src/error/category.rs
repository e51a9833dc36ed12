//! 错误码分类 (按千位)

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Permission,
    Account,
    ReferralCode,
    CodeRequest,
    /// 9xxx and anything unassigned
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            1 => Self::Auth,
            2 => Self::Permission,
            3 => Self::Account,
            4 => Self::ReferralCode,
            5 => Self::CodeRequest,
            _ => Self::System,
        }
    }

    /// Value of the `error_category` log field
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Account => "account",
            Self::ReferralCode => "referral_code",
            Self::CodeRequest => "code_request",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_workflow_codes_share_a_category() {
        for code in [
            ErrorCode::CodeRequestNotFound,
            ErrorCode::CodeRequestAlreadyProcessed,
            ErrorCode::BonusCodeAlreadyGranted,
        ] {
            assert_eq!(code.category(), ErrorCategory::CodeRequest);
        }
        assert_eq!(ErrorCode::ReferralCodeInvalid.category(), ErrorCategory::ReferralCode);
    }

    #[test]
    fn test_storage_codes_are_system() {
        assert_eq!(ErrorCode::StorageCorrupted.category(), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(6500), ErrorCategory::System);
    }

    #[test]
    fn test_name_matches_serde_form() {
        let json = serde_json::to_string(&ErrorCategory::CodeRequest).unwrap();
        assert_eq!(json, format!("\"{}\"", ErrorCategory::CodeRequest.name()));
    }
}
