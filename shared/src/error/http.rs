//! ErrorCode -> HTTP status, for dashboards that front the ledger

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::ValidationFailed | Self::ReferralCodeInvalid => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::CannotCancelAdmin => StatusCode::FORBIDDEN,
            Self::AccountNotFound | Self::CodeRequestNotFound => StatusCode::NOT_FOUND,
            Self::UsernameTaken
            | Self::EmailTaken
            | Self::ReferralCodeLimitReached
            | Self::CodeRequestAlreadyProcessed
            | Self::BonusCodeAlreadyGranted => StatusCode::CONFLICT,
            // 可重试
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError
            | Self::IntegrityViolation
            | Self::StorageFull
            | Self::OutOfMemory
            | Self::StorageCorrupted => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeem_failures_are_client_errors() {
        assert_eq!(
            ErrorCode::ReferralCodeInvalid.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::EmailTaken.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_only_lock_timeouts_are_retryable() {
        let retryable: Vec<_> = ErrorCode::ALL
            .into_iter()
            .filter(|c| c.http_status() == StatusCode::SERVICE_UNAVAILABLE)
            .collect();
        assert_eq!(retryable, vec![ErrorCode::ServiceUnavailable]);
    }

    #[test]
    fn test_every_failure_is_an_error_status() {
        for code in ErrorCode::ALL.into_iter().filter(|c| !c.is_success()) {
            let status = code.http_status();
            assert!(status.is_client_error() || status.is_server_error(), "{}", code);
        }
    }
}
