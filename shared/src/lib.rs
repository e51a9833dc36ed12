//! Shared types for the referral ledger
//!
//! Entity models, report views, the unified error code system and small
//! utilities used by the engine and by any presentation layer on top of it.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, ErrorCategory, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
