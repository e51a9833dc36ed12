//! Data models
//!
//! Ledger entities persisted by the referral engine plus the read-only
//! report views built from them. All IDs are opaque strings.

pub mod account;
pub mod code_request;
pub mod login_event;
pub mod network;
pub mod referral_code;

// Re-exports
pub use account::*;
pub use code_request::*;
pub use login_event::*;
pub use network::*;
pub use referral_code::*;
