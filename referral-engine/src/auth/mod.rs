//! 认证模块
//!
//! The ledger only needs a credential hash/verify pair. It is injected as a
//! [`CredentialHasher`] so workflows never see the algorithm:
//! - [`Argon2Hasher`] - production hasher (Argon2id, PHC strings)

pub mod password;

pub use password::{Argon2Hasher, CredentialError, CredentialHasher};
