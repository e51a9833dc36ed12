//! Account Model

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

/// Account entity (网络中的一个节点)
///
/// `referrer_id` / `referrals` form the referral tree. The admin is the only
/// account with no referrer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    /// PHC-format credential hash, produced by the credential hasher
    pub credential_hash: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub role: Role,
    pub referrer_id: Option<String>,
    /// Direct referrals in insertion order
    pub referrals: Vec<String>,
    pub points: u64,
    pub task1_completed: bool,
    pub task2_completed: bool,
    pub created_at: i64,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Case-insensitive username comparison
    pub fn username_matches(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username)
    }

    /// Case-insensitive email comparison
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

/// Account response (without credential hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub role: Role,
    pub referrer_id: Option<String>,
    pub referrals: Vec<String>,
    pub points: u64,
    pub task1_completed: bool,
    pub task2_completed: bool,
    pub created_at: i64,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            mobile: account.mobile.clone(),
            role: account.role,
            referrer_id: account.referrer_id.clone(),
            referrals: account.referrals.clone(),
            points: account.points,
            task1_completed: account.task1_completed,
            task2_completed: account.task2_completed,
            created_at: account.created_at,
        }
    }
}

/// Registration payload
///
/// Usernames become the prefix of every referral code the account owns,
/// so they are restricted to ASCII letters, digits and `_`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegistrationInput {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email is not valid"))]
    pub email: String,
    #[validate(length(min = 1, max = 32, message = "Mobile number is required"))]
    pub mobile: String,
    #[validate(
        length(min = 1, max = 32, message = "Username is required"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "A referral code is required to register"))]
    pub referral_code: String,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset")
            .with_message("Username may only contain letters, digits and '_'".into()))
    }
}
