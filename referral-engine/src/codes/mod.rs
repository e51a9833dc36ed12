//! Referral code issuance
//!
//! Codes are deterministic: `UPPERCASE(username)` followed by the owner's
//! 4-digit, 1-based sequence. `ALICE` gets `ALICE0001`, `ALICE0002`, ...
//!
//! An owner holds at most [`MAX_SEQUENCE`] codes. A fifth digit would make
//! codes ambiguous (`A` + `10001` and `A1` + `0001` both read `A10001`).
//!
//! The sequence is the number of codes the owner already holds plus one.
//! It stays collision-free only while codes are never deleted ahead of a
//! higher sequence for the same owner (codes are removed solely when their
//! owner is cancelled) and usernames are unique and immutable. A clash that
//! slips through anyway is caught by the caller before the write.

use shared::models::{Account, ReferralCode};

/// Width of the zero-padded sequence suffix
const SEQUENCE_WIDTH: usize = 4;

/// Highest sequence that fits in [`SEQUENCE_WIDTH`] digits
pub const MAX_SEQUENCE: usize = 9999;

/// Format a code string for `username` and a 1-based `sequence`
///
/// `sequence` must not exceed [`MAX_SEQUENCE`].
pub fn format_code(username: &str, sequence: usize) -> String {
    format!(
        "{}{:0width$}",
        username.to_uppercase(),
        sequence,
        width = SEQUENCE_WIDTH
    )
}

/// Next unused code for `owner`, given every code currently stored
///
/// `None` once the owner has used up all [`MAX_SEQUENCE`] sequences.
pub fn next_code(owner: &Account, existing: &[ReferralCode], now: i64) -> Option<ReferralCode> {
    let owned = existing
        .iter()
        .filter(|code| code.owner_id == owner.id)
        .count();
    let sequence = owned + 1;
    if sequence > MAX_SEQUENCE {
        return None;
    }
    Some(ReferralCode::new(
        format_code(&owner.username, sequence),
        owner.id.clone(),
        now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Role;

    fn owner(id: &str, username: &str) -> Account {
        Account {
            id: id.to_string(),
            username: username.to_string(),
            credential_hash: String::new(),
            name: username.to_string(),
            email: format!("{}@example.com", username),
            mobile: String::new(),
            role: Role::Member,
            referrer_id: Some("admin".to_string()),
            referrals: vec![],
            points: 0,
            task1_completed: false,
            task2_completed: false,
            created_at: 0,
        }
    }

    #[test]
    fn test_format_code() {
        assert_eq!(format_code("alice", 1), "ALICE0001");
        assert_eq!(format_code("Bob_2", 42), "BOB_20042");
        assert_eq!(format_code("carol", MAX_SEQUENCE), "CAROL9999");
    }

    #[test]
    fn test_sequence_counts_only_own_codes() {
        let alice = owner("a", "alice");
        let mut existing = vec![
            ReferralCode::new("BOB0001".to_string(), "b".to_string(), 0),
            ReferralCode::new("BOB0002".to_string(), "b".to_string(), 0),
        ];

        for expected in ["ALICE0001", "ALICE0002", "ALICE0003"] {
            let code = next_code(&alice, &existing, 7).unwrap();
            assert_eq!(code.code, expected);
            assert_eq!(code.owner_id, "a");
            assert!(!code.is_used);
            assert!(code.used_by.is_none());
            assert_eq!(code.created_at, 7);
            existing.push(code);
        }
    }

    #[test]
    fn test_used_codes_still_count() {
        let alice = owner("a", "alice");
        let mut used = ReferralCode::new("ALICE0001".to_string(), "a".to_string(), 0);
        used.is_used = true;
        used.used_by = Some("x".to_string());

        assert_eq!(next_code(&alice, &[used], 0).unwrap().code, "ALICE0002");
    }

    #[test]
    fn test_sequence_stops_at_four_digits() {
        let alice = owner("a", "alice");
        let mut existing: Vec<_> = (1..MAX_SEQUENCE)
            .map(|seq| ReferralCode::new(format_code("alice", seq), "a".to_string(), 0))
            .collect();

        let last = next_code(&alice, &existing, 0).unwrap();
        assert_eq!(last.code, "ALICE9999");
        existing.push(last);
        assert!(next_code(&alice, &existing, 0).is_none());
    }
}
