use super::*;
use crate::auth::CredentialError;
use crate::ledger::storage::LedgerStorage;

const ADMIN_PASSWORD: &str = "admin-secret";
const MEMBER_PASSWORD: &str = "password123";

/// Reversible stand-in so tests don't pay for Argon2 on every registration
struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, credential: &str) -> Result<String, CredentialError> {
        Ok(format!("plain${}", credential))
    }

    fn verify(&self, credential: &str, hash: &str) -> Result<bool, CredentialError> {
        Ok(hash == format!("plain${}", credential))
    }
}

fn admin_seed() -> AdminBootstrap {
    AdminBootstrap {
        password: Some(ADMIN_PASSWORD.to_string()),
        ..AdminBootstrap::default()
    }
}

fn create_test_ledger() -> ReferralLedger {
    let storage = LedgerStorage::open_in_memory().unwrap();
    ReferralLedger::new(storage, Arc::new(PlainHasher))
}

/// Ledger with the admin already in place
fn create_bootstrapped_ledger() -> (ReferralLedger, Account) {
    let ledger = create_test_ledger();
    let admin = ledger.bootstrap_if_empty(&admin_seed()).unwrap().unwrap();
    (ledger, admin)
}

fn registration(username: &str, code: &str) -> RegistrationInput {
    RegistrationInput {
        name: format!("{} Test", username),
        email: format!("{}@example.com", username),
        mobile: "5550100".to_string(),
        username: username.to_string(),
        password: MEMBER_PASSWORD.to_string(),
        referral_code: code.to_string(),
    }
}

// ========================================================================
// Helper: issue a fresh code for the referrer and redeem it
// ========================================================================

fn register_under(ledger: &ReferralLedger, referrer_id: &str, username: &str) -> Account {
    let code = ledger.issue_code(referrer_id).unwrap();
    ledger.register(registration(username, &code.code)).unwrap()
}

fn reload(ledger: &ReferralLedger, account_id: &str) -> Account {
    ledger.get_account(account_id).unwrap().unwrap()
}

fn assert_consistent(ledger: &ReferralLedger) {
    let violations = ledger.verify_integrity().unwrap();
    assert!(violations.is_empty(), "violations: {:?}", violations);
}

mod test_cancellation;
mod test_requests;
