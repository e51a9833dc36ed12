use super::*;

#[test]
fn test_second_request_is_noop() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let alice = register_under(&ledger, &admin.id, "alice");

    let first = ledger.request_code(&alice.id).unwrap();
    assert!(first.is_some());
    let second = ledger.request_code(&alice.id).unwrap();
    assert!(second.is_none());

    let requests = ledger.list_requests().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].status, RequestStatus::Pending);
    assert_eq!(requests[0].requester_id, alice.id);
}

#[test]
fn test_request_for_unknown_account() {
    let (ledger, _admin) = create_bootstrapped_ledger();
    let err = ledger.request_code("missing").unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(_)));
}

#[test]
fn test_approve_issues_code_and_credits_bonus() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let alice = register_under(&ledger, &admin.id, "alice");
    let request = ledger.request_code(&alice.id).unwrap().unwrap();

    let code = ledger.approve_request(&request.id).unwrap();
    assert_eq!(code.code, "ALICE0001");
    assert_eq!(code.owner_id, alice.id);
    assert!(code.is_available());

    assert_eq!(reload(&ledger, &alice.id).points, 500);
    let stored = ledger.list_requests().unwrap();
    assert_eq!(stored[0].status, RequestStatus::Approved);
    assert_consistent(&ledger);
}

#[test]
fn test_approve_twice_is_already_processed() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let alice = register_under(&ledger, &admin.id, "alice");
    let request = ledger.request_code(&alice.id).unwrap().unwrap();

    ledger.approve_request(&request.id).unwrap();
    let err = ledger.approve_request(&request.id).unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyProcessed(_)));

    // No second code, no second bonus
    assert_eq!(ledger.list_codes().unwrap().len(), 2);
    assert_eq!(reload(&ledger, &alice.id).points, 500);
}

#[test]
fn test_approve_unknown_request() {
    let (ledger, _admin) = create_bootstrapped_ledger();
    let err = ledger.approve_request("missing").unwrap_err();
    assert!(matches!(err, LedgerError::RequestNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_one_bonus_code_per_lifetime() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let alice = register_under(&ledger, &admin.id, "alice");
    let request = ledger.request_code(&alice.id).unwrap().unwrap();
    ledger.approve_request(&request.id).unwrap();

    let err = ledger.request_code(&alice.id).unwrap_err();
    assert!(matches!(err, LedgerError::BonusAlreadyGranted(_)));
}

#[test]
fn test_approve_refuses_second_grant() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let alice = register_under(&ledger, &admin.id, "alice");
    let request = ledger.request_code(&alice.id).unwrap().unwrap();
    ledger.approve_request(&request.id).unwrap();

    // A stray pending request written around the workflow
    let stray = CodeRequest {
        id: "stray".to_string(),
        requester_id: alice.id.clone(),
        status: RequestStatus::Pending,
        created_at: now_millis(),
    };
    let txn = ledger.storage.begin_write().unwrap();
    ledger.storage.put_request(&txn, &stray).unwrap();
    txn.commit().unwrap();

    let err = ledger.approve_request("stray").unwrap_err();
    assert!(matches!(err, LedgerError::BonusAlreadyGranted(_)));
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(reload(&ledger, &alice.id).points, 500);
}

#[test]
fn test_reject_then_request_again() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let alice = register_under(&ledger, &admin.id, "alice");
    let request = ledger.request_code(&alice.id).unwrap().unwrap();

    let rejected = ledger.reject_request(&request.id).unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(reload(&ledger, &alice.id).points, 0);
    assert!(matches!(
        ledger.approve_request(&request.id).unwrap_err(),
        LedgerError::AlreadyProcessed(_)
    ));

    assert!(ledger.request_code(&alice.id).unwrap().is_some());
}

#[test]
fn test_approve_after_requester_cancelled() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let alice = register_under(&ledger, &admin.id, "alice");
    let request = ledger.request_code(&alice.id).unwrap().unwrap();
    ledger.cancel_account(&alice.id).unwrap();

    let err = ledger.approve_request(&request.id).unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(_)));
    // Nothing committed: the request is still pending
    assert!(ledger.list_requests().unwrap()[0].is_pending());
}

#[test]
fn test_member_overview_tracks_request_state() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let alice = register_under(&ledger, &admin.id, "alice");
    ledger.issue_code(&alice.id).unwrap();

    let overview = ledger.member_overview(&alice.id).unwrap();
    assert!(overview.can_request_code);
    assert!(overview.pending_request.is_none());
    assert_eq!(overview.available_codes.len(), 1);
    assert_eq!(overview.tasks.len(), 2);
    assert_eq!(overview.wallet.points, 0);
    assert_eq!(overview.wallet.minimum_withdrawal_points, 10_000);

    let request = ledger.request_code(&alice.id).unwrap().unwrap();
    let overview = ledger.member_overview(&alice.id).unwrap();
    assert!(!overview.can_request_code);
    assert_eq!(overview.pending_request.map(|r| r.id), Some(request.id.clone()));

    ledger.approve_request(&request.id).unwrap();
    let overview = ledger.member_overview(&alice.id).unwrap();
    assert!(!overview.can_request_code);
    assert!(overview.pending_request.is_none());
    assert_eq!(overview.available_codes.len(), 2);
    assert_eq!(overview.account.points, 500);
    assert_eq!(overview.wallet.cash_value, rust_decimal::Decimal::from(25));
}
