use super::*;

#[test]
fn test_cancel_reparents_children_to_admin() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let top = register_under(&ledger, &admin.id, "top");
    let bob = register_under(&ledger, &top.id, "bob");
    let c1 = register_under(&ledger, &bob.id, "c1");
    let c2 = register_under(&ledger, &bob.id, "c2");
    let unused = ledger.issue_code(&bob.id).unwrap();
    let admin_before = reload(&ledger, &admin.id);

    let summary = ledger.cancel_account(&bob.id).unwrap();
    assert_eq!(summary.member_id, bob.id);
    assert_eq!(summary.reassigned_children, vec![c1.id.clone(), c2.id.clone()]);
    assert_eq!(summary.revoked_codes.len(), 3);
    assert!(summary.revoked_codes.contains(&unused.code));

    for child in [&c1, &c2] {
        let child = reload(&ledger, &child.id);
        assert_eq!(child.referrer_id.as_deref(), Some(admin.id.as_str()));
    }

    let admin_after = reload(&ledger, &admin.id);
    for child in [&c1, &c2] {
        let listed = admin_after
            .referrals
            .iter()
            .filter(|id| **id == child.id)
            .count();
        assert_eq!(listed, 1);
    }
    assert_eq!(admin_after.points, admin_before.points);
    assert_eq!(admin_after.task1_completed, admin_before.task1_completed);
    assert_eq!(admin_after.task2_completed, admin_before.task2_completed);

    assert!(!reload(&ledger, &top.id).referrals.contains(&bob.id));
    assert!(ledger.get_account(&bob.id).unwrap().is_none());
    assert!(
        ledger
            .list_codes()
            .unwrap()
            .iter()
            .all(|code| code.owner_id != bob.id)
    );
    assert_consistent(&ledger);
}

#[test]
fn test_cancel_direct_admin_child_is_not_duplicated() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let bob = register_under(&ledger, &admin.id, "bob");
    let child = register_under(&ledger, &bob.id, "child");

    ledger.cancel_account(&bob.id).unwrap();

    let admin = reload(&ledger, &admin.id);
    assert_eq!(admin.referrals, vec![child.id.clone()]);
    assert_consistent(&ledger);
}

#[test]
fn test_cancel_admin_is_forbidden() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let err = ledger.cancel_account(&admin.id).unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(ledger.get_account(&admin.id).unwrap().is_some());
}

#[test]
fn test_cancel_unknown_account() {
    let (ledger, _admin) = create_bootstrapped_ledger();
    let err = ledger.cancel_account("missing").unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(_)));
}

#[test]
fn test_cancel_without_admin_is_integrity_error() {
    let ledger = create_test_ledger();
    let orphan = Account {
        id: "orphan".to_string(),
        username: "orphan".to_string(),
        credential_hash: String::new(),
        name: "Orphan".to_string(),
        email: "orphan@example.com".to_string(),
        mobile: "5550100".to_string(),
        role: Role::Member,
        referrer_id: Some("gone".to_string()),
        referrals: Vec::new(),
        points: 0,
        task1_completed: false,
        task2_completed: false,
        created_at: 0,
    };
    let txn = ledger.storage.begin_write().unwrap();
    ledger.storage.put_account(&txn, &orphan).unwrap();
    txn.commit().unwrap();

    let err = ledger.cancel_account("orphan").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(ledger.get_account("orphan").unwrap().is_some());
}

#[test]
fn test_points_earned_are_kept_and_not_recomputed() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let top = register_under(&ledger, &admin.id, "top");
    let kids: Vec<Account> = (0..3)
        .map(|i| register_under(&ledger, &top.id, &format!("kid_{}", i)))
        .collect();
    assert_eq!(reload(&ledger, &top.id).points, 1000);

    // top drops below the threshold but keeps its reward
    ledger.cancel_account(&kids[0].id).unwrap();
    let top = reload(&ledger, &top.id);
    assert_eq!(top.referrals.len(), 2);
    assert!(top.task1_completed);
    assert_eq!(top.points, 1000);
}

#[test]
fn test_cancelled_username_and_code_prefix_can_be_reused() {
    let (ledger, admin) = create_bootstrapped_ledger();
    let bob = register_under(&ledger, &admin.id, "bob");
    ledger.issue_code(&bob.id).unwrap();
    ledger.cancel_account(&bob.id).unwrap();

    let bob_again = register_under(&ledger, &admin.id, "bob");
    assert_eq!(ledger.issue_code(&bob_again.id).unwrap().code, "BOB0001");
}
