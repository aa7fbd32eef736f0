use road_watch::{
    access::{AccessDenied, Operation, authorize, may_delete, require_identity},
    auth::AuthUser,
};
use rstest::rstest;

const OWNER: AuthUser = AuthUser {
    id: 1,
    is_admin: false,
};
const OTHER: AuthUser = AuthUser {
    id: 3,
    is_admin: false,
};
const ADMIN: AuthUser = AuthUser {
    id: 2,
    is_admin: true,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Expect {
    Allow,
    Unauthenticated,
    Forbidden,
}

fn outcome(caller: Option<AuthUser>, operation: Operation) -> Expect {
    match authorize(caller.as_ref(), operation) {
        Ok(()) => Expect::Allow,
        Err(AccessDenied::Unauthenticated) => Expect::Unauthenticated,
        Err(AccessDenied::Forbidden(_)) => Expect::Forbidden,
    }
}

// One row per cell of the decision table. The resource owner is always user 1.
#[rstest]
// Public reads.
#[case(None, Operation::ListApproved, Expect::Allow)]
#[case(Some(OTHER), Operation::ListApproved, Expect::Allow)]
#[case(None, Operation::QueryNear, Expect::Allow)]
#[case(Some(ADMIN), Operation::QueryNear, Expect::Allow)]
// Moderation queue.
#[case(None, Operation::ListPending, Expect::Unauthenticated)]
#[case(Some(OTHER), Operation::ListPending, Expect::Forbidden)]
#[case(Some(OWNER), Operation::ListPending, Expect::Forbidden)]
#[case(Some(ADMIN), Operation::ListPending, Expect::Allow)]
// Own listing, no admin override.
#[case(None, Operation::ListByOwner { owner_id: 1 }, Expect::Unauthenticated)]
#[case(Some(OTHER), Operation::ListByOwner { owner_id: 1 }, Expect::Forbidden)]
#[case(Some(OWNER), Operation::ListByOwner { owner_id: 1 }, Expect::Allow)]
#[case(Some(ADMIN), Operation::ListByOwner { owner_id: 1 }, Expect::Forbidden)]
#[case(Some(ADMIN), Operation::ListByOwner { owner_id: 2 }, Expect::Allow)]
// Create.
#[case(None, Operation::CreateMarker, Expect::Unauthenticated)]
#[case(Some(OTHER), Operation::CreateMarker, Expect::Allow)]
#[case(Some(ADMIN), Operation::CreateMarker, Expect::Allow)]
// Delete: owner or admin.
#[case(None, Operation::DeleteMarker { owner_id: 1 }, Expect::Unauthenticated)]
#[case(Some(OTHER), Operation::DeleteMarker { owner_id: 1 }, Expect::Forbidden)]
#[case(Some(OWNER), Operation::DeleteMarker { owner_id: 1 }, Expect::Allow)]
#[case(Some(ADMIN), Operation::DeleteMarker { owner_id: 1 }, Expect::Allow)]
// Approve / reject: admin only, ownership irrelevant.
#[case(None, Operation::ApproveMarker, Expect::Unauthenticated)]
#[case(Some(OWNER), Operation::ApproveMarker, Expect::Forbidden)]
#[case(Some(ADMIN), Operation::ApproveMarker, Expect::Allow)]
#[case(None, Operation::RejectMarker, Expect::Unauthenticated)]
#[case(Some(OWNER), Operation::RejectMarker, Expect::Forbidden)]
#[case(Some(ADMIN), Operation::RejectMarker, Expect::Allow)]
fn test_decision_table(
    #[case] caller: Option<AuthUser>,
    #[case] operation: Operation,
    #[case] expected: Expect,
) {
    assert_eq!(outcome(caller, operation), expected, "{caller:?} {operation:?}");
}

#[test]
fn test_may_delete() {
    assert!(may_delete(1, false, 1));
    assert!(may_delete(2, true, 1));
    assert!(!may_delete(3, false, 1));
}

#[test]
fn test_require_identity() {
    assert_eq!(require_identity(None), Err(AccessDenied::Unauthenticated));
    assert_eq!(require_identity(Some(&OWNER)), Ok(&OWNER));
}

#[test]
fn test_forbidden_reason_is_readable() {
    let denied = authorize(Some(&OTHER), Operation::ApproveMarker).unwrap_err();
    assert_eq!(denied.to_string(), "admin role required");
    assert_eq!(
        AccessDenied::Unauthenticated.to_string(),
        "authentication required"
    );
}
