use thiserror::Error;

use crate::{auth::AuthUser, models::UserId};

/// Operation
///
/// Every marker operation the service exposes, together with the resource
/// attributes its authorization depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListApproved,
    QueryNear,
    ListPending,
    ListByOwner { owner_id: UserId },
    CreateMarker,
    DeleteMarker { owner_id: UserId },
    ApproveMarker,
    RejectMarker,
}

/// AccessDenied
///
/// The two ways an operation can be refused. They map to different HTTP
/// statuses (401 vs 403) and must stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    /// No identity, or the presented credential did not verify.
    #[error("authentication required")]
    Unauthenticated,
    /// Identity is known but its role or ownership is insufficient.
    #[error("{0}")]
    Forbidden(&'static str),
}

/// authorize
///
/// Pure decision function over `(identity, operation)`. The identity carries the
/// admin flag explicitly; nothing here reads shared state.
pub fn authorize(caller: Option<&AuthUser>, operation: Operation) -> Result<(), AccessDenied> {
    let decision = decide(caller, operation);
    if let Err(denied) = &decision {
        tracing::debug!(?operation, caller = ?caller.map(|c| c.id), %denied, "operation denied");
    }
    decision
}

fn decide(caller: Option<&AuthUser>, operation: Operation) -> Result<(), AccessDenied> {
    // Public reads come first so anonymous callers can reach them.
    if matches!(operation, Operation::ListApproved | Operation::QueryNear) {
        return Ok(());
    }

    let caller = require_identity(caller)?;

    match operation {
        Operation::ListApproved | Operation::QueryNear | Operation::CreateMarker => Ok(()),
        Operation::ListPending | Operation::ApproveMarker | Operation::RejectMarker => {
            if caller.is_admin {
                Ok(())
            } else {
                Err(AccessDenied::Forbidden("admin role required"))
            }
        }
        // Admins get no override here: the listing is "my reports".
        Operation::ListByOwner { owner_id } => {
            if caller.id == owner_id {
                Ok(())
            } else {
                Err(AccessDenied::Forbidden("markers of other users are not listed"))
            }
        }
        Operation::DeleteMarker { owner_id } => {
            if may_delete(caller.id, caller.is_admin, owner_id) {
                Ok(())
            } else {
                Err(AccessDenied::Forbidden("only the owner may delete this marker"))
            }
        }
    }
}

pub fn require_identity(caller: Option<&AuthUser>) -> Result<&AuthUser, AccessDenied> {
    caller.ok_or(AccessDenied::Unauthenticated)
}

/// may_delete
///
/// Ownership-or-admin rule shared by the decision table and by the stores,
/// which re-check it atomically at delete time.
pub fn may_delete(requester_id: UserId, requester_is_admin: bool, owner_id: UserId) -> bool {
    requester_is_admin || requester_id == owner_id
}
