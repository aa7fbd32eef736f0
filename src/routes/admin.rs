use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Admin Router Module
///
/// The moderation queue. Nested under `/api/admin` behind the authentication
/// layer; each operation then requires the admin flag carried in the identity
/// and answers 403 without it.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/pending
        // Pending reports, oldest first.
        .route("/pending", get(handlers::list_pending))
        // POST /api/admin/approve/{id}
        // Pending -> Approved. Idempotent.
        .route("/approve/{id}", post(handlers::approve_marker))
        // DELETE /api/admin/reject/{id}
        // Pending -> removed. An approved marker cannot be rejected (409).
        .route("/reject/{id}", delete(handlers::reject_marker))
}
