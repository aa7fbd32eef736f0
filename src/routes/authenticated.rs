use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Routes for any user holding a valid identity. The layer above this router
/// rejects anonymous requests with 401 before a handler runs; ownership checks
/// (403) happen in the marker service with the identity the handler passes in.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/markers
        // Submits a report. It starts pending and is hidden from the public map.
        // GET on the same path is public and lives in the public router.
        .route("/api/markers", post(handlers::create_marker))
        // DELETE /api/markers/{id}
        // Owner withdrawal from any state; admins may delete any marker.
        .route("/api/markers/{id}", delete(handlers::delete_marker))
        // GET /api/users/{id}/markers
        // "My reports": every state, newest first, only for the user themselves.
        .route("/api/users/{id}/markers", get(handlers::list_user_markers))
}
