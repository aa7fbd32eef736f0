use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints accessible to any client, anonymous or logged-in. Marker reads here
/// only ever return approved markers; the visibility rule lives in the marker
/// service, not in the router.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and container orchestration.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/register
        // Creates a regular account with an Argon2id password hash.
        .route("/api/auth/register", post(handlers::register))
        // POST /api/auth/login
        // Issues an HS256 bearer token.
        .route("/api/auth/login", post(handlers::login))
        // GET /api/markers
        // All approved markers for the map.
        .route("/api/markers", get(handlers::list_markers))
        // GET /api/markers/search?lat=..&lng=..&radius=..
        // Radius search: bounding-box prefilter, then exact haversine distance.
        .route("/api/markers/search", get(handlers::search_markers))
        // GET /api/weather?lat=..&lng=..
        // Forecast pass-through to the configured weather service.
        .route("/api/weather", get(handlers::get_weather))
}
