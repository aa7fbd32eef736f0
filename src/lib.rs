use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain core: positions and distance, moderation lifecycle, access decisions.
pub mod access;
pub mod geo;
pub mod moderation;
pub mod nearby;

// Application services and their collaborators.
pub mod accounts;
pub mod auth;
pub mod config;
pub mod error;
pub mod forecast;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use forecast::{ForecastState, MockForecastService, OpenMeteoClient};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::list_markers,
        handlers::search_markers, handlers::create_marker, handlers::delete_marker,
        handlers::list_user_markers, handlers::list_pending, handlers::approve_marker,
        handlers::reject_marker, handlers::get_weather
    ),
    components(
        schemas(
            models::Marker, models::Category, models::CreateMarkerRequest,
            models::RegisterRequest, models::LoginRequest, models::LoginResponse,
            models::UserProfile,
        )
    ),
    tags(
        (name = "road-watch", description = "Road condition reports API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container for the store, the forecast collaborator and
/// the immutable configuration. Cloned per request; everything inside is an
/// `Arc` or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: PostgreSQL, or the in-process store in local development and tests.
    pub repo: RepositoryState,
    /// Weather forecast collaborator.
    pub forecast: ForecastState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for ForecastState {
    fn from_ref(app_state: &AppState) -> ForecastState {
        app_state.forecast.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless an `AuthUser` can be extracted. Role
/// and ownership are not checked here; the handlers pass the identity on to
/// the marker service, which decides.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies the scoped authentication layer and
/// the global observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/api/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. A UUID `x-request-id` for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. One span per request, carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo the request id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `TraceLayer` span so every log line of a request is correlated by
/// its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
