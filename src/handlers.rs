use crate::{
    AppState,
    accounts::AccountService,
    auth::AuthUser,
    error::AppError,
    geo::Coordinates,
    models::{
        CreateMarkerRequest, LoginRequest, LoginResponse, Marker, MarkerId, RegisterRequest, UserId,
        UserProfile,
    },
    nearby::DEFAULT_RADIUS_KM,
    service::MarkerService,
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;

// --- Query Structs ---

/// SearchQuery
///
/// Query parameters of the radius search (GET /api/markers/search).
/// `lat` and `lng` are required; `radius` is in kilometres and defaults to 10.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

/// WeatherQuery
///
/// Position for the forecast proxy (GET /api/weather).
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

fn required(value: Option<f64>, name: &str) -> Result<f64, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("query parameter `{name}` is required")))
}

// Body, query and path extractors are taken as `Result` so that malformed input
// goes through `AppError` (400 + JSON) instead of axum's plain-text rejection.

// --- Accounts ---

/// register
///
/// [Public Route] Creates a regular account. Admin accounts are only ever
/// created by the startup bootstrap.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserProfile),
        (status = 400, description = "Username or password too short"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let Json(payload) = payload?;
    let user = AccountService::new(state.repo.as_ref())
        .register(&payload.username, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// login
///
/// [Public Route] Exchanges username and password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let response = AccountService::new(state.repo.as_ref())
        .login(&payload.username, &payload.password, &state.config)
        .await?;
    Ok(Json(response))
}

// --- Markers ---

/// list_markers
///
/// [Public Route] All approved markers, in submission order. Pending reports
/// are never included.
#[utoipa::path(
    get,
    path = "/api/markers",
    responses((status = 200, description = "Approved markers", body = [Marker]))
)]
pub async fn list_markers(State(state): State<AppState>) -> Result<Json<Vec<Marker>>, AppError> {
    let markers = MarkerService::new(state.repo.as_ref())
        .list_public_markers()
        .await?;
    Ok(Json(markers))
}

/// search_markers
///
/// [Public Route] Approved markers within `radius` km of (`lat`, `lng`).
#[utoipa::path(
    get,
    path = "/api/markers/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Approved markers inside the radius", body = [Marker]),
        (status = 400, description = "Missing or out-of-range position, or non-positive radius")
    )
)]
pub async fn search_markers(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Marker>>, AppError> {
    let Query(query) = query?;
    let lat = required(query.lat, "lat")?;
    let lng = required(query.lng, "lng")?;
    let radius = query.radius.unwrap_or(DEFAULT_RADIUS_KM);

    let markers = MarkerService::new(state.repo.as_ref())
        .query_near(lat, lng, radius)
        .await?;
    Ok(Json(markers))
}

/// create_marker
///
/// [Authenticated Route] Submits a road-condition report. The new marker is
/// pending until an admin approves it.
#[utoipa::path(
    post,
    path = "/api/markers",
    request_body = CreateMarkerRequest,
    responses(
        (status = 201, description = "Marker created (pending)", body = Marker),
        (status = 400, description = "Invalid position, category or description"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_marker(
    auth_user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateMarkerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Marker>), AppError> {
    let Json(payload) = payload?;
    let marker = MarkerService::new(state.repo.as_ref())
        .create_marker(Some(&auth_user), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(marker)))
}

/// delete_marker
///
/// [Authenticated Route] Removes a marker in any state.
///
/// *Authorization*: owner, or admin override.
#[utoipa::path(
    delete,
    path = "/api/markers/{id}",
    params(("id" = i64, Path, description = "Marker id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_marker(
    auth_user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<MarkerId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    MarkerService::new(state.repo.as_ref())
        .delete_marker(Some(&auth_user), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// list_user_markers
///
/// [Authenticated Route] A user's own reports, pending included, newest first.
/// Only the user themselves may list them.
#[utoipa::path(
    get,
    path = "/api/users/{id}/markers",
    params(("id" = i64, Path, description = "Owner user id")),
    responses(
        (status = 200, description = "Markers of the user", body = [Marker]),
        (status = 403, description = "Not your markers")
    )
)]
pub async fn list_user_markers(
    auth_user: AuthUser,
    State(state): State<AppState>,
    owner_id: Result<Path<UserId>, PathRejection>,
) -> Result<Json<Vec<Marker>>, AppError> {
    let Path(owner_id) = owner_id?;
    let markers = MarkerService::new(state.repo.as_ref())
        .list_markers_by_owner(Some(&auth_user), owner_id)
        .await?;
    Ok(Json(markers))
}

// --- Moderation ---

/// list_pending
///
/// [Admin Route] The moderation queue, oldest submission first.
#[utoipa::path(
    get,
    path = "/api/admin/pending",
    responses(
        (status = 200, description = "Pending markers", body = [Marker]),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_pending(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Marker>>, AppError> {
    let markers = MarkerService::new(state.repo.as_ref())
        .list_pending_markers(Some(&auth_user))
        .await?;
    Ok(Json(markers))
}

/// approve_marker
///
/// [Admin Route] Publishes a pending marker. Approving twice is harmless.
#[utoipa::path(
    post,
    path = "/api/admin/approve/{id}",
    params(("id" = i64, Path, description = "Marker id")),
    responses(
        (status = 200, description = "Approved", body = Marker),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn approve_marker(
    auth_user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<MarkerId>, PathRejection>,
) -> Result<Json<Marker>, AppError> {
    let Path(id) = id?;
    let marker = MarkerService::new(state.repo.as_ref())
        .approve_marker(Some(&auth_user), id)
        .await?;
    Ok(Json(marker))
}

/// reject_marker
///
/// [Admin Route] Discards a pending marker.
///
/// An approved marker cannot be rejected: the call answers 409 and the marker
/// stays public. Remove it with `DELETE /api/markers/{id}` instead.
#[utoipa::path(
    delete,
    path = "/api/admin/reject/{id}",
    params(("id" = i64, Path, description = "Marker id")),
    responses(
        (status = 204, description = "Rejected and removed"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Already approved; use DELETE /api/markers/{id}")
    )
)]
pub async fn reject_marker(
    auth_user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<MarkerId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    MarkerService::new(state.repo.as_ref())
        .reject_marker(Some(&auth_user), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Weather ---

/// get_weather
///
/// [Public Route] Proxies the current conditions and a two-day hourly forecast
/// for a position. The upstream JSON is returned as-is.
#[utoipa::path(
    get,
    path = "/api/weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Upstream forecast document", body = serde_json::Value),
        (status = 400, description = "Missing or out-of-range position"),
        (status = 502, description = "Forecast service failed")
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(query) = query?;
    let position = Coordinates::new(required(query.lat, "lat")?, required(query.lng, "lng")?)?;
    let forecast = state.forecast.hourly_forecast(position).await?;
    Ok(Json(forecast))
}
