//! Unified error handling for the HTTP surface.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{
    access::AccessDenied,
    config::ConfigError,
    forecast::ForecastError,
    geo::GeoError,
    models::MarkerValidationError,
    moderation::InvalidTransition,
    repository::RepositoryError,
};

/// Application-level error type.
///
/// Every failure a caller can see falls into one of these kinds, so the
/// presentation layer can tell "invalid input", "please log in", "not
/// permitted" and "not found" apart.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input: coordinates out of range, unknown category, bad radius.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Identity missing or invalid (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Identity present but role or ownership insufficient (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The request clashes with current state (taken username, rejecting an approved marker).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An external collaborator failed.
    #[error("upstream service failed: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "internal server error".to_string()
            }
            Self::Upstream(_) => {
                tracing::warn!(error = %self, "upstream request failed");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<GeoError> for AppError {
    fn from(err: GeoError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<MarkerValidationError> for AppError {
    fn from(err: MarkerValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<AccessDenied> for AppError {
    fn from(err: AccessDenied) -> Self {
        match err {
            AccessDenied::Unauthenticated => Self::Unauthorized(err.to_string()),
            AccessDenied::Forbidden(reason) => Self::Forbidden(reason.to_string()),
        }
    }
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        Self::Conflict(err.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("marker".to_string()),
            RepositoryError::NotOwner => {
                Self::Forbidden("only the owner may delete this marker".to_string())
            }
            // The identity outlived its account.
            RepositoryError::UnknownOwner(id) => {
                Self::Unauthorized(format!("user {id} does not exist"))
            }
            RepositoryError::Conflict(reason) => Self::Conflict(reason),
            RepositoryError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

// Extractor failures answer like any other invalid input: 400 with a JSON body.
impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Internal(err.to_string())
    }
}
