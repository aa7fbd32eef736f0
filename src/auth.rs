use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::{User, UserId},
    repository::RepositoryState,
};

/// Header accepted in `Env::Local` in place of a bearer token.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the HS256 JSON Web Tokens issued at login and validated on every
/// authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id.
    pub sub: UserId,
    pub username: String,
    /// Issued At (iat), seconds since the epoch.
    pub iat: u64,
    /// Expiration Time (exp): the token is rejected after this instant.
    pub exp: u64,
}

/// AuthUser
///
/// The verified identity claims of a request: who the caller is and whether
/// they hold the admin role. Handlers pass it explicitly into every service
/// operation; authorization decisions are pure functions of this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub is_admin: bool,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            is_admin: user.is_admin,
        }
    }
}

/// issue_token
///
/// Signs a token for `user` that expires `ttl_secs` from now.
pub fn issue_token(user: &User, secret: &str, ttl_secs: u64) -> Result<String, AppError> {
    let now = get_current_timestamp();
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        iat: now,
        exp: now + ttl_secs,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument, separating authentication
/// from the business logic in the handler.
///
/// 1. Dependency Resolution: repository and config from the application state.
/// 2. Local Bypass: `x-user-id` naming an existing user, only in `Env::Local`.
/// 3. Token Validation: `Authorization: Bearer <jwt>`, signature and `exp`.
/// 4. Store Lookup: the account must still exist; the admin flag is read here,
///    once, and then travels with the identity.
///
/// Rejection: `AppError::Unauthorized` (401) on any authentication failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get(DEV_USER_HEADER) {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = id_str.parse::<UserId>() {
                        if let Some(user) = repo.get_user(user_id).await? {
                            return Ok(AuthUser::from(&user));
                        }
                    }
                }
            }
        }
        // Production, or the bypass header was absent/unknown: fall through to
        // standard token validation.

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                _ => "invalid token",
            };
            tracing::debug!(error = ?e.kind(), "rejected bearer token");
            AppError::Unauthorized(reason.to_string())
        })?;

        // The token may outlive the account it was issued for.
        let user = repo
            .get_user(token_data.claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_string()))?;

        Ok(AuthUser::from(&user))
    }
}
