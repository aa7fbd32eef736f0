use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::geo::{Coordinates, GeoError};

pub type UserId = i64;
pub type MarkerId = i64;

/// Longest free-text description accepted on a report, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical account record from the `users` table. The password hash never
/// leaves the server: the struct is not serializable and its `Debug` output
/// redacts the hash. Public views go through `UserProfile`.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: UserId,
    // Unique, case-sensitive.
    pub username: String,
    // Argon2id PHC string.
    pub password_hash: String,
    pub is_admin: bool,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

/// Category
///
/// The fixed set of road conditions a report can describe. Stored and sent
/// over the wire as the lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Good,
    Medium,
    Bad,
    Snow,
    Ice,
    Closed,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Good,
        Category::Medium,
        Category::Bad,
        Category::Snow,
        Category::Ice,
        Category::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Good => "good",
            Category::Medium => "medium",
            Category::Bad => "bad",
            Category::Snow => "snow",
            Category::Ice => "ice",
            Category::Closed => "closed",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown road condition category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

// Used by sqlx to decode the `type` TEXT column.
impl TryFrom<String> for Category {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Marker
///
/// A single road-condition report from the `markers` table.
///
/// Everything except `approved` is fixed at creation. A marker is visible to
/// anonymous readers only once `approved` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Marker {
    pub id: MarkerId,
    // FK to users.id (the reporter).
    pub user_id: UserId,
    pub lat: f64,
    pub lng: f64,

    /// `type` is a reserved keyword in Rust; the column and the JSON key keep
    /// the short name.
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub category: Category,

    pub description: Option<String>,
    pub approved: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// --- Request Payloads (Input Schemas) ---

/// CreateMarkerRequest
///
/// Input payload for reporting a road condition (POST /api/markers).
/// The category arrives as free text so an unknown value is reported as a
/// validation failure rather than a body deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateMarkerRequest {
    #[schema(example = 50.0)]
    pub lat: f64,
    #[schema(example = 14.0)]
    pub lng: f64,
    #[serde(rename = "type")]
    #[schema(example = "ice")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkerValidationError {
    #[error(transparent)]
    Position(#[from] GeoError),
    #[error(transparent)]
    Category(#[from] UnknownCategory),
    #[error("description is longer than {MAX_DESCRIPTION_CHARS} characters")]
    DescriptionTooLong,
}

/// NewMarker
///
/// A create request that passed validation. The store only accepts this type,
/// so nothing unvalidated can be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarker {
    pub position: Coordinates,
    pub category: Category,
    pub description: Option<String>,
}

impl TryFrom<CreateMarkerRequest> for NewMarker {
    type Error = MarkerValidationError;

    fn try_from(req: CreateMarkerRequest) -> Result<Self, Self::Error> {
        let position = Coordinates::new(req.lat, req.lng)?;
        let category = req.category.parse::<Category>()?;

        // Blank descriptions are stored as absent.
        let description = req
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if description
            .as_ref()
            .is_some_and(|text| text.chars().count() > MAX_DESCRIPTION_CHARS)
        {
            return Err(MarkerValidationError::DescriptionTooLong);
        }

        Ok(Self {
            position,
            category,
            description,
        })
    }
}

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /api/auth/register).
/// The password is hashed immediately and never persisted or logged in clear.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// --- Output Schemas ---

/// LoginResponse
///
/// Bearer token plus enough of the profile for the client to render role-aware UI.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

/// UserProfile
///
/// The public view of a `User`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}
