use crate::{
    access,
    geo::{BoundingBox, Coordinates, LongitudeSpan},
    models::{Marker, MarkerId, NewMarker, User, UserId},
    moderation::{Effect, ModerationState, Transition},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The referenced marker does not exist (or, for `remove_pending`, is not pending).
    #[error("not found")]
    NotFound,

    /// Delete attempted by someone who is neither the owner nor an admin.
    #[error("requester does not own this marker")]
    NotOwner,

    #[error("user {0} does not exist")]
    UnknownOwner(UserId),

    /// Unique constraint violation (e.g. username).
    #[error("{0}")]
    Conflict(String),
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, so handlers and
/// services never know whether they talk to PostgreSQL or the in-process store.
///
/// Every mutating method is a single atomic operation against the backend. Two
/// concurrent calls on the same marker are ordered by the backend; the loser
/// sees `NotFound` or the post-transition state, never a half-applied record.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    // Unique violation on `username` yields `Conflict`.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, RepositoryError>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    // --- Marker lifecycle ---
    // New markers are always pending and stamped with the current time.
    async fn create_marker(
        &self,
        owner_id: UserId,
        marker: NewMarker,
    ) -> Result<Marker, RepositoryError>;
    async fn get_marker(&self, id: MarkerId) -> Result<Marker, RepositoryError>;
    // Owner-or-admin delete, from any state. The ownership check and the delete happen together.
    async fn delete_marker(
        &self,
        id: MarkerId,
        requester_id: UserId,
        requester_is_admin: bool,
    ) -> Result<(), RepositoryError>;
    // Deletes only if the marker is still pending. No authorization check.
    async fn remove_pending(&self, id: MarkerId) -> Result<(), RepositoryError>;
    // Idempotent. No authorization check: callers must have verified the admin role.
    async fn set_approved(&self, id: MarkerId, approved: bool) -> Result<Marker, RepositoryError>;

    // --- Marker queries ---
    // Insertion order.
    async fn list_approved(&self) -> Result<Vec<Marker>, RepositoryError>;
    // Insertion order, i.e. oldest submission first.
    async fn list_pending(&self) -> Result<Vec<Marker>, RepositoryError>;
    // All states, most recent first (created_at DESC, then id DESC).
    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Marker>, RepositoryError>;
    // Approved markers inside the box; the caller applies the exact distance filter.
    async fn list_approved_within(
        &self,
        bbox: &BoundingBox,
    ) -> Result<Vec<Marker>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, password_hash, is_admin)
               VALUES ($1, $2, $3)
               RETURNING id, username, password_hash, is_admin"#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("username `{username}` is already taken"))
            }
            _ => RepositoryError::Database(e),
        })
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_admin FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_admin FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_marker
    ///
    /// Inserts a new report. `approved` and `created_at` come from the column
    /// defaults (false / NOW()), so every new marker starts pending.
    async fn create_marker(
        &self,
        owner_id: UserId,
        marker: NewMarker,
    ) -> Result<Marker, RepositoryError> {
        sqlx::query_as::<_, Marker>(
            r#"INSERT INTO markers (user_id, lat, lng, type, description)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, user_id, lat, lng, type, description, approved, created_at"#,
        )
        .bind(owner_id)
        .bind(marker.position.lat())
        .bind(marker.position.lng())
        .bind(marker.category.as_str())
        .bind(marker.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                RepositoryError::UnknownOwner(owner_id)
            }
            _ => RepositoryError::Database(e),
        })
    }

    async fn get_marker(&self, id: MarkerId) -> Result<Marker, RepositoryError> {
        sqlx::query_as::<_, Marker>(
            r#"SELECT id, user_id, lat, lng, type, description, approved, created_at
               FROM markers
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// delete_marker
    ///
    /// The owner-or-admin rule lives in the WHERE clause so the check and the
    /// delete are one statement. When nothing was deleted, a follow-up existence
    /// probe only decides which error to report.
    async fn delete_marker(
        &self,
        id: MarkerId,
        requester_id: UserId,
        requester_is_admin: bool,
    ) -> Result<(), RepositoryError> {
        let deleted = sqlx::query_scalar::<_, i64>(
            "DELETE FROM markers WHERE id = $1 AND (user_id = $2 OR $3) RETURNING id",
        )
        .bind(id)
        .bind(requester_id)
        .bind(requester_is_admin)
        .fetch_optional(&self.pool)
        .await?;

        if deleted.is_some() {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM markers WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Err(RepositoryError::NotOwner)
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn remove_pending(&self, id: MarkerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM markers WHERE id = $1 AND approved = false")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn set_approved(&self, id: MarkerId, approved: bool) -> Result<Marker, RepositoryError> {
        sqlx::query_as::<_, Marker>(
            r#"UPDATE markers SET approved = $2
               WHERE id = $1
               RETURNING id, user_id, lat, lng, type, description, approved, created_at"#,
        )
        .bind(id)
        .bind(approved)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn list_approved(&self) -> Result<Vec<Marker>, RepositoryError> {
        let markers = sqlx::query_as::<_, Marker>(
            r#"SELECT id, user_id, lat, lng, type, description, approved, created_at
               FROM markers
               WHERE approved = true
               ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(markers)
    }

    async fn list_pending(&self) -> Result<Vec<Marker>, RepositoryError> {
        let markers = sqlx::query_as::<_, Marker>(
            r#"SELECT id, user_id, lat, lng, type, description, approved, created_at
               FROM markers
               WHERE approved = false
               ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(markers)
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Marker>, RepositoryError> {
        let markers = sqlx::query_as::<_, Marker>(
            r#"SELECT id, user_id, lat, lng, type, description, approved, created_at
               FROM markers
               WHERE user_id = $1
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(markers)
    }

    /// list_approved_within
    ///
    /// Pushes the bounding box down into SQL using QueryBuilder for safe
    /// parameterization. The `(approved, lat, lng)` index serves this query.
    async fn list_approved_within(
        &self,
        bbox: &BoundingBox,
    ) -> Result<Vec<Marker>, RepositoryError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT id, user_id, lat, lng, type, description, approved, created_at
            FROM markers
            WHERE approved = true AND lat BETWEEN "#,
        );
        builder
            .push_bind(bbox.min_lat)
            .push(" AND ")
            .push_bind(bbox.max_lat);

        match bbox.lng {
            LongitudeSpan::Full => {}
            LongitudeSpan::Range { min, max } => {
                builder
                    .push(" AND lng BETWEEN ")
                    .push_bind(min)
                    .push(" AND ")
                    .push_bind(max);
            }
            LongitudeSpan::Wrapped { min, max } => {
                builder
                    .push(" AND (lng >= ")
                    .push_bind(min)
                    .push(" OR lng <= ")
                    .push_bind(max)
                    .push(")");
            }
        }

        builder.push(" ORDER BY id");

        let markers = builder
            .build_query_as::<Marker>()
            .fetch_all(&self.pool)
            .await?;
        Ok(markers)
    }
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    // Keyed by id, so iteration is insertion order.
    markers: BTreeMap<MarkerId, Marker>,
    last_user_id: UserId,
    last_marker_id: MarkerId,
}

/// InMemoryRepository
///
/// Process-local store used when no `DATABASE_URL` is configured in local
/// development, and by the test suite. Each trait method runs inside one lock
/// critical section, which gives the same per-operation atomicity the
/// PostgreSQL statements provide. Data is lost on restart.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(RepositoryError::Conflict(format!(
                "username `{username}` is already taken"
            )));
        }

        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_admin,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_marker(
        &self,
        owner_id: UserId,
        marker: NewMarker,
    ) -> Result<Marker, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&owner_id) {
            return Err(RepositoryError::UnknownOwner(owner_id));
        }

        tables.last_marker_id += 1;
        let created = Marker {
            id: tables.last_marker_id,
            user_id: owner_id,
            lat: marker.position.lat(),
            lng: marker.position.lng(),
            category: marker.category,
            description: marker.description,
            approved: false,
            created_at: Utc::now(),
        };
        tables.markers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_marker(&self, id: MarkerId) -> Result<Marker, RepositoryError> {
        self.tables
            .read()
            .await
            .markers
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_marker(
        &self,
        id: MarkerId,
        requester_id: UserId,
        requester_is_admin: bool,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let marker = tables.markers.get(&id).ok_or(RepositoryError::NotFound)?;

        if !access::may_delete(requester_id, requester_is_admin, marker.user_id) {
            return Err(RepositoryError::NotOwner);
        }

        // Withdrawal is valid from every state.
        if let Ok(Effect::Remove) = ModerationState::of(marker).apply(Transition::Withdraw) {
            tables.markers.remove(&id);
        }
        Ok(())
    }

    async fn remove_pending(&self, id: MarkerId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let marker = tables.markers.get(&id).ok_or(RepositoryError::NotFound)?;

        match ModerationState::of(marker).apply(Transition::Reject) {
            Ok(Effect::Remove) => {
                tables.markers.remove(&id);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    async fn set_approved(&self, id: MarkerId, approved: bool) -> Result<Marker, RepositoryError> {
        let mut tables = self.tables.write().await;
        let marker = tables.markers.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        marker.approved = approved;
        Ok(marker.clone())
    }

    async fn list_approved(&self) -> Result<Vec<Marker>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.markers.values().filter(|m| m.approved).cloned().collect())
    }

    async fn list_pending(&self) -> Result<Vec<Marker>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.markers.values().filter(|m| !m.approved).cloned().collect())
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Marker>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut markers: Vec<Marker> = tables
            .markers
            .values()
            .filter(|m| m.user_id == owner_id)
            .cloned()
            .collect();
        markers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(markers)
    }

    async fn list_approved_within(
        &self,
        bbox: &BoundingBox,
    ) -> Result<Vec<Marker>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .markers
            .values()
            .filter(|m| m.approved)
            .filter(|m| Coordinates::new(m.lat, m.lng).is_ok_and(|p| bbox.contains(p)))
            .cloned()
            .collect())
    }
}
