//! Account registration, password login and the startup admin seed.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::{
    auth::issue_token,
    config::{AdminSeed, AppConfig},
    error::AppError,
    models::{LoginResponse, User},
    repository::{Repository, RepositoryError},
};

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 6;

// Same message for unknown user and wrong password.
const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Account service.
///
/// Owns the credential rules; the repository only ever sees the Argon2id hash.
pub struct AccountService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> AccountService<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// Register a regular (non-admin) account.
    ///
    /// # Errors
    ///
    /// `Validation` for a short username or password, `Conflict` when the
    /// username is taken.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AppError> {
        let username = username.trim();
        validate_credentials(username, password)?;

        let password_hash = hash_password(password)?;
        let user = self.repo.create_user(username, &password_hash, false).await?;

        tracing::info!(user_id = user.id, username = %user.username, "account registered");
        Ok(user)
    }

    /// Verify a password and issue a bearer token.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when the username is unknown or the password is wrong.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        config: &AppConfig,
    ) -> Result<LoginResponse, AppError> {
        let user = self
            .repo
            .get_user_by_username(username.trim())
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        verify_password(password, &user.password_hash)?;

        let token = issue_token(&user, &config.jwt_secret, config.token_ttl_secs)?;
        tracing::debug!(user_id = user.id, "login succeeded");

        Ok(LoginResponse {
            token,
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        })
    }

    /// Create the configured admin account unless the username already exists.
    ///
    /// Returns the created account, or `None` when nothing was done.
    pub async fn bootstrap_admin(&self, seed: &AdminSeed) -> Result<Option<User>, AppError> {
        if let Some(existing) = self.repo.get_user_by_username(&seed.username).await? {
            if !existing.is_admin {
                tracing::warn!(
                    username = %existing.username,
                    "bootstrap admin username belongs to a regular account, skipping"
                );
            }
            return Ok(None);
        }

        validate_credentials(&seed.username, &seed.password)?;
        let password_hash = hash_password(&seed.password)?;

        match self.repo.create_user(&seed.username, &password_hash, true).await {
            Ok(user) => {
                tracing::info!(
                    user_id = user.id,
                    username = %user.username,
                    "bootstrap admin created"
                );
                Ok(Some(user))
            }
            // Lost a race with another instance seeding the same account.
            Err(RepositoryError::Conflict(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_credentials(username: &str, password: &str) -> Result<(), AppError> {
    if username.chars().count() < MIN_USERNAME_LENGTH {
        return Err(AppError::Validation(format!(
            "username must be at least {MIN_USERNAME_LENGTH} characters"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<(), AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))
}
