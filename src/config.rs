use std::env;
use thiserror::Error;

/// Fallback signing secret for local development only.
pub const LOCAL_JWT_SECRET: &str = "road-watch-local-secret";

/// Open-Meteo hourly forecast endpoint.
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Tokens are valid for one day unless `TOKEN_TTL_SECS` says otherwise.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60 * 24;

pub const DEFAULT_PORT: u16 = 3000;

/// AppConfig
///
/// Holds the application's entire configuration. Loaded once at startup,
/// immutable afterwards, and pulled into handlers via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the dev identity bypass and log format.
    pub env: Env,
    // PostgreSQL connection string. `None` (local only) selects the in-process store.
    pub db_url: Option<String>,
    // HS256 secret used to sign and verify bearer tokens.
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub port: u16,
    // Weather forecast collaborator endpoint.
    pub forecast_url: String,
    // Optional admin account created at startup when the username is free.
    pub bootstrap_admin: Option<AdminSeed>,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences
/// (in-process store, `x-user-id` bypass, pretty logs) and production behaviour.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} has an invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking configuration for tests: local mode, in-process store,
    /// fixed secret.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            port: DEFAULT_PORT,
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            bootstrap_admin: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables and fails fast: in
    /// production a missing `DATABASE_URL` or `JWT_SECRET` is an error, so the
    /// service never starts with an incomplete or insecure setup.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = non_empty("DATABASE_URL");
        let jwt_secret = non_empty("JWT_SECRET");

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(db_url.ok_or(ConfigError::Missing("DATABASE_URL"))?),
                jwt_secret.ok_or(ConfigError::Missing("JWT_SECRET"))?,
            ),
            Env::Local => (
                db_url,
                jwt_secret.unwrap_or_else(|| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let bootstrap_admin = match (non_empty("ADMIN_USERNAME"), non_empty("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminSeed { username, password }),
            _ => None,
        };

        Ok(Self {
            env,
            db_url,
            jwt_secret,
            token_ttl_secs: parsed("TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?,
            port: parsed("PORT", DEFAULT_PORT)?,
            forecast_url: non_empty("FORECAST_URL")
                .unwrap_or_else(|| DEFAULT_FORECAST_URL.to_string()),
            bootstrap_admin,
        })
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
