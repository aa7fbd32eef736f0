use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;

use crate::geo::Coordinates;

const CURRENT_FIELDS: &str = "temperature_2m,weather_code,wind_speed_10m";
const HOURLY_FIELDS: &str = "temperature_2m,precipitation_probability,wind_speed_10m";
const FORECAST_DAYS: &str = "2";

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("forecast request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("forecast service answered with status {0}")]
    Status(u16),
}

// 1. ForecastService Contract
/// ForecastService
///
/// Abstracts the weather collaborator so the `/api/weather` handler can be
/// tested against a mock instead of the live Open-Meteo API.
#[async_trait]
pub trait ForecastService: Send + Sync {
    /// Current conditions plus an hourly forecast for `position`, returned as the
    /// collaborator's JSON document, untouched.
    async fn hourly_forecast(&self, position: Coordinates) -> Result<Value, ForecastError>;
}

// 2. The Real Implementation (Open-Meteo)
/// OpenMeteoClient
///
/// Thin `reqwest` wrapper around the Open-Meteo forecast endpoint. The
/// `reqwest::Client` is cloned cheaply and reuses its connection pool.
#[derive(Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl ForecastService for OpenMeteoClient {
    async fn hourly_forecast(&self, position: Coordinates) -> Result<Value, ForecastError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", position.lat().to_string()),
                ("longitude", position.lng().to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForecastError::Status(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockForecastService
///
/// Returns a small canned document echoing the requested position, or a
/// simulated upstream failure.
#[derive(Clone, Default)]
pub struct MockForecastService {
    /// When true, every call fails as if the collaborator returned 503.
    pub should_fail: bool,
}

impl MockForecastService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl ForecastService for MockForecastService {
    async fn hourly_forecast(&self, position: Coordinates) -> Result<Value, ForecastError> {
        if self.should_fail {
            return Err(ForecastError::Status(503));
        }

        Ok(json!({
            "latitude": position.lat(),
            "longitude": position.lng(),
            "current": { "temperature_2m": -2.5, "weather_code": 71, "wind_speed_10m": 12.0 },
            "hourly": {
                "time": ["2025-01-01T00:00", "2025-01-01T01:00"],
                "temperature_2m": [-2.5, -3.1],
                "precipitation_probability": [80, 65],
                "wind_speed_10m": [12.0, 10.4]
            }
        }))
    }
}

/// ForecastState
///
/// The shared handle to the forecast collaborator held in the application state.
pub type ForecastState = Arc<dyn ForecastService>;
