//! Postal code geolocation.
//!
//! Resolves a postal code to coordinates and a UTC offset through the
//! OpenWeatherMap current-weather endpoint, the only API that returns both in
//! one call.

use crate::config::GeoConfig;
use crate::models::{GeoLocation, PostalCode};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::error::AppError;
use service_core::observability::TracedRequestExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Unknown postal code: {0}")]
    UnknownPostalCode(String),

    #[error("Lookup API rejected the credentials")]
    Unauthorized,

    #[error("Lookup API returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Lookup API unreachable: {0}")]
    Transport(reqwest::Error),

    #[error("Unexpected lookup response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The request URL carries the API key, so it is dropped from the error.
impl From<reqwest::Error> for GeoError {
    fn from(err: reqwest::Error) -> Self {
        GeoError::Transport(err.without_url())
    }
}

impl GeoError {
    /// Rate limiting, server errors and network failures may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            GeoError::Upstream { status, .. } => *status == 429 || *status >= 500,
            GeoError::Transport(_) => true,
            _ => false,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            GeoError::UnknownPostalCode(_) => "unknown_postal_code",
            GeoError::Unauthorized => "unauthorized",
            GeoError::Upstream { .. } => "upstream_error",
            GeoError::Transport(_) => "transport_error",
            GeoError::Decode(_) => "decode_error",
        }
    }
}

impl From<GeoError> for AppError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::UnknownPostalCode(zip) => {
                AppError::BadRequest(anyhow::anyhow!("Unknown postal code: {}", zip))
            }
            other => {
                tracing::error!(error = %other, "Geolocation lookup failed");
                AppError::BadGateway("geolocation lookup failed".to_string())
            }
        }
    }
}

#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn lookup(&self, zip: &PostalCode) -> Result<GeoLocation, GeoError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Deserialize)]
struct WeatherLookupResponse {
    timezone: i32,
    coord: Coordinates,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherErrorResponse {
    message: String,
}

pub struct OpenWeatherProvider {
    client: Client,
    config: GeoConfig,
}

impl OpenWeatherProvider {
    pub fn new(config: GeoConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn fetch(&self, zip: &PostalCode) -> Result<GeoLocation, GeoError> {
        let url = format!("{}/weather", self.config.api_base_url.trim_end_matches('/'));
        let zip_param = format!(
            "{},{}",
            zip.query_value(&self.config.country_code),
            self.config.country_code
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("zip", zip_param.as_str()),
                ("appid", self.config.api_key.expose_secret().as_str()),
            ])
            .with_trace_context()
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Geolocation lookup response");

        match status {
            s if s.is_success() => {
                let parsed: WeatherLookupResponse = serde_json::from_str(&body)?;
                Ok(GeoLocation {
                    timezone: parsed.timezone,
                    lat: parsed.coord.lat,
                    lon: parsed.coord.lon,
                })
            }
            StatusCode::NOT_FOUND => Err(GeoError::UnknownPostalCode(zip.to_string())),
            StatusCode::UNAUTHORIZED => Err(GeoError::Unauthorized),
            s => {
                let message = serde_json::from_str::<WeatherErrorResponse>(&body)
                    .map(|e| e.message)
                    .unwrap_or(body);
                Err(GeoError::Upstream {
                    status: s.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl GeoProvider for OpenWeatherProvider {
    #[tracing::instrument(skip(self, zip), fields(zip = %zip))]
    async fn lookup(&self, zip: &PostalCode) -> Result<GeoLocation, GeoError> {
        let start = Instant::now();
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(100),
            max_elapsed_time: Some(self.config.retry_max_elapsed),
            ..Default::default()
        };

        let result = retry(backoff, || async {
            self.fetch(zip).await.map_err(|e| {
                if e.is_transient() {
                    tracing::warn!(error = %e, "Transient geolocation failure, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.outcome(),
        };
        metrics::counter!("geo_lookups_total", "outcome" => outcome).increment(1);
        metrics::histogram!("geo_lookup_duration_seconds").record(start.elapsed().as_secs_f64());

        result
    }

    fn name(&self) -> &'static str {
        "openweather"
    }
}

/// Resolves every postal code to the same location. Used when lookups are
/// disabled and in tests.
pub struct MockGeoProvider {
    location: Option<GeoLocation>,
    calls: AtomicU64,
}

impl MockGeoProvider {
    pub fn new(location: GeoLocation) -> Self {
        Self {
            location: Some(location),
            calls: AtomicU64::new(0),
        }
    }

    /// A provider that knows no postal codes at all.
    pub fn unresolvable() -> Self {
        Self {
            location: None,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockGeoProvider {
    fn default() -> Self {
        Self::new(GeoLocation {
            timezone: 0,
            lat: 0.0,
            lon: 0.0,
        })
    }
}

#[async_trait]
impl GeoProvider for MockGeoProvider {
    async fn lookup(&self, zip: &PostalCode) -> Result<GeoLocation, GeoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!(zip = %zip, "Mock geolocation lookup");
        self.location
            .ok_or_else(|| GeoError::UnknownPostalCode(zip.to_string()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
