//! HTTP adapters for the generative-text service and the maps web services.

use std::env;
use std::time::Duration;

use reqwest::{Client, Url};
use thiserror::Error;

use raksha_core::PlacesError;

pub mod directions;
pub mod gemini;
pub mod geocode;
pub mod places;

pub use directions::DirectionsClient;
pub use gemini::{GeminiClient, GeminiConfig};
pub use geocode::GeocodeClient;
pub use places::PlacesClient;

pub const MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
pub const DEFAULT_DIRECTIONS_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(6);

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(reqwest::Error),
    #[error("service returned HTTP {code}")]
    Status { code: u16 },
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Places(#[from] PlacesError),
}

/// Maps services take the key as a query parameter, so the request URL is
/// dropped from every transport error before it can be displayed.
impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

pub(crate) fn transport_message(err: reqwest::Error) -> String {
    err.without_url().to_string()
}

pub fn build_http_client(timeout: Duration) -> Result<Client, RemoteError> {
    Ok(Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()?)
}

pub(crate) fn endpoint(base: &str, path: &str, params: &[(&str, String)]) -> Result<Url, RemoteError> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse_with_params(&raw, params).map_err(|err| RemoteError::InvalidUrl(err.to_string()))
}

pub(crate) fn env_seconds(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Key and endpoint shared by the directions, geocoding and nearby-search clients.
#[derive(Debug, Clone)]
pub struct MapsConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl MapsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: MAPS_BASE_URL.to_string(),
            timeout: DEFAULT_DIRECTIONS_TIMEOUT,
        }
    }

    /// `None` when `RAKSHA_MAPS_API_KEY` is unset or blank.
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("RAKSHA_MAPS_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())?;
        let base_url = env::var("RAKSHA_MAPS_BASE_URL").unwrap_or_else(|_| MAPS_BASE_URL.to_string());

        Some(Self {
            api_key,
            base_url,
            timeout: env_seconds("RAKSHA_DIRECTIONS_TIMEOUT_SECONDS", DEFAULT_DIRECTIONS_TIMEOUT),
        })
    }
}
