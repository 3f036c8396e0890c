//! Upstream data sources.
//!
//! This module defines the [`PvProvider`] and [`WeatherProvider`] traits, the
//! wire-level seams between the acquisition clients and the HTTP services they
//! read from. Each trait method is one upstream call: scheduling, pagination
//! and retries live above this layer, in [`crate::acquire`] and
//! [`crate::scheduler`].
//!
//! Concrete implementations:
//! - [`pvoutput::PvOutputProvider`] for the PV-Output text API,
//! - [`open_meteo::OpenMeteoProvider`] for the Open-Meteo daily JSON API,
//! - [`elevation::ElevationProvider`] for the Open-Elevation batch lookup.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use solar_data_ingestor::models::{WeatherDailyRecord};
//! use solar_data_ingestor::providers::{ProviderError, WeatherProvider, WeatherRequest};
//!
//! struct NoWeather;
//!
//! #[async_trait]
//! impl WeatherProvider for NoWeather {
//!     async fn daily(
//!         &self,
//!         _request: &WeatherRequest,
//!     ) -> Result<Vec<WeatherDailyRecord>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod elevation;
pub mod open_meteo;
pub mod pvoutput;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{DateSpan, Location, LocationId, PvDailyRecord, WeatherDailyRecord};

/// Read access to a PV monitoring service.
#[async_trait]
pub trait PvProvider: Send + Sync {
    /// Static metadata for one system. The returned location has no extent yet.
    async fn system(&self, id: &LocationId) -> Result<Location, ProviderError>;

    /// First and last dates the system has recorded output for.
    async fn statistic(&self, id: &LocationId) -> Result<DateSpan, ProviderError>;

    /// Daily output rows for one sub-interval, at most one upstream page.
    async fn output(&self, id: &LocationId, span: DateSpan) -> Result<Vec<PvDailyRecord>, ProviderError>;
}

/// One daily-weather query: a location's coordinates and the dates to fetch.
///
/// The id is carried alongside the request so every returned row can be tagged
/// with it, independent of response ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub id: LocationId,
    pub latitude: f64,
    pub longitude: f64,
    pub span: DateSpan,
}

/// Read access to a daily weather service.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Every variable of the daily vocabulary for each date of `request.span`,
    /// tagged with `request.id`.
    async fn daily(&self, request: &WeatherRequest) -> Result<Vec<WeatherDailyRecord>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// API key or system id contains characters not allowed in a header.
    #[snafu(display("Invalid API key format: {source}"))]
    InvalidApiKey {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a provider implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The service answered with a non-success HTTP status.
    #[snafu(display("HTTP {status}: {body}"))]
    Status {
        status: u16,
        body: String,
        backtrace: Backtrace,
    },

    /// The service's own marker for a request it refused to serve.
    #[snafu(display("Bad request: {message}"))]
    BadRequest {
        message: String,
        backtrace: Backtrace,
    },

    /// The provider's API returned a specific error message (e.g., invalid API key).
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The payload did not have the expected shape.
    #[snafu(display("Failed to decode response: {message}"))]
    Decode {
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    /// HTTP status of the failed call, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            ProviderError::Reqwest { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The call never got an answer: connect failure, timeout, dropped request.
    pub fn is_transport(&self) -> bool {
        match self {
            ProviderError::Reqwest { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            _ => false,
        }
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, ProviderError::BadRequest { .. })
    }
}

impl From<ProviderInitError> for ProviderError {
    fn from(source: ProviderInitError) -> Self {
        ProviderError::Init { source }
    }
}

/// `base` and `path` joined with exactly one slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Passes successful responses through; anything else becomes [`ProviderError::Status`].
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown API error".to_string());
    StatusSnafu {
        status: status.as_u16(),
        body,
    }
    .fail()
}
