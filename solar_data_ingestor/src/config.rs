//! Ingestion configuration: parsing, validation, and loading.
//!
//! The configuration is a TOML document describing:
//! - where tables are written (`output_dir`),
//! - how each upstream is reached and throttled (`[pvoutput]`, `[open_meteo]`, `[elevation]`),
//! - which locations are dropped from the final dataset (`exclude_locations`).
//!
//! Every field has a default, so an empty document is a valid configuration that
//! talks to the public services with their published limits.
//!
//! Key behaviors:
//! - Unknown keys are rejected at every level.
//! - Validation rejects zero ceilings and a pacing interval longer than a batch wait.
//! - `exclude_locations` accepts integer and string ids and is de-duplicated, order kept.
//!
//! Entrypoints:
//! - Parse + validate from a TOML string: [`load_config_str`]
//! - Parse + validate from a file path: [`load_config_path`]
//!
//! Credentials are not part of this file. They are handed to the PV-Output
//! provider as a [`PvCredentials`] value by whoever builds it.

use std::{collections::HashSet, path::PathBuf, time::Duration};

use chrono::NaiveDate;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    models::LocationId,
    pagination::{PV_OUTPUT_MAX_SPAN_DAYS, WEATHER_MAX_SPAN_DAYS},
    providers::{elevation::LOOKUP_URL, open_meteo::params as open_meteo, pvoutput::params as pvoutput},
    scheduler::{QuotaPolicy, RetryPolicy, Scheduler, retry::DEFAULT_RETRY_STATUSES},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// PV-Output account used to authenticate every request.
#[derive(Debug, Clone)]
pub struct PvCredentials {
    pub system_id: String,
    pub api_key: SecretString,
}

impl PvCredentials {
    pub fn new(system_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            api_key: SecretString::from(api_key.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Directory every table is written to.
    pub output_dir: PathBuf,
    pub pvoutput: PvOutputConfig,
    pub open_meteo: OpenMeteoConfig,
    pub elevation: ElevationConfig,
    /// Locations removed from the combined dataset.
    pub exclude_locations: Vec<LocationId>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            pvoutput: PvOutputConfig::default(),
            open_meteo: OpenMeteoConfig::default(),
            elevation: ElevationConfig::default(),
            exclude_locations: Vec::new(),
        }
    }
}

/// Ceilings and pauses of one upstream, as read from its section.
#[derive(Debug, Clone, PartialEq)]
pub struct Throttle {
    pub per_minute: u64,
    pub per_hour: u64,
    pub batch_wait: Duration,
    /// Min gap between two consecutive calls; zero disables it.
    pub pacing: Duration,
    pub retry: RetryPolicy,
}

impl Throttle {
    pub fn quota(&self) -> QuotaPolicy {
        QuotaPolicy {
            per_minute: self.per_minute,
            per_hour: self.per_hour,
            batch_wait: self.batch_wait,
        }
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.quota(), self.retry.clone()).with_pacing(self.pacing)
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.per_minute == 0 || self.per_hour == 0 {
            return Err(ConfigError::Invalid(format!("{section}: quota ceilings must be positive")));
        }
        if !self.batch_wait.is_zero() && self.pacing > self.batch_wait {
            return Err(ConfigError::Invalid(format!(
                "{section}: pacing_secs ({}) is longer than batch_wait_secs ({})",
                self.pacing.as_secs(),
                self.batch_wait.as_secs()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            retry_statuses: self.statuses.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PvOutputConfig {
    pub base_url: String,
    pub max_span_days: u64,
    pub per_minute: u64,
    pub per_hour: u64,
    pub batch_wait_secs: u64,
    pub pacing_secs: u64,
    pub retry: RetryConfig,
}

impl PvOutputConfig {
    pub fn throttle(&self) -> Throttle {
        Throttle {
            per_minute: self.per_minute,
            per_hour: self.per_hour,
            batch_wait: Duration::from_secs(self.batch_wait_secs),
            pacing: Duration::from_secs(self.pacing_secs),
            retry: self.retry.policy(),
        }
    }
}

impl Default for PvOutputConfig {
    fn default() -> Self {
        // Donor accounts get 300 requests per hour; every call costs 1.
        Self {
            base_url: pvoutput::BASE_URL.to_string(),
            max_span_days: PV_OUTPUT_MAX_SPAN_DAYS,
            per_minute: 300,
            per_hour: 300,
            batch_wait_secs: 60,
            pacing_secs: 0,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenMeteoConfig {
    pub history_url: String,
    pub forecast_url: String,
    /// Timezone forecast days are aligned to.
    pub timezone: String,
    /// Earliest date the history endpoint serves.
    pub history_start: NaiveDate,
    pub max_span_days: u64,
    pub cost_divisor: u64,
    pub per_minute: u64,
    pub per_hour: u64,
    pub batch_wait_secs: u64,
    pub pacing_secs: u64,
    pub retry: RetryConfig,
}

impl OpenMeteoConfig {
    pub fn throttle(&self) -> Throttle {
        Throttle {
            per_minute: self.per_minute,
            per_hour: self.per_hour,
            batch_wait: Duration::from_secs(self.batch_wait_secs),
            pacing: Duration::from_secs(self.pacing_secs),
            retry: self.retry.policy(),
        }
    }
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            history_url: open_meteo::HISTORY_URL.to_string(),
            forecast_url: open_meteo::FORECAST_URL.to_string(),
            timezone: "auto".to_string(),
            history_start: open_meteo::history_start(),
            max_span_days: WEATHER_MAX_SPAN_DAYS,
            cost_divisor: open_meteo::COST_ROW_DIVISOR,
            per_minute: 600,
            per_hour: 5000,
            batch_wait_secs: 60,
            pacing_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElevationConfig {
    pub url: String,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            url: LOOKUP_URL.to_string(),
        }
    }
}

impl IngestConfig {
    /// Checks ceilings and de-duplicates `exclude_locations`, keeping first occurrences.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.pvoutput.throttle().validate("pvoutput")?;
        self.open_meteo.throttle().validate("open_meteo")?;
        if self.open_meteo.cost_divisor == 0 {
            return Err(ConfigError::Invalid("open_meteo: cost_divisor must be positive".into()));
        }

        let mut seen = HashSet::new();
        self.exclude_locations.retain(|id| seen.insert(id.clone()));
        Ok(())
    }
}

/// Parse and validate a configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> Result<IngestConfig, ConfigError> {
    let mut config: IngestConfig = toml::from_str(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// Read a configuration file from disk, parse, and validate it.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> Result<IngestConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_str(&text)
}
