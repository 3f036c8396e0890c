use thiserror::Error;

use crate::{
    config::ConfigError, frame::FrameError, io::sink::SinkError, providers::ProviderError,
    scheduler::ScheduleError,
};

/// The unified error type for the `solar_data_ingestor` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A run was refused by the quota pre-flight or cancelled.
    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    /// An error originating from a data provider outside of a scheduled run.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// An error originating from a data sink (e.g., file I/O).
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// A frame did not have the shape an operation needs.
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// An error related to configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The caller passed something the entry function cannot work with.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A generic I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
