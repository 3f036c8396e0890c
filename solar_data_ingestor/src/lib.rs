//! Acquisition, assembly and cleaning of a daily PV output + weather dataset.
//!
//! The crate reads per-installation daily output from PV-Output and daily
//! weather from Open-Meteo, joins them on (location, date) and prepares the
//! result for modelling. Upstream quotas are planned before any request is
//! sent, see [`scheduler`].

pub mod acquire;
pub mod assemble;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod frame;
pub mod inference;
pub mod io;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod providers;
pub mod scheduler;
pub mod transform;

pub use errors::{Error, Result};
