//! Source clients: pagination and scheduling on top of the wire providers.
//!
//! Both clients return an [`Acquired`] value: the records that were fetched
//! plus one [`FailedRequest`] per location or sub-interval that produced
//! nothing, so a partial result is never mistaken for a complete one.

pub mod pv;
pub mod weather;

use std::fmt;

use crate::{
    models::{DateSpan, LocationId},
    scheduler::JobFailure,
};

pub use pv::PvOutputClient;
pub use weather::{CostReport, WeatherClient};

/// Why a location or sub-interval has no data.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The upstream refused the request with its bad-request marker.
    BadRequest(String),
    /// Retries exhausted, or a non-retryable upstream error.
    Upstream { message: String, attempts: u32 },
    /// Nothing to request: no known extent, or nothing left after clamping.
    NoValidRange,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::BadRequest(message) => write!(f, "bad request: {message}"),
            FailureReason::Upstream { message, attempts } => {
                write!(f, "{message} (after {attempts} attempts)")
            }
            FailureReason::NoValidRange => f.write_str("no valid date range"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedRequest {
    pub id: LocationId,
    /// The sub-interval that failed; `None` when the whole location did.
    pub span: Option<DateSpan>,
    pub reason: FailureReason,
}

impl FailedRequest {
    pub(crate) fn from_job<R>(failure: JobFailure<R>, span: Option<DateSpan>) -> Self {
        let reason = if failure.error.is_bad_request() {
            FailureReason::BadRequest(failure.error.to_string())
        } else {
            FailureReason::Upstream {
                message: failure.error.to_string(),
                attempts: failure.attempts,
            }
        };
        Self {
            id: failure.id,
            span,
            reason,
        }
    }
}

/// Records fetched by one client call, and what could not be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquired<T> {
    pub records: Vec<T>,
    pub failures: Vec<FailedRequest>,
}

impl<T> Default for Acquired<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> Acquired<T> {
    /// Every requested location and sub-interval was fetched.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Locations with at least one failure, first occurrence order.
    pub fn failed_ids(&self) -> Vec<&LocationId> {
        let mut ids: Vec<&LocationId> = Vec::new();
        for failure in &self.failures {
            if !ids.contains(&&failure.id) {
                ids.push(&failure.id);
            }
        }
        ids
    }
}
