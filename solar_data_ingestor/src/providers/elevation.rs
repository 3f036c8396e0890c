//! Open-Elevation batch lookup.
//!
//! One call takes any number of `lat,lon` pairs joined by `|` and answers with
//! one elevation per pair, in request order. Results are matched back to the
//! requesting ids and their coordinates are checked, so an answer that lost or
//! reordered a point is rejected rather than misattributed.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::LocationId,
    providers::{
        ClientBuildSnafu, DecodeSnafu, ProviderError, ProviderInitError, ReqwestSnafu, ValidationSnafu,
        ensure_success,
    },
};

pub const LOOKUP_URL: &str = "https://api.open-elevation.com/api/v1/lookup";

/// Max coordinate drift, in degrees, tolerated between a point and its result.
const MATCH_TOLERANCE_DEG: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct ElevationPoint {
    pub id: LocationId,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize, Debug)]
struct LookupResponse {
    results: Vec<LookupResult>,
}

#[derive(Deserialize, Debug)]
struct LookupResult {
    latitude: f64,
    longitude: f64,
    elevation: f64,
}

pub struct ElevationProvider {
    client: Client,
    url: String,
}

impl ElevationProvider {
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::with_url(LOOKUP_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context(ClientBuildSnafu)?;
        Ok(Self { client, url: url.into() })
    }

    /// Elevation in metres for every point, tagged with the point's id.
    pub async fn lookup(&self, points: &[ElevationPoint]) -> Result<Vec<(LocationId, f64)>, ProviderError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }
        let locations = locations_param(points);
        debug!(points = points.len(), "Elevation lookup");

        let response = self
            .client
            .get(&self.url)
            .query(&[("locations", locations)])
            .send()
            .await
            .context(ReqwestSnafu)?;
        let body: LookupResponse = ensure_success(response).await?.json().await.context(ReqwestSnafu)?;
        associate(points, body.results)
    }
}

fn locations_param(points: &[ElevationPoint]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.latitude, p.longitude))
        .collect::<Vec<_>>()
        .join("|")
}

fn associate(points: &[ElevationPoint], results: Vec<LookupResult>) -> Result<Vec<(LocationId, f64)>, ProviderError> {
    if results.len() != points.len() {
        return DecodeSnafu {
            message: format!("asked for {} elevations, got {}", points.len(), results.len()),
        }
        .fail();
    }
    points
        .iter()
        .zip(results)
        .map(|(point, result)| {
            let same = (point.latitude - result.latitude).abs() <= MATCH_TOLERANCE_DEG
                && (point.longitude - result.longitude).abs() <= MATCH_TOLERANCE_DEG;
            if !same {
                return ValidationSnafu {
                    message: format!(
                        "elevation for {} answered for ({}, {})",
                        point.id, result.latitude, result.longitude
                    ),
                }
                .fail();
            }
            Ok((point.id.clone(), result.elevation))
        })
        .collect()
}
