use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{weather_record::DailyWeather, WeatherDailyRecord},
    providers::{
        ApiSnafu, ClientBuildSnafu, DecodeSnafu, ProviderError, ProviderInitError, ReqwestSnafu, StatusSnafu,
        WeatherProvider, WeatherRequest,
        open_meteo::{
            params::{FORECAST_URL, HISTORY_URL, QueryParams, forecast_params, history_params},
            response::{DailyResponse, ErrorResponse},
        },
    },
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Daily forecast for one coordinate, as returned by the forecast endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// Grid coordinates the service answered for.
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_m: Option<f64>,
    pub days: Vec<(NaiveDate, DailyWeather)>,
}

pub struct OpenMeteoProvider {
    client: Client,
    history_url: String,
    forecast_url: String,
    timezone: String,
}

impl OpenMeteoProvider {
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::with_urls(HISTORY_URL, FORECAST_URL)
    }

    pub fn with_urls(history_url: impl Into<String>, forecast_url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context(ClientBuildSnafu)?;
        Ok(Self {
            client,
            history_url: history_url.into(),
            forecast_url: forecast_url.into(),
            timezone: "auto".to_string(),
        })
    }

    /// Timezone the forecast days are aligned to. Defaults to the location's own.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    async fn get_daily(&self, url: &str, params: &QueryParams) -> Result<DailyResponse, ProviderError> {
        debug!(url = %url, ?params, "Open-Meteo request");
        let response = self.client.get(url).query(params).send().await.context(ReqwestSnafu)?;
        let status = response.status();
        let text = response.text().await.context(ReqwestSnafu)?;

        if !status.is_server_error() {
            if let Ok(refusal) = serde_json::from_str::<ErrorResponse>(&text) {
                if refusal.error {
                    return ApiSnafu { message: refusal.reason }.fail();
                }
            }
        }
        if !status.is_success() {
            return StatusSnafu {
                status: status.as_u16(),
                body: text,
            }
            .fail();
        }

        serde_json::from_str(&text).map_err(|e| {
            DecodeSnafu {
                message: e.to_string(),
            }
            .build()
        })
    }

    /// Daily forecast for the coming days at one coordinate.
    pub async fn fetch_forecast(&self, latitude: f64, longitude: f64) -> Result<Forecast, ProviderError> {
        let response = self
            .get_daily(&self.forecast_url, &forecast_params(latitude, longitude, &self.timezone))
            .await?;
        response.check_coordinates(latitude, longitude)?;
        let (latitude, longitude, elevation_m) = (response.latitude, response.longitude, response.elevation);
        Ok(Forecast {
            latitude,
            longitude,
            elevation_m,
            days: response.into_rows()?,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn daily(&self, request: &WeatherRequest) -> Result<Vec<WeatherDailyRecord>, ProviderError> {
        let response = self.get_daily(&self.history_url, &history_params(request)).await?;
        response.check_coordinates(request.latitude, request.longitude)?;

        Ok(response
            .into_rows()?
            .into_iter()
            .filter(|(date, _)| request.span.contains(*date))
            .map(|(date, weather)| WeatherDailyRecord {
                location_id: request.id.clone(),
                date,
                weather,
            })
            .collect())
    }
}
