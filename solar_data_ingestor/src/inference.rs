//! Online preprocessing: a daily forecast for one coordinate turned into the
//! same feature columns the dataset is built with.

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::info;

use crate::{
    errors::Result,
    frame::FrameError,
    models::{DailyWeather, LocationId, location::columns::ELEVATION, weather_record::DATE_COLUMN},
    providers::{
        DecodeSnafu,
        elevation::{ElevationPoint, ElevationProvider},
        open_meteo::{Forecast, OpenMeteoProvider},
    },
    transform::{describe_weather_code, prepare_features},
};

/// Feature rows for the forecast days that survived cleaning.
#[derive(Debug, Clone)]
pub struct ForecastFeatures {
    /// `date`, `Elevation (m)`, the weather variables and the category columns.
    pub table: DataFrame,
    /// Human-readable condition of each row of `table`, from its weather code.
    pub conditions: Vec<Option<&'static str>>,
    /// Grid coordinates the forecast was answered for.
    pub latitude: f64,
    pub longitude: f64,
}

/// Raw forecast frame, before cleaning: one row per day.
pub fn forecast_frame(days: &[(NaiveDate, DailyWeather)], elevation_m: f64) -> Result<DataFrame, FrameError> {
    let mut columns = vec![
        Column::new(DATE_COLUMN.into(), days.iter().map(|(date, _)| *date).collect::<Vec<_>>()),
        Column::new(ELEVATION.into(), vec![elevation_m; days.len()]),
    ];
    columns.extend(DailyWeather::columns(days.iter().map(|(_, weather)| weather)));
    Ok(DataFrame::new(columns)?)
}

/// Cleans and encodes a forecast through the same transform as the offline dataset.
pub fn forecast_features(forecast: &Forecast, elevation_m: f64) -> Result<ForecastFeatures, FrameError> {
    let features = prepare_features(forecast_frame(&forecast.days, elevation_m)?)?;
    let conditions = features
        .weather_codes
        .iter()
        .map(|code| code.and_then(describe_weather_code))
        .collect();

    Ok(ForecastFeatures {
        table: features.frame,
        conditions,
        latitude: forecast.latitude,
        longitude: forecast.longitude,
    })
}

/// Looks up the elevation, fetches the forecast and prepares its features.
pub async fn fetch_forecast_features(
    weather: &OpenMeteoProvider,
    elevation: &ElevationProvider,
    latitude: f64,
    longitude: f64,
) -> Result<ForecastFeatures> {
    let point = ElevationPoint {
        id: LocationId::from(0usize),
        latitude,
        longitude,
    };
    let elevation_m = elevation
        .lookup(std::slice::from_ref(&point))
        .await?
        .into_iter()
        .next()
        .map(|(_, metres)| metres)
        .ok_or_else(|| DecodeSnafu { message: "empty elevation lookup" }.build())?;
    let forecast = weather.fetch_forecast(latitude, longitude).await?;
    let features = forecast_features(&forecast, elevation_m)?;

    info!(
        latitude = features.latitude,
        longitude = features.longitude,
        elevation_m,
        days = features.table.height(),
        "Prepared forecast features"
    );
    Ok(features)
}
