//! Daily weather observations, one row per location per day.

use chrono::NaiveDate;
use polars::prelude::*;

use crate::{
    frame::{FrameError, ToFrame, floats, optional},
    models::location_id::LocationId,
};

/// Key column holding the location id in a weather table.
pub const ID_COLUMN: &str = "id";
/// Key column holding the observation date in a weather table.
pub const DATE_COLUMN: &str = "date";

/// The fixed vocabulary of daily variables, in request order.
///
/// The upstream returns one series per requested variable; the order of
/// [`WeatherVariable::ALL`] is the order they are requested in and the order
/// of the weather columns in every table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherVariable {
    SurfacePressureMean,
    WeatherCode,
    SunshineDuration,
    DaylightDuration,
    PrecipitationSum,
    PrecipitationHours,
    WindDirection10mDominant,
    CloudCoverMin,
    CloudCoverMean,
    Temperature2mMean,
    RelativeHumidity2mMin,
    WindSpeed10mMean,
    ShortwaveRadiationSum,
}

impl WeatherVariable {
    pub const ALL: [WeatherVariable; 13] = [
        WeatherVariable::SurfacePressureMean,
        WeatherVariable::WeatherCode,
        WeatherVariable::SunshineDuration,
        WeatherVariable::DaylightDuration,
        WeatherVariable::PrecipitationSum,
        WeatherVariable::PrecipitationHours,
        WeatherVariable::WindDirection10mDominant,
        WeatherVariable::CloudCoverMin,
        WeatherVariable::CloudCoverMean,
        WeatherVariable::Temperature2mMean,
        WeatherVariable::RelativeHumidity2mMin,
        WeatherVariable::WindSpeed10mMean,
        WeatherVariable::ShortwaveRadiationSum,
    ];

    /// Variable name as the upstream API and the tables spell it.
    pub const fn api_name(self) -> &'static str {
        match self {
            WeatherVariable::SurfacePressureMean => "surface_pressure_mean",
            WeatherVariable::WeatherCode => "weather_code",
            WeatherVariable::SunshineDuration => "sunshine_duration",
            WeatherVariable::DaylightDuration => "daylight_duration",
            WeatherVariable::PrecipitationSum => "precipitation_sum",
            WeatherVariable::PrecipitationHours => "precipitation_hours",
            WeatherVariable::WindDirection10mDominant => "wind_direction_10m_dominant",
            WeatherVariable::CloudCoverMin => "cloud_cover_min",
            WeatherVariable::CloudCoverMean => "cloud_cover_mean",
            WeatherVariable::Temperature2mMean => "temperature_2m_mean",
            WeatherVariable::RelativeHumidity2mMin => "relative_humidity_2m_min",
            WeatherVariable::WindSpeed10mMean => "wind_speed_10m_mean",
            WeatherVariable::ShortwaveRadiationSum => "shortwave_radiation_sum",
        }
    }

    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.api_name() == name)
    }

    /// Comma-separated variable list for the `daily` query parameter.
    pub fn query_list() -> String {
        Self::ALL.map(WeatherVariable::api_name).join(",")
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// One day's values for every variable of the vocabulary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyWeather([Option<f64>; WeatherVariable::ALL.len()]);

impl DailyWeather {
    pub fn get(&self, var: WeatherVariable) -> Option<f64> {
        self.0[var.index()]
    }

    /// `NaN` is stored as missing.
    pub fn set(&mut self, var: WeatherVariable, value: Option<f64>) {
        self.0[var.index()] = value.filter(|v| !v.is_nan());
    }

    pub fn with(mut self, var: WeatherVariable, value: f64) -> Self {
        self.set(var, Some(value));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (WeatherVariable, Option<f64>)> + '_ {
        WeatherVariable::ALL.into_iter().map(|v| (v, self.get(v)))
    }

    /// One column per variable, in vocabulary order, one row per element of `days`.
    pub fn columns<'a>(days: impl Iterator<Item = &'a DailyWeather> + Clone) -> Vec<Column> {
        WeatherVariable::ALL
            .into_iter()
            .map(|var| {
                let values: Vec<Option<f64>> = days.clone().map(|day| day.get(var)).collect();
                Column::new(var.api_name().into(), values)
            })
            .collect()
    }

    /// Reads every variable column of a frame; absent columns are missing values.
    pub fn from_frame(frame: &DataFrame) -> Result<Vec<Self>, FrameError> {
        let mut days = vec![DailyWeather::default(); frame.height()];
        for var in WeatherVariable::ALL {
            for (day, value) in days.iter_mut().zip(optional(frame, var.api_name(), floats)?) {
                day.set(var, value);
            }
        }
        Ok(days)
    }
}

/// Weather for one location on one day.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherDailyRecord {
    pub location_id: LocationId,
    pub date: NaiveDate,
    pub weather: DailyWeather,
}

impl ToFrame for WeatherDailyRecord {
    fn to_frame(records: &[Self]) -> Result<DataFrame, FrameError> {
        let mut columns = vec![
            Column::new(
                ID_COLUMN.into(),
                records.iter().map(|r| r.location_id.to_string()).collect::<Vec<_>>(),
            ),
            Column::new(DATE_COLUMN.into(), records.iter().map(|r| r.date).collect::<Vec<_>>()),
        ];
        columns.extend(DailyWeather::columns(records.iter().map(|r| &r.weather)));
        Ok(DataFrame::new(columns)?)
    }
}
