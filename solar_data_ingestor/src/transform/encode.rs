//! Weather-code to one-hot category columns.
//!
//! Codes follow the WMO interpretation table the weather source uses. Every
//! code maps to one of nine categories; the output always holds one boolean
//! column per category except the reference category [`WeatherCategory::Clear`],
//! in [`WeatherCategory::ALL`] order, whatever categories the input contains.

use std::fmt;

use polars::prelude::*;

use crate::{
    frame::{FrameError, floats},
    models::WeatherVariable,
};

/// Prefix of every indicator column.
pub const CATEGORY_PREFIX: &str = "weather_category_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherCategory {
    Clear,
    PartlyCloudy,
    Overcast,
    Fog,
    Drizzle,
    Rain,
    Snow,
    RainShowers,
    Thunderstorm,
}

impl WeatherCategory {
    pub const ALL: [WeatherCategory; 9] = [
        WeatherCategory::Clear,
        WeatherCategory::PartlyCloudy,
        WeatherCategory::Overcast,
        WeatherCategory::Fog,
        WeatherCategory::Drizzle,
        WeatherCategory::Rain,
        WeatherCategory::Snow,
        WeatherCategory::RainShowers,
        WeatherCategory::Thunderstorm,
    ];

    /// Omitted from the encoded columns.
    pub const REFERENCE: WeatherCategory = WeatherCategory::Clear;

    pub const fn as_str(self) -> &'static str {
        match self {
            WeatherCategory::Clear => "clear",
            WeatherCategory::PartlyCloudy => "partly_cloudy",
            WeatherCategory::Overcast => "overcast",
            WeatherCategory::Fog => "fog",
            WeatherCategory::Drizzle => "drizzle",
            WeatherCategory::Rain => "rain",
            WeatherCategory::Snow => "snow",
            WeatherCategory::RainShowers => "rain_showers",
            WeatherCategory::Thunderstorm => "thunderstorm",
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        let category = match code {
            0 => WeatherCategory::Clear,
            1 | 2 => WeatherCategory::PartlyCloudy,
            3 => WeatherCategory::Overcast,
            45 | 48 => WeatherCategory::Fog,
            51 | 53 | 55 | 56 | 57 => WeatherCategory::Drizzle,
            61 | 63 | 65 | 66 | 67 => WeatherCategory::Rain,
            71 | 73 | 75 | 77 | 85 | 86 => WeatherCategory::Snow,
            80..=82 => WeatherCategory::RainShowers,
            95 | 96 | 99 => WeatherCategory::Thunderstorm,
            _ => return None,
        };
        Some(category)
    }


    pub fn column_name(self) -> String {
        format!("{CATEGORY_PREFIX}{}", self.as_str())
    }

    /// The indicator columns written by [`encode_weather`], in order.
    pub fn encoded() -> impl Iterator<Item = WeatherCategory> {
        Self::ALL.into_iter().filter(|c| *c != Self::REFERENCE)
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable condition for a WMO weather code.
pub fn describe_weather_code(code: u16) -> Option<&'static str> {
    let text = match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Freezing fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snowfall",
        73 => "Moderate snowfall",
        75 => "Heavy snowfall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => return None,
    };
    Some(text)
}

/// Integral code of a numeric cell; `None` for fractional or out-of-range values.
fn code_from_f64(value: f64) -> Option<u16> {
    if value.fract() != 0.0 || !(0.0..=f64::from(u16::MAX)).contains(&value) {
        return None;
    }
    Some(value as u16)
}

/// The `weather_code` column as WMO codes, one per row.
pub fn weather_codes(frame: &DataFrame) -> Result<Vec<Option<u16>>, FrameError> {
    Ok(floats(frame, WeatherVariable::WeatherCode.api_name())?
        .into_iter()
        .map(|v| v.and_then(code_from_f64))
        .collect())
}

/// Replaces `weather_code` with the indicator columns of `codes`, one code per row.
pub(crate) fn encode_codes(mut frame: DataFrame, codes: &[Option<u16>]) -> Result<DataFrame, FrameError> {
    let categories: Vec<Option<WeatherCategory>> = codes
        .iter()
        .map(|code| code.and_then(WeatherCategory::from_code))
        .collect();
    for category in WeatherCategory::encoded() {
        let flags: Vec<bool> = categories.iter().map(|c| *c == Some(category)).collect();
        frame.with_column(Column::new(category.column_name().into(), flags))?;
    }
    frame.drop_in_place(WeatherVariable::WeatherCode.api_name())?;
    Ok(frame)
}

/// Replaces `weather_code` with the category indicator columns.
///
/// Unknown and missing codes set every indicator to false, the same as the
/// reference category.
pub fn encode_weather(frame: DataFrame) -> Result<DataFrame, FrameError> {
    let codes = weather_codes(&frame)?;
    encode_codes(frame, &codes)
}
