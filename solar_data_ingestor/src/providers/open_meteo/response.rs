use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    models::weather_record::{DailyWeather, WeatherVariable},
    providers::{DecodeSnafu, ProviderError, ValidationSnafu},
};

/// Max distance, in degrees, between requested and returned grid coordinates.
pub const COORDINATE_TOLERANCE_DEG: f64 = 0.5;

#[derive(Deserialize, Debug)]
pub struct DailyResponse {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    pub daily: DailyBlock,
}

/// Column-oriented daily values: one `time` array and one array per variable.
#[derive(Deserialize, Debug)]
pub struct DailyBlock {
    pub time: Vec<NaiveDate>,
    #[serde(flatten)]
    pub series: IndexMap<String, Vec<Option<f64>>>,
}

/// Body of a refused request, e.g. `{"error": true, "reason": "..."}`.
#[derive(Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: bool,
    pub reason: String,
}

impl DailyResponse {
    /// The service snaps coordinates to its grid; a result far from the request
    /// belongs to some other location.
    pub fn check_coordinates(&self, latitude: f64, longitude: f64) -> Result<(), ProviderError> {
        let far = (self.latitude - latitude).abs() > COORDINATE_TOLERANCE_DEG
            || (self.longitude - longitude).abs() > COORDINATE_TOLERANCE_DEG;
        if far {
            return ValidationSnafu {
                message: format!(
                    "response for ({latitude}, {longitude}) came back for ({}, {})",
                    self.latitude, self.longitude
                ),
            }
            .fail();
        }
        Ok(())
    }

    /// Pivots the columns into one [`DailyWeather`] per date.
    ///
    /// Every variable of the vocabulary must be present with one value per date.
    pub fn into_rows(self) -> Result<Vec<(NaiveDate, DailyWeather)>, ProviderError> {
        let DailyBlock { time, mut series } = self.daily;
        let mut rows: Vec<(NaiveDate, DailyWeather)> =
            time.into_iter().map(|date| (date, DailyWeather::default())).collect();

        for var in WeatherVariable::ALL {
            let values = series.swap_remove(var.api_name()).ok_or_else(|| {
                DecodeSnafu {
                    message: format!("missing daily variable '{}'", var.api_name()),
                }
                .build()
            })?;
            if values.len() != rows.len() {
                return DecodeSnafu {
                    message: format!(
                        "'{}' has {} values for {} dates",
                        var.api_name(),
                        values.len(),
                        rows.len()
                    ),
                }
                .fail();
            }
            for ((_, weather), value) in rows.iter_mut().zip(values) {
                weather.set(var, value);
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(codes: &str) -> String {
        let series: Vec<String> = WeatherVariable::ALL
            .iter()
            .map(|v| match v {
                WeatherVariable::WeatherCode => format!("\"weather_code\": {codes}"),
                other => format!("\"{}\": [1.5, null]", other.api_name()),
            })
            .collect();
        format!(
            r#"{{"latitude": -27.5, "longitude": 153.0, "elevation": 28.0,
                "daily_units": {{}},
                "daily": {{"time": ["2023-06-01", "2023-06-02"], {}}}}}"#,
            series.join(", ")
        )
    }

    #[test]
    fn columns_pivot_into_rows() {
        let response: DailyResponse = serde_json::from_str(&body("[61, 3]")).unwrap();
        assert_eq!(response.elevation, Some(28.0));
        let rows = response.into_rows().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        assert_eq!(rows[0].1.get(WeatherVariable::WeatherCode), Some(61.0));
        assert_eq!(rows[1].1.get(WeatherVariable::CloudCoverMean), None);
    }

    #[test]
    fn short_series_is_rejected() {
        let response: DailyResponse = serde_json::from_str(&body("[61]")).unwrap();
        assert!(matches!(response.into_rows(), Err(ProviderError::Decode { .. })));
    }

    #[test]
    fn distant_grid_point_is_rejected() {
        let response: DailyResponse = serde_json::from_str(&body("[61, 3]")).unwrap();
        assert!(response.check_coordinates(-27.47, 153.02).is_ok());
        assert!(response.check_coordinates(-33.9, 151.2).is_err());
    }
}
