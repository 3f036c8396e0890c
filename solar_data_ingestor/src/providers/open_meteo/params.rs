use chrono::NaiveDate;

use crate::{
    models::{date_span::ISO_DATE, weather_record::WeatherVariable},
    providers::WeatherRequest,
};

pub const HISTORY_URL: &str = "https://historical-forecast-api.open-meteo.com/v1/forecast";
pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// First date the history endpoint has data for.
pub fn history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 3, 1).unwrap_or(NaiveDate::MIN)
}

/// Values per billed unit: a call costs `days * variables / 140`, rounded up.
pub const COST_ROW_DIVISOR: u64 = 140;

pub type QueryParams = Vec<(&'static str, String)>;

pub fn history_params(request: &WeatherRequest) -> QueryParams {
    vec![
        ("latitude", request.latitude.to_string()),
        ("longitude", request.longitude.to_string()),
        ("start_date", request.span.start.format(ISO_DATE).to_string()),
        ("end_date", request.span.end.format(ISO_DATE).to_string()),
        ("daily", WeatherVariable::query_list()),
    ]
}

pub fn forecast_params(latitude: f64, longitude: f64, timezone: &str) -> QueryParams {
    vec![
        ("latitude", latitude.to_string()),
        ("longitude", longitude.to_string()),
        ("daily", WeatherVariable::query_list()),
        ("timezone", timezone.to_string()),
    ]
}
