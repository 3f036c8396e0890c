//! The feature transform shared by dataset construction and inference.
//!
//! [`prepare_features`] is the only entry point either path uses, so a frame
//! built offline and a forecast prepared online go through exactly the same
//! cleaning and encoding.

pub mod clean;
pub mod encode;

use std::collections::HashSet;

use polars::prelude::*;
use tracing::info;

use crate::{
    frame::{FrameError, require_column, texts},
    models::{LocationId, pv_record::columns as pv},
};

pub use clean::clean;
pub use encode::{WeatherCategory, describe_weather_code, encode_weather, weather_codes};

/// Rows that survived cleaning, encoded.
#[derive(Debug, Clone)]
pub struct Features {
    pub frame: DataFrame,
    /// The WMO code each row of `frame` was encoded from.
    pub weather_codes: Vec<Option<u16>>,
}

/// [`clean`] followed by the weather-code encoding.
pub fn prepare_features(frame: DataFrame) -> Result<Features, FrameError> {
    let cleaned = clean(frame)?;
    let weather_codes = weather_codes(&cleaned)?;
    let frame = encode::encode_codes(cleaned, &weather_codes)?;
    Ok(Features { frame, weather_codes })
}

/// Drops every row belonging to one of `ids`.
pub fn remove_locations(frame: DataFrame, ids: &[LocationId]) -> Result<DataFrame, FrameError> {
    require_column(&frame, pv::SYSTEM_ID)?;
    if ids.is_empty() {
        return Ok(frame);
    }
    let excluded: HashSet<&str> = ids.iter().map(LocationId::as_str).collect();
    let keep: BooleanChunked = texts(&frame, pv::SYSTEM_ID)?
        .iter()
        .map(|id| id.as_deref().is_none_or(|id| !excluded.contains(id)))
        .collect();
    let kept = frame.filter(&keep)?;
    info!(
        removed = frame.height() - kept.height(),
        locations = ids.len(),
        "Removed excluded locations"
    );
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::floats;

    #[test]
    fn excluded_ids_match_numeric_cells() {
        let frame = DataFrame::new(vec![Column::new(pv::SYSTEM_ID.into(), [3099i64, 12, 8224])]).unwrap();
        let kept = remove_locations(frame, &[LocationId::from(3099u64), LocationId::from("8224")]).unwrap();
        assert_eq!(texts(&kept, pv::SYSTEM_ID).unwrap(), vec![Some("12".to_string())]);
    }

    #[test]
    fn features_are_cleaned_then_encoded() {
        let frame = DataFrame::new(vec![
            Column::new("cloud_cover_min".into(), [5.0, -1.0]),
            Column::new("cloud_cover_mean".into(), [120.0, 50.0]),
            Column::new("weather_code".into(), [3.0, 3.0]),
        ])
        .unwrap();

        let features = prepare_features(frame).unwrap();
        assert_eq!(features.frame.height(), 1);
        assert_eq!(features.weather_codes, vec![Some(3)]);
        assert_eq!(floats(&features.frame, "cloud_cover_mean").unwrap(), vec![Some(100.0)]);
        let overcast = features.frame.column("weather_category_overcast").unwrap();
        assert_eq!(overcast.as_materialized_series().bool().unwrap().get(0), Some(true));
    }
}
