//! Joining PV output and weather into one frame keyed by (location, date).

use polars::prelude::*;
use tracing::info;

use crate::{
    frame::{FrameError, dates, drop_columns, has_column, require_column, texts},
    models::{pv_record::columns as pv, weather_record},
};

/// PV-side columns not used downstream, plus the weather table's join keys.
pub const DROPPED_COLUMNS: [&str; 15] = [
    pv::ENERGY_GENERATED,
    pv::ENERGY_EXPORTED,
    pv::ENERGY_USED,
    pv::PEAK_POWER,
    pv::PEAK_TIME,
    pv::CONDITION,
    pv::MIN_TEMP,
    pv::MAX_TEMP,
    pv::PEAK_IMPORT,
    pv::OFF_PEAK_IMPORT,
    pv::SHOULDER_IMPORT,
    pv::HIGH_SHOULDER_IMPORT,
    pv::INSOLATION,
    weather_record::ID_COLUMN,
    weather_record::DATE_COLUMN,
];

/// Appended to a weather column whose name is already taken by a PV column.
const WEATHER_SUFFIX: &str = "_weather";

/// Carries PV row order through the join.
const ROW_ORDER: &str = "__pv_row";

/// Rewrites the key columns as trimmed text ids and dates, so that keys read
/// back from a file (`66991` as a number, dates as text) match keys built in memory.
fn normalise_keys(frame: &mut DataFrame, id: &str, date: &str) -> Result<(), FrameError> {
    let ids = texts(frame, id)?;
    let days = dates(frame, date)?;
    frame.with_column(Column::new(id.into(), ids))?;
    frame.with_column(Column::new(date.into(), days))?;
    Ok(())
}

/// Inner join of `pv` (`System ID`, `Date`) with `weather` (`id`, `date`).
///
/// Rows are kept in PV order. A key present on one side only produces nothing;
/// rows with a missing key never match.
pub fn combine(pv: &DataFrame, weather: &DataFrame) -> Result<DataFrame, FrameError> {
    for key in [pv::SYSTEM_ID, pv::DATE] {
        require_column(pv, key)?;
    }
    for key in [weather_record::ID_COLUMN, weather_record::DATE_COLUMN] {
        require_column(weather, key)?;
    }

    let mut left = pv.clone();
    normalise_keys(&mut left, pv::SYSTEM_ID, pv::DATE)?;
    let mut right = weather.clone();
    normalise_keys(&mut right, weather_record::ID_COLUMN, weather_record::DATE_COLUMN)?;
    let taken: Vec<PlSmallStr> = weather
        .get_column_names()
        .into_iter()
        .filter(|name| has_column(pv, name))
        .cloned()
        .collect();
    for name in taken {
        right.rename(&name, format!("{name}{WEATHER_SUFFIX}").into())?;
    }

    let mut combined = left
        .lazy()
        .with_row_index(ROW_ORDER, None)
        .join(
            right.lazy(),
            [col(pv::SYSTEM_ID), col(pv::DATE)],
            [col(weather_record::ID_COLUMN), col(weather_record::DATE_COLUMN)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort([ROW_ORDER], SortMultipleOptions::default().with_maintain_order(true))
        .collect()?;
    drop_columns(&mut combined, &[ROW_ORDER])?;
    drop_columns(&mut combined, &DROPPED_COLUMNS)?;

    info!(
        pv_rows = pv.height(),
        weather_rows = weather.height(),
        combined_rows = combined.height(),
        "Combined PV output with weather"
    );
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        frame::{ToFrame, floats, read_csv},
        models::{LocationId, PvDailyRecord, WeatherDailyRecord, WeatherVariable, weather_record::DailyWeather},
    };

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 7, day).unwrap()
    }

    fn pv_frame(days: &[u32]) -> DataFrame {
        let records: Vec<_> = days
            .iter()
            .map(|&day| PvDailyRecord {
                efficiency_kwh_per_kw: Some(4.2),
                energy_generated_wh: Some(21000.0),
                ..PvDailyRecord::new(LocationId::from(66991u64), d(day))
            })
            .collect();
        PvDailyRecord::to_frame(&records).unwrap()
    }

    fn weather_frame(id: u64, days: &[u32]) -> DataFrame {
        let records: Vec<_> = days
            .iter()
            .map(|&day| WeatherDailyRecord {
                location_id: LocationId::from(id),
                date: d(day),
                weather: DailyWeather::default().with(WeatherVariable::WeatherCode, 61.0),
            })
            .collect();
        WeatherDailyRecord::to_frame(&records).unwrap()
    }

    fn names(frame: &DataFrame) -> Vec<String> {
        frame.get_column_names().into_iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn only_dates_present_on_both_sides_survive() {
        let combined = combine(&pv_frame(&[3, 1, 2]), &weather_frame(66991, &[4, 3, 2])).unwrap();
        assert_eq!(dates(&combined, pv::DATE).unwrap(), vec![Some(d(3)), Some(d(2))]);
    }

    #[test]
    fn unused_and_duplicate_key_columns_are_dropped() {
        let combined = combine(&pv_frame(&[1]), &weather_frame(66991, &[1])).unwrap();
        let mut expected = vec![pv::SYSTEM_ID.to_string(), pv::DATE.to_string(), pv::EFFICIENCY.to_string()];
        expected.extend(WeatherVariable::ALL.iter().map(|v| v.api_name().to_string()));
        assert_eq!(names(&combined), expected);
        assert_eq!(floats(&combined, pv::EFFICIENCY).unwrap(), vec![Some(4.2)]);
    }

    #[test]
    fn ids_read_back_as_numbers_still_match() {
        let weather = read_csv("id,date,weather_code\n66991,2023-07-01,61\n").unwrap();
        let combined = combine(&pv_frame(&[1]), &weather).unwrap();
        assert_eq!(combined.height(), 1);
        assert_eq!(texts(&combined, pv::SYSTEM_ID).unwrap(), vec![Some("66991".to_string())]);
    }

    #[test]
    fn colliding_weather_columns_get_a_suffix() {
        let weather = read_csv("id,date,Efficiency (kWh/kW)\n66991,2023-07-01,9.9\n").unwrap();
        let combined = combine(&pv_frame(&[1]), &weather).unwrap();
        assert_eq!(floats(&combined, "Efficiency (kWh/kW)_weather").unwrap(), vec![Some(9.9)]);
        assert_eq!(floats(&combined, pv::EFFICIENCY).unwrap(), vec![Some(4.2)]);
    }

    #[test]
    fn other_locations_do_not_match() {
        let combined = combine(&pv_frame(&[1]), &weather_frame(12, &[1])).unwrap();
        assert_eq!(combined.height(), 0);
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let mut weather = weather_frame(66991, &[1]);
        drop_columns(&mut weather, &[weather_record::ID_COLUMN]).unwrap();
        let err = combine(&pv_frame(&[1]), &weather).unwrap_err();
        assert!(matches!(err, FrameError::MissingColumn(c) if c == "id"));
    }
}
