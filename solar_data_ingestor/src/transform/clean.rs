//! Row-level filtering of a combined or forecast frame.

use polars::prelude::*;
use tracing::debug;

use crate::{
    frame::{FrameError, floats, has_column, nan_to_null},
    models::{WeatherVariable, pv_record::columns as pv},
};

/// Upper bound of a cloud-cover percentage.
pub const CLOUD_COVER_CEILING: f64 = 100.0;

/// `cloud_cover_min` value the weather source uses for an unavailable reading.
pub const CLOUD_COVER_UNAVAILABLE: f64 = -1.0;

/// Drops incomplete and invalid rows and clips `cloud_cover_mean` to 100.
///
/// Rows are removed when any cell is missing, when `cloud_cover_min` is the
/// `-1` sentinel, or when an efficiency column is present and exactly zero.
/// Applying it to its own output changes nothing.
pub fn clean(mut frame: DataFrame) -> Result<DataFrame, FrameError> {
    let mean = WeatherVariable::CloudCoverMean.api_name();
    let min = WeatherVariable::CloudCoverMin.api_name();
    let mut numeric = vec![mean, min];
    if has_column(&frame, pv::EFFICIENCY) {
        numeric.push(pv::EFFICIENCY);
    }
    for name in numeric.iter().copied() {
        let values = floats(&frame, name)?;
        frame.with_column(Column::new(name.into(), values))?;
    }
    nan_to_null(&mut frame)?;
    let before = frame.height();

    let mut rows = frame
        .drop_nulls::<String>(None)?
        .lazy()
        .with_column(
            when(col(mean).gt(lit(CLOUD_COVER_CEILING)))
                .then(lit(CLOUD_COVER_CEILING))
                .otherwise(col(mean))
                .alias(mean),
        )
        .filter(col(min).neq(lit(CLOUD_COVER_UNAVAILABLE)));
    if numeric.contains(&pv::EFFICIENCY) {
        rows = rows.filter(col(pv::EFFICIENCY).neq(lit(0.0)));
    }
    let cleaned = rows.collect()?;

    debug!(before, after = cleaned.height(), "Cleaned frame");
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::drop_columns;

    fn frame(rows: &[[Option<f64>; 3]]) -> DataFrame {
        let column = |i: usize, name: &str| Column::new(name.into(), rows.iter().map(|r| r[i]).collect::<Vec<_>>());
        DataFrame::new(vec![
            column(0, pv::EFFICIENCY),
            column(1, "cloud_cover_min"),
            column(2, "cloud_cover_mean"),
        ])
        .unwrap()
    }

    fn row(frame: &DataFrame, i: usize) -> Vec<Option<f64>> {
        frame
            .get_column_names()
            .into_iter()
            .map(|name| floats(frame, name).unwrap()[i])
            .collect()
    }

    #[test]
    fn cloud_cover_mean_is_clipped() {
        let cleaned = clean(frame(&[[Some(3.1), Some(20.0), Some(137.0)]])).unwrap();
        assert_eq!(floats(&cleaned, "cloud_cover_mean").unwrap(), vec![Some(100.0)]);
    }

    #[test]
    fn sentinel_and_zero_efficiency_rows_are_removed() {
        let cleaned = clean(frame(&[
            [Some(3.1), Some(-1.0), Some(50.0)],
            [Some(0.0), Some(10.0), Some(50.0)],
            [Some(2.5), Some(10.0), Some(50.0)],
        ]))
        .unwrap();
        assert_eq!(cleaned.height(), 1);
        assert_eq!(row(&cleaned, 0), vec![Some(2.5), Some(10.0), Some(50.0)]);
    }

    #[test]
    fn rows_with_missing_cells_are_removed() {
        let cleaned = clean(frame(&[
            [None, Some(10.0), Some(50.0)],
            [Some(2.5), Some(f64::NAN), Some(50.0)],
            [Some(2.5), Some(10.0), Some(50.0)],
        ]))
        .unwrap();
        assert_eq!(cleaned.height(), 1);
    }

    #[test]
    fn missing_text_cells_count_too() {
        let mut raw = frame(&[[Some(2.5), Some(10.0), Some(50.0)], [Some(2.5), Some(10.0), Some(50.0)]]);
        raw.with_column(Column::new("note".into(), [Some("ok"), None])).unwrap();
        assert_eq!(clean(raw).unwrap().height(), 1);
    }

    #[test]
    fn efficiency_column_is_optional() {
        let mut forecast = frame(&[[Some(0.0), Some(10.0), Some(120.0)]]);
        drop_columns(&mut forecast, &[pv::EFFICIENCY]).unwrap();
        let cleaned = clean(forecast).unwrap();
        assert_eq!(row(&cleaned, 0), vec![Some(10.0), Some(100.0)]);
    }

    #[test]
    fn cleaning_twice_is_cleaning_once() {
        let raw = frame(&[
            [Some(3.1), Some(20.0), Some(137.0)],
            [Some(3.1), Some(-1.0), Some(50.0)],
            [None, Some(10.0), Some(50.0)],
            [Some(1.0), Some(0.0), Some(100.0)],
        ]);
        let once = clean(raw).unwrap();
        let twice = clean(once.clone()).unwrap();
        assert!(once.equals_missing(&twice));
        assert_eq!(once.height(), 2);
    }

    #[test]
    fn missing_cloud_cover_column_is_an_error() {
        let mut f = frame(&[]);
        drop_columns(&mut f, &["cloud_cover_min"]).unwrap();
        assert!(matches!(clean(f), Err(FrameError::MissingColumn(_))));
    }
}
