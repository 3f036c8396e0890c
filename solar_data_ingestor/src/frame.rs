//! Polars helpers shared by every stage that reads, reshapes or writes a dataset.
//!
//! Acquisition produces typed records, which become [`DataFrame`]s through
//! [`ToFrame`]; the sink, the assembler and the feature transform all work on
//! frames, so the persisted schema and the in-memory schema are the same thing.
//!
//! Delimited text is read with header inference over the whole block and ISO
//! date parsing. A column that would only be numeric because some cell spells
//! an infinity (`inf`, `Infinity`) is kept as text: no source field is ever an
//! infinite number.

use std::{io::Cursor, sync::Arc};

use chrono::NaiveDate;
use polars::prelude::*;
use polars_io::{SerReader, SerWriter};
use thiserror::Error;

use crate::models::date_span::ISO_DATE;

#[derive(Debug, Error)]
pub enum FrameError {
    /// A column required by an operation is not part of the frame.
    #[error("missing column '{0}'")]
    MissingColumn(String),

    /// A cell could not be interpreted as the type an operation needs.
    #[error("invalid value '{value}' in column '{column}': expected {expected}")]
    InvalidValue {
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("Polars operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Typed rows that know their own column layout.
pub trait ToFrame: Sized {
    fn to_frame(records: &[Self]) -> Result<DataFrame, FrameError>;
}

pub fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.get_column_index(name).is_some()
}

pub fn require_column<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a Column, FrameError> {
    match frame.get_column_index(name) {
        Some(_) => Ok(frame.column(name)?),
        None => Err(FrameError::MissingColumn(name.to_string())),
    }
}

/// Numeric cells of a column. `NaN` reads as missing, an infinity is an error.
pub fn floats(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, FrameError> {
    let column = require_column(frame, name)?.as_materialized_series();
    let values = column
        .strict_cast(&DataType::Float64)
        .map_err(|_| invalid(name, column.dtype().to_string(), "a number"))?;
    values
        .f64()?
        .into_iter()
        .map(|v| match v {
            Some(n) if n.is_infinite() => Err(invalid(name, n.to_string(), "a finite number")),
            Some(n) if n.is_nan() => Ok(None),
            other => Ok(other),
        })
        .collect()
}

/// Cells of a column as trimmed text.
///
/// Whole floats print without a fraction, so an id read back as `66991.0`
/// gives the same text as `66991`.
pub fn texts(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>, FrameError> {
    let column = require_column(frame, name)?.as_materialized_series();
    if column.dtype().is_float() {
        return Ok(floats(frame, name)?
            .into_iter()
            .map(|v| v.map(|n| n.to_string()))
            .collect());
    }
    let values = column.cast(&DataType::String)?;
    Ok(values
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .collect())
}

/// Cells of a date column, or of a text column holding ISO dates.
pub fn dates(frame: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, FrameError> {
    texts(frame, name)?
        .into_iter()
        .map(|cell| match cell {
            None => Ok(None),
            Some(text) => NaiveDate::parse_from_str(&text, ISO_DATE)
                .map(Some)
                .map_err(|_| invalid(name, text, "an ISO date")),
        })
        .collect()
}

/// `read` over a column that may be absent; an absent column is all missing.
pub fn optional<T: Clone>(
    frame: &DataFrame,
    name: &str,
    read: impl Fn(&DataFrame, &str) -> Result<Vec<Option<T>>, FrameError>,
) -> Result<Vec<Option<T>>, FrameError> {
    if has_column(frame, name) {
        read(frame, name)
    } else {
        Ok(vec![None; frame.height()])
    }
}

/// Fails on the first missing cell.
pub fn required<T>(name: &str, values: Vec<Option<T>>) -> Result<Vec<T>, FrameError> {
    values
        .into_iter()
        .map(|v| v.ok_or_else(|| invalid(name, String::new(), "a value")))
        .collect()
}

/// Replaces every `NaN` in the float columns with a missing value.
pub fn nan_to_null(frame: &mut DataFrame) -> Result<(), FrameError> {
    let names: Vec<PlSmallStr> = frame
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_float())
        .map(|c| c.name().clone())
        .collect();
    for name in names {
        let values = floats(frame, &name)?;
        frame.with_column(Column::new(name, values))?;
    }
    Ok(())
}

/// Removes the named columns. Names not present are ignored.
pub fn drop_columns(frame: &mut DataFrame, names: &[&str]) -> Result<(), FrameError> {
    for name in names {
        if has_column(frame, name) {
            frame.drop_in_place(name)?;
        }
    }
    Ok(())
}

fn invalid(column: &str, value: String, expected: &'static str) -> FrameError {
    FrameError::InvalidValue {
        column: column.to_string(),
        value,
        expected,
    }
}

fn csv_reader(bytes: Arc<[u8]>, infer_rows: Option<usize>) -> Result<DataFrame, FrameError> {
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(infer_rows)
        .map_parse_options(|options| options.with_try_parse_dates(true))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?)
}

/// Parses one header-led block of delimited text.
pub fn read_csv(text: &str) -> Result<DataFrame, FrameError> {
    let bytes: Arc<[u8]> = Arc::from(text.as_bytes());
    let mut frame = csv_reader(bytes.clone(), None)?;

    let infinite: Vec<PlSmallStr> = frame
        .get_columns()
        .iter()
        .filter(|c| {
            c.as_materialized_series()
                .f64()
                .is_ok_and(|values| values.into_iter().flatten().any(f64::is_infinite))
        })
        .map(|c| c.name().clone())
        .collect();
    if infinite.is_empty() {
        return Ok(frame);
    }

    let raw = csv_reader(bytes, Some(0))?;
    for name in infinite {
        frame.with_column(raw.column(&name)?.clone())?;
    }
    Ok(frame)
}

/// Header row plus every data row. Dates print as ISO dates, missing cells as nothing.
pub fn write_csv(frame: &DataFrame) -> Result<Vec<u8>, FrameError> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut frame.clone())?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn cells_are_typed_on_read() {
        let frame = read_csv("id,date,x,flag,name\n66991,2023-04-01,12.5,true,Fine\n8,2023-04-02,,false,\n").unwrap();
        assert_eq!(texts(&frame, "id").unwrap(), vec![Some("66991".into()), Some("8".into())]);
        assert_eq!(frame.column("date").unwrap().dtype(), &DataType::Date);
        assert_eq!(dates(&frame, "date").unwrap(), vec![Some(d(2023, 4, 1)), Some(d(2023, 4, 2))]);
        assert_eq!(floats(&frame, "x").unwrap(), vec![Some(12.5), None]);
        assert_eq!(frame.column("flag").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(texts(&frame, "name").unwrap(), vec![Some("Fine".into()), None]);
    }

    #[test]
    fn infinity_spellings_stay_text() {
        let frame = read_csv("System ID,System Name,Shade\n1,Inf,inf\n2,Solar,-infinity\n").unwrap();
        assert_eq!(frame.column("System Name").unwrap().dtype(), &DataType::String);
        assert_eq!(frame.column("Shade").unwrap().dtype(), &DataType::String);
        assert_eq!(texts(&frame, "System Name").unwrap()[0].as_deref(), Some("Inf"));
        assert_eq!(texts(&frame, "Shade").unwrap()[1].as_deref(), Some("-infinity"));
        assert!(floats(&frame, "Shade").is_err());
    }

    #[test]
    fn whole_float_ids_read_like_integers() {
        let frame = DataFrame::new(vec![Column::new("id".into(), [66991.0, 2.5])]).unwrap();
        assert_eq!(texts(&frame, "id").unwrap(), vec![Some("66991".into()), Some("2.5".into())]);
    }

    #[test]
    fn nan_becomes_missing() {
        let mut frame = DataFrame::new(vec![Column::new("x".into(), [1.0, f64::NAN])]).unwrap();
        nan_to_null(&mut frame).unwrap();
        assert_eq!(frame.column("x").unwrap().null_count(), 1);
    }

    #[test]
    fn drop_columns_ignores_unknown_names() {
        let mut frame = DataFrame::new(vec![
            Column::new("a".into(), [1i64]),
            Column::new("b".into(), [2i64]),
            Column::new("c".into(), [3i64]),
        ])
        .unwrap();
        drop_columns(&mut frame, &["b", "zzz"]).unwrap();
        let names: Vec<&str> = frame.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn absent_optional_column_is_all_missing() {
        let frame = DataFrame::new(vec![Column::new("a".into(), [1i64, 2])]).unwrap();
        assert_eq!(optional(&frame, "b", floats).unwrap(), vec![None, None]);
        assert!(matches!(floats(&frame, "b"), Err(FrameError::MissingColumn(c)) if c == "b"));
        assert!(required("a", vec![Some(1), None]).is_err());
    }

    #[test]
    fn csv_round_trip_keeps_schema_and_values() {
        let frame = DataFrame::new(vec![
            Column::new("date".into(), [d(2022, 3, 1)]),
            Column::new("x".into(), [None::<f64>]),
            Column::new("flag".into(), [true]),
        ])
        .unwrap();

        let bytes = write_csv(&frame).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "date,x,flag\n2022-03-01,,true\n");

        let back = read_csv(&text).unwrap();
        assert_eq!(dates(&back, "date").unwrap(), vec![Some(d(2022, 3, 1))]);
        assert_eq!(floats(&back, "x").unwrap(), vec![None]);
    }
}
