//! Reading sinks written by [`super::sink::CsvDirSink`] back into frames.
//!
//! A sink written with `append` holds several header-led blocks separated by
//! blank lines. A line counts as blank when nothing but commas and whitespace
//! is left on it, which also covers separators written by spreadsheet tools.

use std::path::Path;

use polars::frame::DataFrame;

use crate::frame::{FrameError, read_csv};

fn is_separator(line: &str) -> bool {
    line.chars().all(|c| c == ',' || c.is_whitespace())
}

/// Splits `text` at separator lines and parses each block with its own header.
pub fn parse_blocks(text: &str) -> Result<Vec<DataFrame>, FrameError> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if is_separator(line) {
            if !current.is_empty() {
                blocks.push(read_csv(&current)?);
                current.clear();
            }
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.is_empty() {
        blocks.push(read_csv(&current)?);
    }
    Ok(blocks)
}

/// Every block of a delimited file, in file order.
pub fn read_blocks(path: impl AsRef<Path>) -> Result<Vec<DataFrame>, FrameError> {
    let text = std::fs::read_to_string(path)?;
    parse_blocks(&text)
}

/// The last block of a delimited file: the only one for a plain sink, the
/// appended one for a two-block file.
pub fn read_table(path: impl AsRef<Path>) -> Result<DataFrame, FrameError> {
    Ok(read_blocks(path)?.pop().unwrap_or_else(DataFrame::empty))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use polars::prelude::*;

    use super::*;
    use crate::frame::{dates, floats, texts};

    #[test]
    fn two_block_file_splits_at_the_separator() {
        let text = "System ID,Latitude\n66991,-27.47\n,,\nSystem ID,Date,Efficiency (kWh/kW)\n66991,2023-07-01,4.2\n66991,2023-07-02,\n";
        let blocks = parse_blocks(text).unwrap();

        assert_eq!(blocks.len(), 2);
        let names: Vec<&str> = blocks[0].get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["System ID", "Latitude"]);
        assert_eq!(blocks[1].height(), 2);
        assert_eq!(texts(&blocks[1], "System ID").unwrap()[0].as_deref(), Some("66991"));
        assert_eq!(
            dates(&blocks[1], "Date").unwrap()[0],
            Some(NaiveDate::from_ymd_opt(2023, 7, 1).unwrap())
        );
        assert_eq!(floats(&blocks[1], "Efficiency (kWh/kW)").unwrap(), vec![Some(4.2), None]);
    }

    #[test]
    fn leading_and_trailing_blank_lines_are_ignored() {
        let blocks = parse_blocks("\n\na,b\n1,true\n\n\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].column("b").unwrap().dtype(), &DataType::Boolean);
    }

    #[test]
    fn ragged_block_is_an_error() {
        assert!(parse_blocks("a,b\n1,2,3\n").is_err());
    }

    #[test]
    fn missing_file_reads_as_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_table(dir.path().join("absent.csv")), Err(FrameError::Io(_))));
    }
}
