//! Decoding of PV-Output text payloads.

use chrono::NaiveDate;
use snafu::OptionExt;

use crate::{
    models::{
        date_span::{COMPACT_DATE, DateSpan},
        location::{CoordinatePrecision, Location, SystemDetails},
        location_id::LocationId,
        pv_record::PvDailyRecord,
    },
    providers::{BadRequestSnafu, DecodeSnafu, ProviderError},
};

/// Prefix the service puts on refusals, whatever the HTTP status.
pub const BAD_REQUEST_MARKER: &str = "Bad request";

const SYSTEM_FIELDS: usize = 16;

/// Fails with [`ProviderError::BadRequest`] when the payload is the refusal marker.
pub fn check_marker(text: &str) -> Result<(), ProviderError> {
    if text.trim_start().starts_with(BAD_REQUEST_MARKER) {
        return BadRequestSnafu {
            message: text.trim().to_string(),
        }
        .fail();
    }
    Ok(())
}

fn text_field(field: &str) -> Option<String> {
    let field = field.trim();
    (!field.is_empty() && !field.eq_ignore_ascii_case("nan")).then(|| field.to_string())
}

fn number_field(field: &str, name: &str) -> Result<Option<f64>, ProviderError> {
    match text_field(field) {
        None => Ok(None),
        Some(text) => text.parse::<f64>().map(Some).map_err(|_| {
            DecodeSnafu {
                message: format!("{name}: '{text}' is not a number"),
            }
            .build()
        }),
    }
}

fn date_field(field: &str, name: &str) -> Result<NaiveDate, ProviderError> {
    NaiveDate::parse_from_str(field.trim(), COMPACT_DATE).map_err(|_| {
        DecodeSnafu {
            message: format!("{name}: '{}' is not a YYYYMMDD date", field.trim()),
        }
        .build()
    })
}

/// `getsystem` payload: only the first `;` section is used.
pub fn parse_system(id: &LocationId, text: &str) -> Result<Location, ProviderError> {
    check_marker(text)?;
    let section = text.split(';').next().unwrap_or_default();
    let fields: Vec<&str> = section.split(',').collect();
    if fields.len() < SYSTEM_FIELDS {
        return DecodeSnafu {
            message: format!(
                "system {id}: expected {SYSTEM_FIELDS} fields, got {}",
                fields.len()
            ),
        }
        .fail();
    }

    let latitude = number_field(fields[13], "latitude")?.context(DecodeSnafu {
        message: format!("system {id} has no latitude"),
    })?;
    let longitude = number_field(fields[14], "longitude")?.context(DecodeSnafu {
        message: format!("system {id} has no longitude"),
    })?;

    Ok(Location {
        id: id.clone(),
        latitude,
        longitude,
        elevation_m: None,
        power_rating_w: number_field(fields[1], "system size")?,
        precision: Some(CoordinatePrecision::from_coordinate_text(fields[14])),
        extent: None,
        details: SystemDetails {
            name: text_field(fields[0]),
            postcode: text_field(fields[2]),
            panels: text_field(fields[3]),
            panel_power_w: text_field(fields[4]),
            panel_brand: text_field(fields[5]),
            inverters: text_field(fields[6]),
            inverter_power_w: text_field(fields[7]),
            inverter_brand: text_field(fields[8]),
            orientation: text_field(fields[9]),
            array_tilt: text_field(fields[10]),
            shade: text_field(fields[11]),
            install_date: text_field(fields[12]),
            status_interval: text_field(fields[15]),
        },
    })
}

/// `getstatistic` payload: fields 7 and 8 are the first and last output dates.
pub fn parse_statistic(id: &LocationId, text: &str) -> Result<DateSpan, ProviderError> {
    check_marker(text)?;
    let fields: Vec<&str> = text.trim().split(',').collect();
    if fields.len() < 9 {
        return DecodeSnafu {
            message: format!("statistic for {id}: expected at least 9 fields, got {}", fields.len()),
        }
        .fail();
    }
    let start = date_field(fields[7], "earliest output date")?;
    let end = date_field(fields[8], "latest output date")?;
    DateSpan::new(start, end).context(DecodeSnafu {
        message: format!("statistic for {id}: output range {start}..{end} is inverted"),
    })
}

/// `getoutput` payload: one `;`-separated record per day, newest first.
///
/// Records are returned oldest first. An empty payload has no records.
pub fn parse_output(id: &LocationId, text: &str) -> Result<Vec<PvDailyRecord>, ProviderError> {
    check_marker(text)?;
    let mut records = text
        .trim()
        .split(';')
        .filter(|row| !row.trim().is_empty())
        .map(|row| parse_output_row(id, row))
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by_key(|r| r.date);
    Ok(records)
}

fn parse_output_row(id: &LocationId, row: &str) -> Result<PvDailyRecord, ProviderError> {
    let fields: Vec<&str> = row.split(',').collect();
    let field = |i: usize| fields.get(i).copied().unwrap_or_default();

    Ok(PvDailyRecord {
        location_id: id.clone(),
        date: date_field(field(0), "output date")?,
        energy_generated_wh: number_field(field(1), "energy generated")?,
        efficiency_kwh_per_kw: number_field(field(2), "efficiency")?,
        energy_exported_wh: number_field(field(3), "energy exported")?,
        energy_used_wh: number_field(field(4), "energy used")?,
        peak_power_w: number_field(field(5), "peak power")?,
        peak_time: text_field(field(6)),
        condition: text_field(field(7)),
        min_temp_c: number_field(field(8), "min temperature")?,
        max_temp_c: number_field(field(9), "max temperature")?,
        peak_import_wh: number_field(field(10), "peak energy import")?,
        off_peak_import_wh: number_field(field(11), "off peak energy import")?,
        shoulder_import_wh: number_field(field(12), "shoulder energy import")?,
        high_shoulder_import_wh: number_field(field(13), "high shoulder energy import")?,
        insolation_wh: number_field(field(14), "insolation")?,
    })
}
