//! PV installations and other weather query points.

use std::fmt;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    frame::{FrameError, ToFrame, dates, floats, optional, required, texts},
    models::{date_span::DateSpan, location_id::LocationId},
};

/// Column names of the location (system info) table, in output order.
pub mod columns {
    pub const SYSTEM_ID: &str = "System ID";
    pub const SYSTEM_NAME: &str = "System Name";
    pub const SYSTEM_SIZE: &str = "System Size";
    pub const POSTCODE: &str = "Postcode/Zipcode";
    pub const PANELS: &str = "Panels";
    pub const PANEL_POWER: &str = "Panel Power (W)";
    pub const PANEL_BRAND: &str = "Panel Brand";
    pub const INVERTERS: &str = "Inverters";
    pub const INVERTER_POWER: &str = "Inverter Power (W)";
    pub const INVERTER_BRAND: &str = "Inverter Brand";
    pub const ORIENTATION: &str = "Orientation";
    pub const ARRAY_TILT: &str = "Array Tilt (°)";
    pub const SHADE: &str = "Shade";
    pub const INSTALL_DATE: &str = "Install Date";
    pub const PRECISION: &str = "Co-ordinate Precision";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
    pub const STATUS_INTERVAL: &str = "Status Interval";
    pub const ELEVATION: &str = "Elevation (m)";
    pub const EARLIEST_OUTPUT: &str = "Earliest Output Date";
    pub const LATEST_OUTPUT: &str = "Latest Output Date";

    pub const ALL: [&str; 21] = [
        SYSTEM_ID,
        SYSTEM_NAME,
        SYSTEM_SIZE,
        POSTCODE,
        PANELS,
        PANEL_POWER,
        PANEL_BRAND,
        INVERTERS,
        INVERTER_POWER,
        INVERTER_BRAND,
        ORIENTATION,
        ARRAY_TILT,
        SHADE,
        INSTALL_DATE,
        PRECISION,
        LATITUDE,
        LONGITUDE,
        STATUS_INTERVAL,
        ELEVATION,
        EARLIEST_OUTPUT,
        LATEST_OUTPUT,
    ];
}

/// Whether an installation's coordinates look owner-supplied or auto-generated.
///
/// This is a heuristic on the number of decimal digits of the reported
/// longitude, not something the upstream service guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatePrecision {
    Exact,
    Approximate,
}

impl CoordinatePrecision {
    /// More than two decimal digits is `Exact`; anything else, including a
    /// value with no decimal point, is `Approximate`.
    pub fn from_coordinate_text(text: &str) -> Self {
        match text.trim().split_once('.') {
            Some((_, decimals)) if decimals.len() > 2 => CoordinatePrecision::Exact,
            _ => CoordinatePrecision::Approximate,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "Exact" => Some(CoordinatePrecision::Exact),
            "Approximate" => Some(CoordinatePrecision::Approximate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatePrecision::Exact => "Exact",
            CoordinatePrecision::Approximate => "Approximate",
        }
    }
}

impl fmt::Display for CoordinatePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive system metadata, kept as reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemDetails {
    pub name: Option<String>,
    pub postcode: Option<String>,
    pub panels: Option<String>,
    pub panel_power_w: Option<String>,
    pub panel_brand: Option<String>,
    pub inverters: Option<String>,
    pub inverter_power_w: Option<String>,
    pub inverter_brand: Option<String>,
    pub orientation: Option<String>,
    pub array_tilt: Option<String>,
    pub shade: Option<String>,
    pub install_date: Option<String>,
    pub status_interval: Option<String>,
}

/// A single query point: an id, coordinates and, once known, the dates with data.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_m: Option<f64>,
    pub power_rating_w: Option<f64>,
    pub precision: Option<CoordinatePrecision>,
    pub extent: Option<DateSpan>,
    pub details: SystemDetails,
}

impl Location {
    pub fn new(id: impl Into<LocationId>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            elevation_m: None,
            power_rating_w: None,
            precision: None,
            extent: None,
            details: SystemDetails::default(),
        }
    }

    pub fn with_extent(mut self, extent: DateSpan) -> Self {
        self.extent = Some(extent);
        self
    }
}

fn text_column(name: &str, values: impl Iterator<Item = Option<String>>) -> Column {
    Column::new(name.into(), values.collect::<Vec<_>>())
}

impl ToFrame for Location {
    fn to_frame(records: &[Self]) -> Result<DataFrame, FrameError> {
        use columns::*;

        let details = |f: fn(&SystemDetails) -> Option<String>| records.iter().map(move |r| f(&r.details));
        let numbers = |f: fn(&Location) -> Option<f64>| records.iter().map(f).collect::<Vec<_>>();
        let extent = |f: fn(DateSpan) -> NaiveDate| records.iter().map(|r| r.extent.map(f)).collect::<Vec<_>>();

        Ok(DataFrame::new(vec![
            text_column(SYSTEM_ID, records.iter().map(|r| Some(r.id.to_string()))),
            text_column(SYSTEM_NAME, details(|d| d.name.clone())),
            Column::new(SYSTEM_SIZE.into(), numbers(|r| r.power_rating_w)),
            text_column(POSTCODE, details(|d| d.postcode.clone())),
            text_column(PANELS, details(|d| d.panels.clone())),
            text_column(PANEL_POWER, details(|d| d.panel_power_w.clone())),
            text_column(PANEL_BRAND, details(|d| d.panel_brand.clone())),
            text_column(INVERTERS, details(|d| d.inverters.clone())),
            text_column(INVERTER_POWER, details(|d| d.inverter_power_w.clone())),
            text_column(INVERTER_BRAND, details(|d| d.inverter_brand.clone())),
            text_column(ORIENTATION, details(|d| d.orientation.clone())),
            text_column(ARRAY_TILT, details(|d| d.array_tilt.clone())),
            text_column(SHADE, details(|d| d.shade.clone())),
            text_column(INSTALL_DATE, details(|d| d.install_date.clone())),
            text_column(PRECISION, records.iter().map(|r| r.precision.map(|p| p.as_str().to_string()))),
            Column::new(LATITUDE.into(), numbers(|r| Some(r.latitude))),
            Column::new(LONGITUDE.into(), numbers(|r| Some(r.longitude))),
            text_column(STATUS_INTERVAL, details(|d| d.status_interval.clone())),
            Column::new(ELEVATION.into(), numbers(|r| r.elevation_m)),
            Column::new(EARLIEST_OUTPUT.into(), extent(|e| e.start)),
            Column::new(LATEST_OUTPUT.into(), extent(|e| e.end)),
        ])?)
    }
}

/// Decodes a location frame.
///
/// Only `Latitude` and `Longitude` are required. Without a `System ID` column
/// each location is identified by its row index.
pub fn locations_from_frame(frame: &DataFrame) -> Result<Vec<Location>, FrameError> {
    use columns::*;

    let latitudes = required(LATITUDE, floats(frame, LATITUDE)?)?;
    let longitudes = required(LONGITUDE, floats(frame, LONGITUDE)?)?;
    let mut ids = optional(frame, SYSTEM_ID, texts)?.into_iter();
    let mut elevations = optional(frame, ELEVATION, floats)?.into_iter();
    let mut sizes = optional(frame, SYSTEM_SIZE, floats)?.into_iter();
    let mut earliest = optional(frame, EARLIEST_OUTPUT, dates)?.into_iter();
    let mut latest = optional(frame, LATEST_OUTPUT, dates)?.into_iter();
    let text = |name: &str| optional(frame, name, texts).map(Vec::into_iter);
    let mut precision = text(PRECISION)?;
    let mut name = text(SYSTEM_NAME)?;
    let mut postcode = text(POSTCODE)?;
    let mut panels = text(PANELS)?;
    let mut panel_power = text(PANEL_POWER)?;
    let mut panel_brand = text(PANEL_BRAND)?;
    let mut inverters = text(INVERTERS)?;
    let mut inverter_power = text(INVERTER_POWER)?;
    let mut inverter_brand = text(INVERTER_BRAND)?;
    let mut orientation = text(ORIENTATION)?;
    let mut array_tilt = text(ARRAY_TILT)?;
    let mut shade = text(SHADE)?;
    let mut install_date = text(INSTALL_DATE)?;
    let mut status_interval = text(STATUS_INTERVAL)?;

    let locations = latitudes
        .into_iter()
        .zip(longitudes)
        .enumerate()
        .map(|(index, (latitude, longitude))| {
            let id = ids
                .next()
                .flatten()
                .map(LocationId::new)
                .unwrap_or_else(|| LocationId::from(index));
            let extent = match (earliest.next().flatten(), latest.next().flatten()) {
                (Some(start), Some(end)) => DateSpan::new(start, end),
                _ => None,
            };
            Location {
                id,
                latitude,
                longitude,
                elevation_m: elevations.next().flatten(),
                power_rating_w: sizes.next().flatten(),
                precision: precision.next().flatten().as_deref().and_then(CoordinatePrecision::parse),
                extent,
                details: SystemDetails {
                    name: name.next().flatten(),
                    postcode: postcode.next().flatten(),
                    panels: panels.next().flatten(),
                    panel_power_w: panel_power.next().flatten(),
                    panel_brand: panel_brand.next().flatten(),
                    inverters: inverters.next().flatten(),
                    inverter_power_w: inverter_power.next().flatten(),
                    inverter_brand: inverter_brand.next().flatten(),
                    orientation: orientation.next().flatten(),
                    array_tilt: array_tilt.next().flatten(),
                    shade: shade.next().flatten(),
                    install_date: install_date.next().flatten(),
                    status_interval: status_interval.next().flatten(),
                },
            }
        })
        .collect();
    Ok(locations)
}
