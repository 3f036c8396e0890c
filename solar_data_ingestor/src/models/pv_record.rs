//! Daily PV output rows as reported by the PV-Output service.

use chrono::NaiveDate;
use polars::prelude::*;

use crate::{
    frame::{FrameError, ToFrame},
    models::location_id::LocationId,
};

/// Column names of the PV output table, in output order.
pub mod columns {
    pub const SYSTEM_ID: &str = "System ID";
    pub const DATE: &str = "Date";
    pub const ENERGY_GENERATED: &str = "Energy Generated (Wh)";
    pub const EFFICIENCY: &str = "Efficiency (kWh/kW)";
    pub const ENERGY_EXPORTED: &str = "Energy Exported (Wh)";
    pub const ENERGY_USED: &str = "Energy Used (Wh)";
    pub const PEAK_POWER: &str = "Peak Power (W)";
    pub const PEAK_TIME: &str = "Peak Time";
    pub const CONDITION: &str = "Condition";
    pub const MIN_TEMP: &str = "Min Temp (°C)";
    pub const MAX_TEMP: &str = "Max Temp (°C)";
    pub const PEAK_IMPORT: &str = "Peak Energy Import (Wh)";
    pub const OFF_PEAK_IMPORT: &str = "Off Peak Energy Import (Wh)";
    pub const SHOULDER_IMPORT: &str = "Shoulder Energy Import (Wh)";
    pub const HIGH_SHOULDER_IMPORT: &str = "High Shoulder Energy Import (Wh)";
    pub const INSOLATION: &str = "Insolation (Wh)";

    pub const ALL: [&str; 16] = [
        SYSTEM_ID,
        DATE,
        ENERGY_GENERATED,
        EFFICIENCY,
        ENERGY_EXPORTED,
        ENERGY_USED,
        PEAK_POWER,
        PEAK_TIME,
        CONDITION,
        MIN_TEMP,
        MAX_TEMP,
        PEAK_IMPORT,
        OFF_PEAK_IMPORT,
        SHOULDER_IMPORT,
        HIGH_SHOULDER_IMPORT,
        INSOLATION,
    ];
}

/// One installation's output on one day.
///
/// `(location_id, date)` is unique within a single acquisition result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PvDailyRecord {
    pub location_id: LocationId,
    pub date: NaiveDate,
    pub energy_generated_wh: Option<f64>,
    pub efficiency_kwh_per_kw: Option<f64>,
    pub energy_exported_wh: Option<f64>,
    pub energy_used_wh: Option<f64>,
    pub peak_power_w: Option<f64>,
    pub peak_time: Option<String>,
    pub condition: Option<String>,
    pub min_temp_c: Option<f64>,
    pub max_temp_c: Option<f64>,
    pub peak_import_wh: Option<f64>,
    pub off_peak_import_wh: Option<f64>,
    pub shoulder_import_wh: Option<f64>,
    pub high_shoulder_import_wh: Option<f64>,
    pub insolation_wh: Option<f64>,
}

impl PvDailyRecord {
    pub fn new(location_id: LocationId, date: NaiveDate) -> Self {
        Self {
            location_id,
            date,
            ..Default::default()
        }
    }
}

impl ToFrame for PvDailyRecord {
    fn to_frame(records: &[Self]) -> Result<DataFrame, FrameError> {
        use columns::*;

        let number = |name: &str, f: fn(&PvDailyRecord) -> Option<f64>| {
            Column::new(name.into(), records.iter().map(f).collect::<Vec<_>>())
        };
        let text = |name: &str, f: fn(&PvDailyRecord) -> Option<String>| {
            Column::new(name.into(), records.iter().map(f).collect::<Vec<_>>())
        };

        Ok(DataFrame::new(vec![
            Column::new(
                SYSTEM_ID.into(),
                records.iter().map(|r| r.location_id.to_string()).collect::<Vec<_>>(),
            ),
            Column::new(DATE.into(), records.iter().map(|r| r.date).collect::<Vec<_>>()),
            number(ENERGY_GENERATED, |r| r.energy_generated_wh),
            number(EFFICIENCY, |r| r.efficiency_kwh_per_kw),
            number(ENERGY_EXPORTED, |r| r.energy_exported_wh),
            number(ENERGY_USED, |r| r.energy_used_wh),
            number(PEAK_POWER, |r| r.peak_power_w),
            text(PEAK_TIME, |r| r.peak_time.clone()),
            text(CONDITION, |r| r.condition.clone()),
            number(MIN_TEMP, |r| r.min_temp_c),
            number(MAX_TEMP, |r| r.max_temp_c),
            number(PEAK_IMPORT, |r| r.peak_import_wh),
            number(OFF_PEAK_IMPORT, |r| r.off_peak_import_wh),
            number(SHOULDER_IMPORT, |r| r.shoulder_import_wh),
            number(HIGH_SHOULDER_IMPORT, |r| r.high_shoulder_import_wh),
            number(INSOLATION, |r| r.insolation_wh),
        ])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{dates, floats, texts};

    #[test]
    fn frame_follows_the_column_order() {
        let record = PvDailyRecord {
            energy_generated_wh: Some(12_400.0),
            efficiency_kwh_per_kw: Some(3.1),
            condition: Some("Fine".into()),
            ..PvDailyRecord::new(LocationId::from(66991u64), NaiveDate::from_ymd_opt(2023, 1, 2).unwrap())
        };
        let frame = PvDailyRecord::to_frame(&[record, PvDailyRecord::default()]).unwrap();

        let names: Vec<&str> = frame.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, columns::ALL);
        assert_eq!(texts(&frame, columns::SYSTEM_ID).unwrap()[0].as_deref(), Some("66991"));
        assert_eq!(dates(&frame, columns::DATE).unwrap()[0], NaiveDate::from_ymd_opt(2023, 1, 2));
        assert_eq!(floats(&frame, columns::EFFICIENCY).unwrap(), vec![Some(3.1), None]);
        assert_eq!(texts(&frame, columns::CONDITION).unwrap()[1], None);
    }

    #[test]
    fn no_records_still_have_every_column() {
        let frame = PvDailyRecord::to_frame(&[]).unwrap();
        assert_eq!(frame.height(), 0);
        assert_eq!(frame.width(), columns::ALL.len());
    }
}
