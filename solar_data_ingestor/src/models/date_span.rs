use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date format used in every persisted table: "YYYY-MM-DD".
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Date format used by the PV-Output wire protocol: "YYYYMMDD".
pub const COMPACT_DATE: &str = "%Y%m%d";

/// An inclusive range of calendar dates, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    /// Returns `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Moves `start` up to `earliest` if it is earlier. `None` if nothing is left.
    pub fn clamp_start(self, earliest: NaiveDate) -> Option<Self> {
        Self::new(self.start.max(earliest), self.end)
    }

    /// The span with its last day removed, used to skip a partially recorded day.
    pub fn without_last_day(self) -> Option<Self> {
        let end = self.end.checked_sub_days(Days::new(1))?;
        Self::new(self.start, end)
    }
}

impl fmt::Display for DateSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start.format(ISO_DATE), self.end.format(ISO_DATE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn inverted_span_is_rejected() {
        assert!(DateSpan::new(d(2024, 1, 2), d(2024, 1, 1)).is_none());
    }

    #[test]
    fn days_counts_both_ends() {
        let span = DateSpan::new(d(2024, 2, 28), d(2024, 3, 1)).unwrap();
        assert_eq!(span.days(), 3); // leap year
    }

    #[test]
    fn clamp_start_can_empty_the_span() {
        let span = DateSpan::new(d(2021, 1, 1), d(2022, 1, 1)).unwrap();
        assert!(span.clamp_start(d(2022, 3, 1)).is_none());
        let span = DateSpan::new(d(2021, 1, 1), d(2023, 1, 1)).unwrap();
        assert_eq!(span.clamp_start(d(2022, 3, 1)).unwrap().start, d(2022, 3, 1));
    }

    #[test]
    fn single_day_span_has_nothing_left_without_last_day() {
        let span = DateSpan::new(d(2024, 5, 5), d(2024, 5, 5)).unwrap();
        assert!(span.without_last_day().is_none());
    }
}
