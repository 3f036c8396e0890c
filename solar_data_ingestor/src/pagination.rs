//! Splitting an inclusive date interval into per-call sub-intervals.

use std::iter::FusedIterator;

use chrono::{Days, NaiveDate};

use crate::models::date_span::DateSpan;

/// Max span of one PV-Output `getoutput` call: 150 days, first day included.
pub const PV_OUTPUT_MAX_SPAN_DAYS: u64 = 149;

/// Max span of one weather history call when a location spans more than a year.
pub const WEATHER_MAX_SPAN_DAYS: u64 = 364;

/// Lazy sequence of disjoint sub-intervals covering a [`DateSpan`].
///
/// Each sub-interval holds at most `max_span_days + 1` days. Sub-intervals are
/// produced earliest first, each one starting the day after the previous one
/// ended, and the last one is clipped to the end of the span. Cloning the
/// paginator (or calling [`DatePaginator::restart`]) gives a fresh sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePaginator {
    span: DateSpan,
    max_span_days: u64,
    next_start: Option<NaiveDate>,
}

impl DatePaginator {
    pub fn new(span: DateSpan, max_span_days: u64) -> Self {
        Self {
            span,
            max_span_days,
            next_start: Some(span.start),
        }
    }

    pub fn span(&self) -> DateSpan {
        self.span
    }

    /// A paginator over the same span, positioned at the beginning.
    pub fn restart(&self) -> Self {
        Self::new(self.span, self.max_span_days)
    }
}

impl Iterator for DatePaginator {
    type Item = DateSpan;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        let end = start
            .checked_add_days(Days::new(self.max_span_days))
            .map_or(self.span.end, |end| end.min(self.span.end));

        self.next_start = end
            .succ_opt()
            .filter(|next| *next <= self.span.end);

        DateSpan::new(start, end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next_start.and_then(|s| DateSpan::new(s, self.span.end)) {
            Some(rest) => {
                let n = rest.days().div_ceil(self.max_span_days + 1) as usize;
                (n, Some(n))
            }
            None => (0, Some(0)),
        }
    }
}

impl ExactSizeIterator for DatePaginator {}

impl FusedIterator for DatePaginator {}

/// Shorthand for [`DatePaginator::new`].
pub fn paginate(span: DateSpan, max_span_days: u64) -> DatePaginator {
    DatePaginator::new(span, max_span_days)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn pv_windows_are_150_days() {
        let span = DateSpan::new(d(2023, 1, 1), d(2023, 12, 31)).unwrap();
        let windows: Vec<_> = paginate(span, PV_OUTPUT_MAX_SPAN_DAYS).collect();

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], DateSpan::new(d(2023, 1, 1), d(2023, 5, 30)).unwrap());
        assert_eq!(windows[0].days(), 150);
        assert_eq!(windows[1].start, d(2023, 5, 31));
        assert_eq!(windows[2].end, d(2023, 12, 31));
    }

    #[test]
    fn single_day_span_is_one_window() {
        let span = DateSpan::new(d(2024, 2, 29), d(2024, 2, 29)).unwrap();
        let windows: Vec<_> = paginate(span, WEATHER_MAX_SPAN_DAYS).collect();
        assert_eq!(windows, vec![span]);
    }

    #[test]
    fn zero_max_span_gives_one_day_windows() {
        let span = DateSpan::new(d(2024, 1, 1), d(2024, 1, 3)).unwrap();
        let windows: Vec<_> = paginate(span, 0).collect();
        assert_eq!(windows.len(), 3);
        assert!(windows.iter().all(|w| w.days() == 1));
    }

    #[test]
    fn restart_replays_the_sequence() {
        let span = DateSpan::new(d(2022, 3, 1), d(2024, 3, 1)).unwrap();
        let mut pages = paginate(span, WEATHER_MAX_SPAN_DAYS);
        let first: Vec<_> = pages.by_ref().collect();
        assert_eq!(pages.next(), None);
        assert_eq!(pages.restart().collect::<Vec<_>>(), first);
    }

    proptest! {
        #[test]
        fn windows_tile_the_span_exactly(
            offset in 0i64..3000,
            len in 0i64..2000,
            max_span in 0u64..400,
        ) {
            let start = d(2015, 1, 1) + chrono::Duration::days(offset);
            let end = start + chrono::Duration::days(len);
            let span = DateSpan::new(start, end).unwrap();

            let pages = paginate(span, max_span);
            let expected_len = pages.len();
            let windows: Vec<_> = pages.collect();

            prop_assert_eq!(windows.len(), expected_len);
            prop_assert_eq!(windows.first().map(|w| w.start), Some(start));
            prop_assert_eq!(windows.last().map(|w| w.end), Some(end));
            for w in &windows {
                prop_assert!(w.days() <= max_span + 1);
            }
            for pair in windows.windows(2) {
                prop_assert_eq!(pair[0].end.succ_opt(), Some(pair[1].start));
            }
            let covered: u64 = windows.iter().map(DateSpan::days).sum();
            prop_assert_eq!(covered, span.days());
        }
    }
}
