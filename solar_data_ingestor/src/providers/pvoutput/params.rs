use crate::models::{
    date_span::{COMPACT_DATE, DateSpan},
    location_id::LocationId,
};

pub const BASE_URL: &str = "https://pvoutput.org/service/r2";

pub const SYSTEM_ENDPOINT: &str = "getsystem.jsp";
pub const STATISTIC_ENDPOINT: &str = "getstatistic.jsp";
pub const OUTPUT_ENDPOINT: &str = "getoutput.jsp";

pub const API_KEY_HEADER: &str = "x-pvoutput-apikey";
pub const SYSTEM_ID_HEADER: &str = "x-pvoutput-systemid";

/// Rows returned by one `getoutput` call, the donor maximum.
pub const OUTPUT_ROW_LIMIT: u32 = 150;

pub type QueryParams = Vec<(&'static str, String)>;

/// `sid1` selects the system being read, which need not be the caller's own.
pub fn system_params(id: &LocationId) -> QueryParams {
    vec![("sid1", id.to_string())]
}

pub fn statistic_params(id: &LocationId) -> QueryParams {
    vec![("sid1", id.to_string())]
}

pub fn output_params(id: &LocationId, span: DateSpan) -> QueryParams {
    vec![
        ("sid1", id.to_string()),
        ("limit", OUTPUT_ROW_LIMIT.to_string()),
        ("df", span.start.format(COMPACT_DATE).to_string()),
        ("dt", span.end.format(COMPACT_DATE).to_string()),
        ("insolation", "1".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn output_params_use_compact_dates() {
        let span = DateSpan::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 5, 30).unwrap(),
        )
        .unwrap();
        let params = output_params(&LocationId::from(66991u64), span);
        assert_eq!(
            params,
            vec![
                ("sid1", "66991".to_string()),
                ("limit", "150".to_string()),
                ("df", "20230101".to_string()),
                ("dt", "20230530".to_string()),
                ("insolation", "1".to_string()),
            ]
        );
    }
}
