use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};

use crate::error::{ReportError, Result};

/// Date format the portal uses for month-end snapshot tags.
pub const SNAPSHOT_DATE_FORMAT: &str = "%m-%d-%Y";

/// Timestamp format embedded in cleaned output file names.
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Number of trailing month-end snapshots kept for the occupancy trend.
pub const TRAILING_MONTHS: u32 = 12;

// ── Month-end dates ───────────────────────────────────────────────────────────

/// Last day of each of the [`TRAILING_MONTHS`] months before `today`'s month,
/// most recent first.
pub fn trailing_month_end_dates(today: NaiveDate) -> Vec<NaiveDate> {
    let Some(first_of_month) = today.with_day(1) else {
        return Vec::new();
    };

    (1..=TRAILING_MONTHS)
        .filter_map(|i| {
            first_of_month
                .checked_sub_months(Months::new(i))
                .and_then(|first| first.checked_add_months(Months::new(1)))
                .and_then(|next| next.checked_sub_days(Days::new(1)))
        })
        .collect()
}

// ── Formatting / parsing ──────────────────────────────────────────────────────

pub fn format_snapshot_date(date: NaiveDate) -> String {
    date.format(SNAPSHOT_DATE_FORMAT).to_string()
}

/// Parse a `MM-DD-YYYY` snapshot date.
pub fn parse_snapshot_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), SNAPSHOT_DATE_FORMAT)
        .map_err(|_| ReportError::InvalidDate(s.to_string()))
}

/// Second-resolution stamp used in `{prefix}_cleaned_{stamp}.csv`.
pub fn output_timestamp(now: NaiveDateTime) -> String {
    now.format(OUTPUT_TIMESTAMP_FORMAT).to_string()
}

/// Parse the `YYYYmmdd_HHMMSS` part of an output file name.
pub fn parse_output_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, OUTPUT_TIMESTAMP_FORMAT).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trailing_month_end_dates_count_and_order() {
        let dates = trailing_month_end_dates(date(2025, 5, 14));
        assert_eq!(dates.len(), 12);
        assert_eq!(dates[0], date(2025, 4, 30));
        assert_eq!(dates[1], date(2025, 3, 31));
        assert_eq!(dates[11], date(2024, 5, 31));
    }

    #[test]
    fn test_trailing_month_end_dates_leap_february() {
        let dates = trailing_month_end_dates(date(2024, 3, 1));
        assert_eq!(dates[0], date(2024, 2, 29));
        assert_eq!(dates[1], date(2024, 1, 31));
        assert_eq!(dates[2], date(2023, 12, 31));
    }

    #[test]
    fn test_snapshot_date_round_trip() {
        let d = date(2025, 1, 31);
        assert_eq!(format_snapshot_date(d), "01-31-2025");
        assert_eq!(parse_snapshot_date("01-31-2025").unwrap(), d);
    }

    #[test]
    fn test_parse_snapshot_date_invalid() {
        let err = parse_snapshot_date("2025-01-31").unwrap_err();
        assert!(matches!(err, ReportError::InvalidDate(_)));
    }

    #[test]
    fn test_output_timestamp_format() {
        let now = date(2025, 3, 21).and_hms_opt(11, 57, 51).unwrap();
        assert_eq!(output_timestamp(now), "20250321_115751");
        assert_eq!(parse_output_timestamp("20250321_115751"), Some(now));
        assert_eq!(parse_output_timestamp("garbage"), None);
    }
}
