//! Timestamp and calendar helpers

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Format used by the external lesson API ("YYYY-MM-DD HH:MM:SS")
pub const LESSON_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Today's date in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse "YYYY-MM-DD"
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Weekday number with 0 = Sunday
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Whether `s` is a 24-hour "HH:MM" time
pub fn is_valid_time(s: &str) -> bool {
    s.len() == 5 && NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}

/// First and last instant of the month containing `date`
///
/// Returns `(YYYY-MM-01 00:00:00, YYYY-MM-<last> 23:59:59)`.
pub fn month_range(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let first = date.with_day(1).unwrap_or(date);
    let next_month_first = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month_first
        .and_then(|d| d.pred_opt())
        .unwrap_or(first);
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();

    (first.and_time(NaiveTime::default()), last.and_time(end_of_day))
}
