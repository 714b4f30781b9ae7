// src/domain/dates.rs
//
// All timestamps in the system are RFC3339 strings pinned to UTC+8
// (Malaysia has no DST, so a fixed offset is enough, no tz database).
// Because the offset never varies, lexicographic order on these strings
// equals temporal order, which the SQL range predicates rely on.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Utc, Weekday,
};
use std::cmp::Ordering;

use crate::errors::ServerError;

const OFFSET_HOURS: i32 = 8;

fn tz() -> FixedOffset {
    // 8h east is always a valid offset.
    FixedOffset::east_opt(OFFSET_HOURS * 3600).unwrap()
}

fn canonical(dt: DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Current time as a canonical `+08:00` timestamp.
pub fn now_canonical() -> String {
    canonical(Utc::now().with_timezone(&tz()))
}

/// Parse a `DD/MM/YYYY` display date. Total and defensive: out-of-range
/// day/month/year or a non-calendar date (31/02/...) yields None.
pub fn parse_display_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.trim().splitn(3, '/');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) || !(1900..=2100).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `DD/MM/YYYY` display date -> canonical timestamp at local midnight.
pub fn display_date_to_canonical(raw: &str) -> Option<String> {
    let date = parse_display_date(raw)?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    let dt = tz().from_local_datetime(&midnight).single()?;
    Some(canonical(dt))
}

/// Parse a canonical timestamp. Fails loudly: callers of the arithmetic
/// and comparison helpers are expected to pre-validate their input.
pub fn parse_canonical(ts: &str) -> Result<DateTime<FixedOffset>, ServerError> {
    DateTime::parse_from_rfc3339(ts.trim())
        .map_err(|e| ServerError::BadRequest(format!("invalid timestamp '{ts}': {e}")))
}

/// Canonical timestamp -> `DD/MM/YYYY`, or None if malformed.
pub fn display_date(ts: &str) -> Option<String> {
    let dt = parse_canonical(ts).ok()?;
    Some(dt.format("%d/%m/%Y").to_string())
}

/// Canonical timestamp -> `DD/MM/YYYY HH:mm`, or None if malformed.
pub fn display_date_time(ts: &str) -> Option<String> {
    let dt = parse_canonical(ts).ok()?;
    Some(dt.format("%d/%m/%Y %H:%M").to_string())
}

/// Full month name ("June") of a canonical timestamp.
pub fn month_name(ts: &str) -> Option<String> {
    let dt = parse_canonical(ts).ok()?;
    Some(dt.format("%B").to_string())
}

/// Four-digit year of a canonical timestamp.
pub fn year(ts: &str) -> Option<String> {
    let dt = parse_canonical(ts).ok()?;
    Some(dt.format("%Y").to_string())
}

/// Add N calendar days (N may be negative).
pub fn add_days(ts: &str, days: i64) -> Result<String, ServerError> {
    let dt = parse_canonical(ts)?;
    Ok(canonical(dt + Duration::days(days)))
}

/// Add N business days, walking forward one day at a time and counting
/// only Mon-Fri. O(N), but N never exceeds 3 here. The result for N>=1
/// always lands on a weekday.
pub fn add_business_days(ts: &str, days: u32) -> Result<String, ServerError> {
    let mut dt = parse_canonical(ts)?;
    if days == 0 {
        // identity, byte for byte
        return Ok(ts.trim().to_string());
    }
    let mut counted = 0;
    while counted < days {
        dt = dt + Duration::days(1);
        if !is_weekend(dt.weekday()) {
            counted += 1;
        }
    }
    Ok(canonical(dt))
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Whole calendar days from `b` to `a` (positive when `a` is later).
pub fn day_diff(a: &str, b: &str) -> Result<i64, ServerError> {
    let a = parse_canonical(a)?;
    let b = parse_canonical(b)?;
    Ok((a.date_naive() - b.date_naive()).num_days())
}

/// Compare two canonical timestamps as instants.
pub fn compare(a: &str, b: &str) -> Result<Ordering, ServerError> {
    let a = parse_canonical(a)?;
    let b = parse_canonical(b)?;
    Ok(a.cmp(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_display_date_accepts_valid() {
        let d = parse_display_date("15/06/2024").unwrap();
        assert_eq!((d.day(), d.month(), d.year()), (15, 6, 2024));
        assert!(parse_display_date(" 01/01/1900 ").is_some());
        assert!(parse_display_date("31/12/2100").is_some());
    }

    #[test]
    fn parse_display_date_rejects_garbage() {
        assert!(parse_display_date("").is_none());
        assert!(parse_display_date("2024-06-15").is_none());
        assert!(parse_display_date("32/01/2024").is_none());
        assert!(parse_display_date("15/13/2024").is_none());
        assert!(parse_display_date("15/06/1899").is_none());
        assert!(parse_display_date("15/06/2101").is_none());
        // day in range but not a real calendar date
        assert!(parse_display_date("31/02/2024").is_none());
        assert!(parse_display_date("aa/bb/cccc").is_none());
        assert!(parse_display_date("15/06/2024/extra").is_none());
    }

    #[test]
    fn display_date_round_trips() {
        let ts = display_date_to_canonical("15/06/2024").unwrap();
        assert_eq!(ts, "2024-06-15T00:00:00+08:00");
        assert_eq!(display_date(&ts).unwrap(), "15/06/2024");
        assert_eq!(display_date_time(&ts).unwrap(), "15/06/2024 00:00");
        assert_eq!(month_name(&ts).unwrap(), "June");
        assert_eq!(year(&ts).unwrap(), "2024");
    }

    #[test]
    fn now_canonical_carries_offset() {
        assert!(now_canonical().ends_with("+08:00"));
    }

    #[test]
    fn add_days_spans_months() {
        let ts = display_date_to_canonical("30/06/2024").unwrap();
        assert_eq!(add_days(&ts, 2).unwrap(), "2024-07-02T00:00:00+08:00");
        assert_eq!(add_days(&ts, -1).unwrap(), "2024-06-29T00:00:00+08:00");
    }

    #[test]
    fn add_business_days_zero_is_identity() {
        let ts = display_date_to_canonical("15/06/2024").unwrap();
        assert_eq!(add_business_days(&ts, 0).unwrap(), ts);
    }

    #[test]
    fn add_business_days_skips_weekends() {
        // 14/06/2024 is a Friday
        let friday = display_date_to_canonical("14/06/2024").unwrap();
        assert_eq!(
            add_business_days(&friday, 1).unwrap(),
            "2024-06-17T00:00:00+08:00" // Monday
        );
        assert_eq!(
            add_business_days(&friday, 2).unwrap(),
            "2024-06-18T00:00:00+08:00" // Tuesday
        );

        // starting on a Saturday still lands on Monday
        let saturday = display_date_to_canonical("15/06/2024").unwrap();
        assert_eq!(
            add_business_days(&saturday, 1).unwrap(),
            "2024-06-17T00:00:00+08:00"
        );
    }

    #[test]
    fn add_business_days_never_lands_on_weekend() {
        let start = display_date_to_canonical("10/06/2024").unwrap();
        for n in 1..=15u32 {
            let ts = add_business_days(&start, n).unwrap();
            let dt = parse_canonical(&ts).unwrap();
            assert!(!is_weekend(dt.weekday()), "n={n} landed on {ts}");
        }
    }

    #[test]
    fn day_diff_and_compare() {
        let a = display_date_to_canonical("25/06/2024").unwrap();
        let b = display_date_to_canonical("15/06/2024").unwrap();
        assert_eq!(day_diff(&a, &b).unwrap(), 10);
        assert_eq!(day_diff(&b, &a).unwrap(), -10);
        assert_eq!(compare(&a, &b).unwrap(), Ordering::Greater);
        assert_eq!(compare(&b, &a).unwrap(), Ordering::Less);
        assert_eq!(compare(&a, &a).unwrap(), Ordering::Equal);
    }

    #[test]
    fn arithmetic_fails_loudly_on_malformed_input() {
        assert!(add_days("15/06/2024", 1).is_err());
        assert!(add_business_days("not a date", 1).is_err());
        assert!(compare("x", "y").is_err());
    }
}
