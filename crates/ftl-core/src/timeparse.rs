//! Lenient datetime parsing (spec §4.5: "parse the value with a lenient
//! datetime parser ... otherwise rejects") used by the field projector to
//! coerce `datetime`/`date`/`timestamp` fields to an epoch-millisecond
//! integer, and grounded on `original_source/pyparser/time_utils.py`'s
//! `parse_date`/`unix_ms` pair (ISO-8601 first, Unix-seconds-in-calendar-
//! range second, UTC default when no offset is present).

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Unix timestamp for 2000-01-01T00:00:00Z, the lower bound `time_utils.py`
/// accepts for bare-digit Unix-second strings.
const UNIX_SECONDS_MIN: i64 = 946_684_800;
/// Unix timestamp for 2050-01-01T00:00:00Z, the upper bound.
const UNIX_SECONDS_MAX: i64 = 2_524_608_000;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M:%S",
];

const DATE_ONLY_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %b %Y", "%B %d, %Y"];

/// Parse `raw` into a UTC epoch-millisecond timestamp using a fallback chain:
/// RFC 3339 → RFC 2822 → bare Unix-seconds digits in the 2000-2050 range →
/// a handful of common local datetime/date formats (UTC assumed when no
/// offset is present). Returns `None` when nothing matches.
#[must_use]
pub fn parse_lenient_epoch_ms(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return parse_unix_digits(trimmed);
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(to_utc_millis(naive));
        }
    }

    for format in DATE_ONLY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Some(to_utc_millis(naive));
            }
        }
    }

    None
}

fn to_utc_millis(naive: NaiveDateTime) -> i64 {
    Utc.from_utc_datetime(&naive).timestamp_millis()
}

/// A bare run of digits is interpreted as Unix seconds if it falls in the
/// 2000-2050 calendar range, else as Unix milliseconds if the equivalent
/// seconds value does; otherwise rejected (mirrors `time_utils.py`'s
/// `isdigit()` branch, which raises on out-of-range values).
fn parse_unix_digits(digits: &str) -> Option<i64> {
    let n: i64 = digits.parse().ok()?;
    if (UNIX_SECONDS_MIN..UNIX_SECONDS_MAX).contains(&n) {
        return Some(n * 1000);
    }
    let as_seconds = n / 1000;
    if (UNIX_SECONDS_MIN..UNIX_SECONDS_MAX).contains(&as_seconds) {
        return Some(n);
    }
    None
}
