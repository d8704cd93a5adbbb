//! UTC calendar days.
//!
//! The whole engine compares days in UTC. Instants with an offset are
//! converted before their day is taken; naive timestamps are read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::EngineError;

/// Parse a ledger date into the instant it denotes.
///
/// Accepts `YYYY-MM-DD` (midnight UTC), `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (read as UTC) and RFC 3339 with an offset.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, EngineError> {
    let trimmed = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(EngineError::InvalidDate {
        value: value.to_string(),
    })
}

/// Parse a ledger date and return its UTC calendar day.
pub fn parse_day(value: &str) -> Result<NaiveDate, EngineError> {
    parse_instant(value).map(|instant| instant.date_naive())
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Every day in `[start, end]`, ascending. Empty when `end < start`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Number of days in `[start, end]`; zero when `end < start`.
pub fn day_count(start: NaiveDate, end: NaiveDate) -> usize {
    let span = (end - start).num_days();
    if span < 0 {
        0
    } else {
        span as usize + 1
    }
}
