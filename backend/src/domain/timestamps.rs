//! Client timestamp parsing.
//!
//! Offline clients send event times in a handful of ISO-8601 shapes. All of
//! them are normalised to UTC and truncated to microseconds, the precision the
//! store keeps, so equality checks against stored rows behave predictably.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};

use super::FieldError;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a client-supplied timestamp.
///
/// Accepts RFC 3339 (any offset), `YYYY-MM-DD HH:MM:SS[.f]` and
/// `YYYY-MM-DDTHH:MM:SS[.f]` without an offset (read as UTC), and a bare
/// `YYYY-MM-DD` date (UTC midnight).
///
/// # Examples
/// ```
/// use spendsync::domain::parse_client_timestamp;
///
/// let ts = parse_client_timestamp("2024-01-01T00:00:00Z").expect("valid timestamp");
/// assert_eq!(ts.to_rfc3339(), "2024-01-01T00:00:00+00:00");
/// ```
pub fn parse_client_timestamp(raw: &str) -> Result<DateTime<Utc>, FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FieldError::Empty);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(normalise(parsed.with_timezone(&Utc)));
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(normalise(parsed.and_utc()));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| normalise(midnight.and_utc()))
        .ok_or(FieldError::InvalidTimestamp)
}

/// Truncate to the store's microsecond precision.
#[must_use]
pub fn normalise(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(6)
}
