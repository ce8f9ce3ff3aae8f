//! Validation of the raw query string values.
//!
//! `page` and `size` are checked with [`validate_parameters`]; a failure
//! there is an ordinary 400 for the caller. Date bounds go through
//! [`is_valid_date`] first and only then through [`parse_date`]: the
//! validator never fails, while the parser treats bad input as a fatal
//! error because a validated value can no longer be malformed.

use crate::error::{HandlerError, HandlerResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Date-only bound, e.g. `2023-01-15`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-time bound, e.g. `2023-01-15 08:30:00`.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Character layout of each accepted form: `d` is an ASCII digit, any
/// other character must match exactly.
const DATE_LAYOUT: &str = "dddd-dd-dd";
const DATE_TIME_LAYOUT: &str = "dddd-dd-dd dd:dd:dd";

/// Parse a page/size value as a non-negative integer.
///
/// Integral floats such as `"2.0"` or `"-0.0"` are accepted; `"2.5"` is not.
pub fn parse_non_negative(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return (value >= 0).then_some(value);
    }

    let value = trimmed.parse::<f64>().ok()?;
    if !value.is_finite() || is_fractional(value) || value < 0.0 {
        return None;
    }
    // 2^63 is the first float outside the i64 range.
    if value >= i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

fn is_fractional(value: f64) -> bool {
    (value - value.trunc()).abs() > 0.0
}

/// Check that both `page` and `size` are non-negative integers.
pub fn validate_parameters(page: &str, size: &str) -> bool {
    parse_non_negative(page).is_some() && parse_non_negative(size).is_some()
}

/// Check an optional update-date bound without failing.
pub fn is_valid_date(value: Option<&str>) -> bool {
    value.is_some_and(|v| parse_date(v).is_ok())
}

/// Parse an update-date bound.
///
/// Date-only values resolve to midnight of that day. Anything that is not
/// exactly one of the two accepted formats is an error.
pub fn parse_date(value: &str) -> HandlerResult<NaiveDateTime> {
    let parsed = if matches_layout(value, DATE_LAYOUT) {
        NaiveDate::parse_from_str(value, DATE_FORMAT).map(|date| date.and_time(NaiveTime::MIN))
    } else if matches_layout(value, DATE_TIME_LAYOUT) {
        NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
    } else {
        return Err(HandlerError::invalid_date(value));
    };
    parsed.map_err(|_| HandlerError::invalid_date(value))
}

/// chrono tolerates signs and single-digit fields; the accepted forms
/// are strictly zero-padded.
fn matches_layout(value: &str, layout: &str) -> bool {
    value.len() == layout.len()
        && value.bytes().zip(layout.bytes()).all(|(c, l)| match l {
            b'd' => c.is_ascii_digit(),
            _ => c == l,
        })
}
