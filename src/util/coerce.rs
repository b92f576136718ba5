//! Loose conversions of upstream JSON values.
//!
//! The medal catalog is produced by a PHP endpoint that is not strict about
//! its types: ids arrive as strings, flags as `"0"`/`"1"` or numbers, and
//! dates as plain strings. These helpers apply the same lenient conversions
//! a JavaScript consumer of the catalog would, e.g. `parseInt` and truthiness.

use serde_json::Value;
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

static DATETIME_SPACE: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

static DATETIME_SPACE_FRAC: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");

static DATETIME_T: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

static DATETIME_T_FRAC: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

static DATE_ONLY: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Whether the value is considered "set".
///
/// `null`, `false`, `0` and the empty string are falsy, everything else is
/// truthy. Note that the string `"0"` is truthy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Reads the leading integer of the value's textual form.
///
/// Leading whitespace is skipped and trailing garbage ignored, so `" 12abc"`
/// yields `12`. Hexadecimal is recognized through a `0x` prefix. Returns
/// `None` if no digit could be read or the result does not fit into an `i32`.
pub fn int(value: &Value) -> Option<i32> {
    let text = scalar_text(value)?;

    parse_int_prefix(&text).and_then(|n| i32::try_from(n).ok())
}

/// Reads the leading decimal number of the value's textual form.
///
/// Returns `None` if no number could be read or the result is not finite.
pub fn float(value: &Value) -> Option<f64> {
    if let Value::Number(n) = value {
        return n.as_f64().filter(|n| n.is_finite());
    }

    let text = scalar_text(value)?;
    let prefix = float_prefix(text.trim_start())?;

    prefix.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Keeps strings as they are and renders any other non-null value as JSON.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parses a date or datetime as wall time at `local` offset.
///
/// Strings may be RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]`,
/// `YYYY-MM-DDTHH:MM:SS[.fff]`, or `YYYY-MM-DD`. Naive values are taken as
/// they are while values that carry an offset are converted to `local`.
/// Numbers are interpreted as milliseconds since the unix epoch.
pub fn datetime(value: &Value, local: UtcOffset) -> Option<PrimitiveDateTime> {
    match value {
        Value::String(s) => parse_datetime(s.trim(), local),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            let nanos = i128::from(millis) * 1_000_000;

            OffsetDateTime::from_unix_timestamp_nanos(nanos)
                .ok()
                .map(|datetime| wall_time(datetime, local))
        }
        _ => None,
    }
}

fn parse_datetime(s: &str, local: UtcOffset) -> Option<PrimitiveDateTime> {
    if s.is_empty() {
        return None;
    }

    if let Ok(datetime) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(wall_time(datetime, local));
    }

    [DATETIME_SPACE, DATETIME_SPACE_FRAC, DATETIME_T, DATETIME_T_FRAC]
        .into_iter()
        .find_map(|format| PrimitiveDateTime::parse(s, format).ok())
        .or_else(|| {
            time::Date::parse(s, DATE_ONLY)
                .ok()
                .map(time::Date::midnight)
        })
}

fn wall_time(datetime: OffsetDateTime, offset: UtcOffset) -> PrimitiveDateTime {
    let local = datetime.to_offset(offset);

    PrimitiveDateTime::new(local.date(), local.time())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();

    let (negative, rest) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = match rest.get(..2) {
        Some("0x" | "0X") => (16, &rest[2..]),
        _ => (10, rest),
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());

    if end == 0 {
        return None;
    }

    let n = i64::from_str_radix(&digits[..end], radix).ok()?;

    Some(if negative { -n } else { n })
}

/// Longest prefix of `s` that reads as a decimal number with optional
/// fraction and exponent.
fn float_prefix(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;

    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }

    let mut mantissa_digits = i - int_start;

    if bytes.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;

        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }

        mantissa_digits += j - frac_start;

        if mantissa_digits > 0 {
            i = j;
        }
    }

    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;

        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }

        let exp_start = j;

        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }

        if j > exp_start {
            i = j;
        }
    }

    Some(&s[..i])
}
