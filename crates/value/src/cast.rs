//! Best-effort casts of raw values.
//!
//! The numeric and boolean casts never fail: anything that cannot be interpreted yields the zero
//! value of the target type. Loosely typed wire input (query strings, form fields, headers) is
//! the common case for a gateway, so a bad number degrades to `0` instead of rejecting the call.
//!
//! Text is parsed with the usual integer literal prefixes (`0x`, `0o`, `0b`, a leading `0` for
//! octal) and `_` digit separators; an all-zero decimal tail such as `"42.00"` is accepted as an
//! integer. Narrowing to `i32` saturates at the bounds instead of wrapping.

use crate::{RawValue, ResolveError};
use serde_json::{Map, Number, Value};

pub fn to_i64(raw: &RawValue) -> i64 {
    match raw {
        RawValue::Text(text) => parse_int(text).unwrap_or(0),
        RawValue::Bytes(bytes) => std::str::from_utf8(bytes).ok().and_then(parse_int).unwrap_or(0),
        RawValue::Json(Value::Number(number)) => number_to_i64(number),
        RawValue::Json(Value::String(text)) => parse_int(text).unwrap_or(0),
        RawValue::Json(Value::Bool(b)) => i64::from(*b),
        RawValue::Json(_) | RawValue::Stream(_) => 0,
    }
}

/// Like [`to_i64`], saturating at the `i32` bounds.
pub fn to_i32(raw: &RawValue) -> i32 {
    let value = to_i64(raw);
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

pub fn to_f64(raw: &RawValue) -> f64 {
    match raw {
        RawValue::Text(text) => text.parse().unwrap_or(0.0),
        RawValue::Bytes(bytes) => std::str::from_utf8(bytes).ok().and_then(|s| s.parse().ok()).unwrap_or(0.0),
        RawValue::Json(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        RawValue::Json(Value::String(text)) => text.parse().unwrap_or(0.0),
        RawValue::Json(Value::Bool(b)) => f64::from(u8::from(*b)),
        RawValue::Json(_) | RawValue::Stream(_) => 0.0,
    }
}

#[allow(clippy::cast_possible_truncation, reason = "a json number narrows to f32 like any other float")]
pub fn to_f32(raw: &RawValue) -> f32 {
    match raw {
        RawValue::Text(text) => text.parse().unwrap_or(0.0),
        RawValue::Bytes(bytes) => std::str::from_utf8(bytes).ok().and_then(|s| s.parse().ok()).unwrap_or(0.0),
        RawValue::Json(Value::String(text)) => text.parse().unwrap_or(0.0),
        RawValue::Json(Value::Number(number)) => number.as_f64().map_or(0.0, |f| f as f32),
        other => f32::from(u8::from(to_bool(other))),
    }
}

pub fn to_bool(raw: &RawValue) -> bool {
    match raw {
        RawValue::Text(text) => parse_bool(text).unwrap_or(false),
        RawValue::Bytes(bytes) => std::str::from_utf8(bytes).ok().and_then(parse_bool).unwrap_or(false),
        RawValue::Json(Value::Bool(b)) => *b,
        RawValue::Json(Value::Number(number)) => number.as_f64().is_some_and(|f| f != 0.0),
        RawValue::Json(Value::String(text)) => parse_bool(text).unwrap_or(false),
        RawValue::Json(_) | RawValue::Stream(_) => false,
    }
}

/// Casts a scalar value to its textual form.
///
/// Arrays, objects and streams have no scalar text form and are rejected.
pub fn to_string(raw: &RawValue) -> Result<String, ResolveError> {
    match raw {
        RawValue::Text(text) | RawValue::Json(Value::String(text)) => Ok(text.clone()),
        RawValue::Bytes(bytes) => String::from_utf8(bytes.to_vec()).map_err(ResolveError::malformed_text),
        RawValue::Json(Value::Null) => Ok(String::new()),
        RawValue::Json(Value::Bool(b)) => Ok(b.to_string()),
        RawValue::Json(Value::Number(number)) => Ok(number.to_string()),
        other => Err(ResolveError::CastString { value: format!("{other:?}"), kind: other.kind() }),
    }
}

/// Casts a value to a string keyed map.
///
/// Objects are taken as they are, text and bytes are decoded as a JSON object. On failure the
/// raw value is handed back so the caller can report it.
pub fn to_string_map(raw: RawValue) -> Result<Map<String, Value>, RawValue> {
    match raw {
        RawValue::Json(Value::Object(map)) => Ok(map),
        RawValue::Text(ref text) | RawValue::Json(Value::String(ref text)) => {
            serde_json::from_str(text).map_err(|_| raw.clone())
        }
        RawValue::Bytes(ref bytes) => serde_json::from_slice(bytes).map_err(|_| raw.clone()),
        other => Err(other),
    }
}

#[allow(clippy::cast_possible_truncation, reason = "floats truncate toward zero when cast to integers")]
#[allow(clippy::cast_possible_wrap, reason = "u64 beyond i64::MAX wraps like the loose integer cast it mirrors")]
fn number_to_i64(number: &Number) -> i64 {
    if let Some(i) = number.as_i64() {
        i
    } else if let Some(u) = number.as_u64() {
        u as i64
    } else {
        number.as_f64().map_or(0, |f| f as i64)
    }
}

/// Parses the boolean spellings `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parses an integer literal, inferring the radix from its prefix.
pub fn parse_int(text: &str) -> Option<i64> {
    let text = trim_zero_decimal(text);
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let (radix, digits, prefixed) = split_radix(unsigned);
    if !underscores_ok(digits, prefixed) {
        return None;
    }

    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() || cleaned.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = i128::from(u64::from_str_radix(&cleaned, radix).ok()?);
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

fn split_radix(unsigned: &str) -> (u32, &str, bool) {
    let lower = unsigned.get(..2).map(str::to_ascii_lowercase);
    match lower.as_deref() {
        Some("0x") => (16, &unsigned[2..], true),
        Some("0o") => (8, &unsigned[2..], true),
        Some("0b") => (2, &unsigned[2..], true),
        _ if unsigned.len() > 1 && unsigned.starts_with('0') => (8, &unsigned[1..], true),
        _ => (10, unsigned, false),
    }
}

// separators may only sit between digits, or right after a radix prefix
fn underscores_ok(digits: &str, prefixed: bool) -> bool {
    if digits.ends_with('_') || digits.contains("__") {
        return false;
    }
    prefixed || !digits.starts_with('_')
}

/// Drops a decimal tail made only of zeros: `"42.00"` becomes `"42"`, `"42.5"` and `"42."`
/// are returned unchanged.
fn trim_zero_decimal(text: &str) -> &str {
    let mut found_zero = false;
    for (i, b) in text.bytes().enumerate().rev() {
        match b {
            b'.' if found_zero => return &text[..i],
            b'.' => {}
            b'0' => found_zero = true,
            _ => return text,
        }
    }
    text
}
