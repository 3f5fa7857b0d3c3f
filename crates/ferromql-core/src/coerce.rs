//! Coercion of user-supplied filter values into the attribute's declared
//! type.
//!
//! Filter documents usually arrive from JavaScript clients, so values come
//! in loose: numbers as strings, booleans as `"0"`, dates as text. Each
//! comparison operand is coerced here before it is stored in a predicate
//! leaf; emitters can then trust leaf values to match the attribute type.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::error::FieldError;
use crate::model::AttrType;
use crate::predicate::CompareOp;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Coerce `value` to `attr_type`, or fail with a type-mismatch error
/// naming `path` and `op`.
///
/// JSON `null` and the string `"null"` (any case) coerce to `null` for
/// every attribute type.
pub fn coerce(
    value: &Value,
    attr_type: AttrType,
    path: &str,
    op: CompareOp,
) -> Result<Value, FieldError> {
    let mismatch = || FieldError::TypeMismatch {
        path: path.to_string(),
        op,
        expected: attr_type,
    };

    if value.is_null() {
        return Ok(Value::Null);
    }
    if let Some(s) = value.as_str()
        && s.eq_ignore_ascii_case("null")
    {
        return Ok(Value::Null);
    }

    match attr_type {
        AttrType::Integer => coerce_integer(value).ok_or_else(mismatch),
        AttrType::Float => coerce_float(value).ok_or_else(mismatch),
        AttrType::Boolean => Ok(Value::Bool(coerce_boolean(value))),
        AttrType::String => coerce_string(value).ok_or_else(mismatch),
        AttrType::Date => coerce_temporal(value, DATE_FORMAT, |s, f| {
            NaiveDate::parse_from_str(s, f).map(|d| d.format(f).to_string())
        })
        .ok_or_else(mismatch),
        AttrType::DateTime => coerce_temporal(value, DATETIME_FORMAT, |s, f| {
            NaiveDateTime::parse_from_str(s, f).map(|d| d.format(f).to_string())
        })
        .ok_or_else(mismatch),
        AttrType::Time => coerce_temporal(value, TIME_FORMAT, |s, f| {
            NaiveTime::parse_from_str(s, f).map(|t| t.format(f).to_string())
        })
        .ok_or_else(mismatch),
    }
}

fn coerce_integer(value: &Value) -> Option<Value> {
    if let Some(i) = value.as_i64() {
        return Some(Value::from(i));
    }
    if let Some(f) = value.as_f64() {
        // Integral floats pass; fractional values are rejected rather than
        // silently truncated.
        if f.fract() == 0.0 && f.is_finite() {
            return Some(Value::from(f as i64));
        }
        return None;
    }
    value.as_str()?.trim().parse::<i64>().ok().map(Value::from)
}

fn coerce_float(value: &Value) -> Option<Value> {
    if let Some(f) = value.as_f64() {
        return Some(Value::from(f));
    }
    value.as_str()?.trim().parse::<f64>().ok().map(Value::from)
}

/// Loose boolean semantics: `false`, `"false"`, `"0"` and `0` are false,
/// everything else is true.
fn coerce_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !(s.eq_ignore_ascii_case("false") || s == "0"),
        _ => true,
    }
}

fn coerce_string(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => Some(Value::String(s.clone())),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn coerce_temporal<F>(value: &Value, format: &str, parse: F) -> Option<Value>
where
    F: Fn(&str, &str) -> Result<String, chrono::ParseError>,
{
    let s = value.as_str()?;
    parse(s.trim(), format).ok().map(Value::String)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(value: Value, attr_type: AttrType) -> Result<Value, FieldError> {
        coerce(&value, attr_type, "field", CompareOp::Eq)
    }

    #[test]
    fn test_null_passthrough() {
        assert_eq!(run(Value::Null, AttrType::Integer).unwrap(), Value::Null);
        assert_eq!(run(json!("null"), AttrType::String).unwrap(), Value::Null);
        assert_eq!(run(json!("NULL"), AttrType::Boolean).unwrap(), Value::Null);
    }

    #[test]
    fn test_integer_from_number() {
        assert_eq!(run(json!(5), AttrType::Integer).unwrap(), json!(5));
        assert_eq!(run(json!(5.0), AttrType::Integer).unwrap(), json!(5));
    }

    #[test]
    fn test_integer_from_string() {
        assert_eq!(run(json!("42"), AttrType::Integer).unwrap(), json!(42));
        assert_eq!(run(json!(" 42 "), AttrType::Integer).unwrap(), json!(42));
    }

    #[test]
    fn test_integer_rejects_fractional() {
        assert!(run(json!(5.7), AttrType::Integer).is_err());
        assert!(run(json!("5.7"), AttrType::Integer).is_err());
    }

    #[test]
    fn test_integer_rejects_garbage() {
        assert!(run(json!("abc"), AttrType::Integer).is_err());
        assert!(run(json!([1]), AttrType::Integer).is_err());
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(run(json!(2.5), AttrType::Float).unwrap(), json!(2.5));
        assert_eq!(run(json!(3), AttrType::Float).unwrap(), json!(3.0));
        assert_eq!(run(json!("2.5"), AttrType::Float).unwrap(), json!(2.5));
        assert!(run(json!("abc"), AttrType::Float).is_err());
    }

    #[test]
    fn test_boolean_loose_semantics() {
        assert_eq!(run(json!(false), AttrType::Boolean).unwrap(), json!(false));
        assert_eq!(run(json!("false"), AttrType::Boolean).unwrap(), json!(false));
        assert_eq!(run(json!("0"), AttrType::Boolean).unwrap(), json!(false));
        assert_eq!(run(json!(0), AttrType::Boolean).unwrap(), json!(false));
        // Everything else is true.
        assert_eq!(run(json!(true), AttrType::Boolean).unwrap(), json!(true));
        assert_eq!(run(json!("no"), AttrType::Boolean).unwrap(), json!(true));
        assert_eq!(run(json!(2), AttrType::Boolean).unwrap(), json!(true));
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(run(json!("x"), AttrType::String).unwrap(), json!("x"));
        assert_eq!(run(json!(5), AttrType::String).unwrap(), json!("5"));
        assert_eq!(run(json!(true), AttrType::String).unwrap(), json!("true"));
        assert!(run(json!({"a": 1}), AttrType::String).is_err());
    }

    #[test]
    fn test_date_coercion() {
        assert_eq!(
            run(json!("2024-03-01"), AttrType::Date).unwrap(),
            json!("2024-03-01")
        );
        assert!(run(json!("2024-13-01"), AttrType::Date).is_err());
        assert!(run(json!("03/01/2024"), AttrType::Date).is_err());
        assert!(run(json!(20240301), AttrType::Date).is_err());
    }

    #[test]
    fn test_datetime_coercion() {
        assert_eq!(
            run(json!("2024-03-01 13:45:00"), AttrType::DateTime).unwrap(),
            json!("2024-03-01 13:45:00")
        );
        assert!(run(json!("2024-03-01"), AttrType::DateTime).is_err());
    }

    #[test]
    fn test_time_coercion() {
        assert_eq!(
            run(json!("13:45:00"), AttrType::Time).unwrap(),
            json!("13:45:00")
        );
        assert!(run(json!("25:00:00"), AttrType::Time).is_err());
    }

    #[test]
    fn test_error_carries_context() {
        let err = coerce(&json!("abc"), AttrType::Integer, "album_id", CompareOp::Gt).unwrap_err();
        assert_eq!(err.path(), "album_id");
        assert_eq!(err.code(), "data_conversion_error");
    }
}
