//! Helpers for dynamic field values.
//!
//! Field values are plain [`serde_json::Value`]s. This module holds the
//! coercion and emptiness rules fields apply to them.

use serde_json::{Number, Value};

/// Convert `value` to a number the way form inputs expect.
///
/// Strings are trimmed; the empty string is `0`; `0x`, `0o` and `0b`
/// prefixes are honoured; booleans map to `1`/`0` and null to `0`.
/// Returns `None` when the value has no finite numeric reading.
pub fn to_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => normalize(n),
        Value::Bool(b) => Some(Number::from(u8::from(*b))),
        Value::Null => Some(Number::from(0)),
        Value::String(s) => parse_number(s.trim()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if s.is_empty() {
        return Some(Number::from(0));
    }

    let radix = match s.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return i64::from_str_radix(&s[2..], radix).ok().map(Number::from);
    }

    // f64's parser also accepts "inf" and "nan", which are not numbers here.
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    let parsed: f64 = s.parse().ok()?;
    number_from_f64(parsed)
}

/// Build a JSON number, preferring the integer form for whole values.
pub fn number_from_f64(n: f64) -> Option<Number> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        return Some(Number::from(n as i64));
    }
    Number::from_f64(n)
}

/// Whole floats collapse to their integer form so `5.0` reads as `5`.
fn normalize(n: &Number) -> Option<Number> {
    match n.as_f64() {
        Some(f) if n.is_f64() => number_from_f64(f),
        _ => Some(n.clone()),
    }
}

/// Equality that treats numbers by magnitude, so `5` equals `5.0`.
///
/// Arrays and objects compare element-wise with the same rule.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y || x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(key, v)| y.get(key).is_some_and(|other| loose_eq(v, other)))
        }
        _ => a == b,
    }
}

/// The zero value of `value`'s type, or `None` for types without one.
pub fn zero_of(value: &Value) -> Option<Value> {
    match value {
        Value::Array(_) => Some(Value::Array(Vec::new())),
        Value::Bool(_) => Some(Value::Bool(false)),
        Value::Number(_) => Some(Value::from(0)),
        Value::String(_) => Some(Value::String(String::new())),
        Value::Null | Value::Object(_) => None,
    }
}

/// Structural emptiness: null, `""`, `[]` and `{}` are empty.
///
/// Numbers and booleans are never empty here; fields apply their own
/// number/boolean rules on top.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Render a value the way rule arguments and messages expect.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Number(n) => normalize(n).unwrap_or_else(|| n.clone()).to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_number_strings() {
        assert_eq!(to_number(&json!("7")), Some(Number::from(7)));
        assert_eq!(to_number(&json!(" 42 ")), Some(Number::from(42)));
        assert_eq!(to_number(&json!("")), Some(Number::from(0)));
        assert_eq!(to_number(&json!("0x1f")), Some(Number::from(31)));
        assert_eq!(to_number(&json!("0b101")), Some(Number::from(5)));
        assert_eq!(json!(to_number(&json!("2.5"))), json!(2.5));
        assert_eq!(to_number(&json!("abc")), None);
        assert_eq!(to_number(&json!("inf")), None);
        assert_eq!(to_number(&json!("1.2.3")), None);
    }

    #[test]
    fn test_to_number_other_types() {
        assert_eq!(to_number(&json!(true)), Some(Number::from(1)));
        assert_eq!(to_number(&Value::Null), Some(Number::from(0)));
        assert_eq!(to_number(&json!([1])), None);
    }

    #[test]
    fn test_whole_floats_become_integers() {
        assert_eq!(to_number(&json!(5.0)), Some(Number::from(5)));
        assert_eq!(json!(to_number(&json!(2.5))), json!(2.5));
        assert_eq!(display(&json!(5.0)), "5");
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!(5), &json!(5.0)));
        assert!(loose_eq(&json!([1, { "a": 2.0 }]), &json!([1.0, { "a": 2 }])));
        assert!(!loose_eq(&json!(5), &json!(5.5)));
        assert!(!loose_eq(&json!(5), &json!("5")));
        assert!(!loose_eq(&json!({ "a": 1 }), &json!({ "b": 1 })));
    }

    #[test]
    fn test_zero_of() {
        assert_eq!(zero_of(&json!("x")), Some(json!("")));
        assert_eq!(zero_of(&json!(true)), Some(json!(false)));
        assert_eq!(zero_of(&json!(9.5)), Some(json!(0)));
        assert_eq!(zero_of(&json!([1, 2])), Some(json!([])));
        assert_eq!(zero_of(&Value::Null), None);
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&json!("")));
        assert!(is_blank(&json!([])));
        assert!(is_blank(&Value::Null));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!(false)));
    }
}
