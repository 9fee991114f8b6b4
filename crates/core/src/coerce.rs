//! Boundary coercion for loosely-typed inbound numerics.
//!
//! Clients send the same logical field as a JSON number, a float with an
//! integral value, a decimal string, or `null`/absent. Everything is
//! normalized here to a strict `i64` or an explicit absence before any domain
//! validation runs.

use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// Coerce a loosely-typed value into an integer, or `None` when absent.
///
/// `null` and empty/blank strings count as absent.
pub fn optional_int(field: &'static str, value: &Value) -> DomainResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            if n.as_u64().is_some() {
                return Err(DomainError::uncoercible(field, "number out of range"));
            }
            n.as_f64()
                .and_then(integral)
                .map(Some)
                .ok_or_else(|| DomainError::uncoercible(field, format!("{n} is not an integer")))
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Some(i));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(integral)
                .map(Some)
                .ok_or_else(|| DomainError::uncoercible(field, format!("'{s}' is not an integer")))
        }
        Value::Bool(_) => Err(DomainError::uncoercible(field, "booleans are not accepted")),
        Value::Array(_) | Value::Object(_) => {
            Err(DomainError::uncoercible(field, "expected a number or numeric string"))
        }
    }
}

/// Coerce a loosely-typed value that must be present.
pub fn required_int(field: &'static str, value: &Value) -> DomainResult<i64> {
    optional_int(field, value)?.ok_or_else(|| DomainError::uncoercible(field, "value is required"))
}

/// Coerce a list of loosely-typed values. `null` is an empty list.
pub fn int_list(field: &'static str, value: &Value) -> DomainResult<Vec<i64>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(|v| required_int(field, v)).collect(),
        other => Err(DomainError::uncoercible(
            field,
            format!("expected a list, got {}", kind(other)),
        )),
    }
}

/// Trim a required text field; blank input is a validation failure.
pub fn required_text(field: &'static str, raw: &str) -> DomainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank input becomes `None`.
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn integral(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_native_numbers_strings_and_integral_floats() {
        assert_eq!(optional_int("level", &json!(1)).unwrap(), Some(1));
        assert_eq!(optional_int("level", &json!("1")).unwrap(), Some(1));
        assert_eq!(optional_int("level", &json!(" 12 ")).unwrap(), Some(12));
        assert_eq!(optional_int("level", &json!(1.0)).unwrap(), Some(1));
        assert_eq!(optional_int("level", &json!("2.0")).unwrap(), Some(2));
    }

    #[test]
    fn null_and_blank_are_absent() {
        assert_eq!(optional_int("parent_id", &Value::Null).unwrap(), None);
        assert_eq!(optional_int("parent_id", &json!("")).unwrap(), None);
        assert_eq!(optional_int("parent_id", &json!("   ")).unwrap(), None);
    }

    #[test]
    fn rejects_values_that_are_not_integers() {
        for bad in [json!(1.5), json!("abc"), json!(true), json!([1]), json!({"a": 1})] {
            match optional_int("level", &bad).unwrap_err() {
                DomainError::Uncoercible { field, .. } => assert_eq!(field, "level"),
                other => panic!("expected Uncoercible, got {other:?}"),
            }
        }
        assert!(optional_int("level", &json!(u64::MAX)).is_err());
    }

    #[test]
    fn required_rejects_absence() {
        assert!(required_int("status", &Value::Null).is_err());
        assert_eq!(required_int("status", &json!("0")).unwrap(), 0);
    }

    #[test]
    fn text_fields_are_trimmed() {
        assert_eq!(required_text("name", "  Language ").unwrap(), "Language");
        assert!(matches!(required_text("name", "   "), Err(DomainError::Validation(_))));
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" 555 ")), Some("555".to_string()));
    }

    #[test]
    fn int_list_coerces_each_element() {
        assert_eq!(int_list("coach_ids", &json!([1, "2", 3.0])).unwrap(), vec![1, 2, 3]);
        assert!(int_list("coach_ids", &Value::Null).unwrap().is_empty());
        assert!(int_list("coach_ids", &json!([1, null])).is_err());
        assert!(int_list("coach_ids", &json!("1,2")).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: every integer survives all three wire encodings.
            #[test]
            fn integer_encodings_agree(n in any::<i64>()) {
                prop_assert_eq!(optional_int("n", &json!(n)).unwrap(), Some(n));
                prop_assert_eq!(optional_int("n", &json!(n.to_string())).unwrap(), Some(n));
            }

            /// Property: small integral floats coerce to the same integer.
            #[test]
            fn integral_floats_coerce(n in -1_000_000i64..1_000_000) {
                prop_assert_eq!(optional_int("n", &json!(n as f64)).unwrap(), Some(n));
            }
        }
    }
}
