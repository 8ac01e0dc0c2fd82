//! Per-field normalization run before an instance is considered well-formed.
//!
//! For each declared field, in declaration order:
//!
//! 1. absent input falls back to the field's declared default;
//! 2. pre-validators run (`always` hooks even when the field is absent);
//! 3. null is accepted only for optional fields;
//! 4. the value is coerced to the field's kind;
//! 5. the semantic validator, if any, normalizes the coerced value.
//!
//! The first failure aborts the whole row. Input entries that name no
//! declared field are ignored.

use chrono::DateTime;
use tracing::warn;

use crate::catalog::{FieldDecl, FieldKind, FieldSet, ScalarType};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;

/// Validate a raw, field-keyed row against a field set.
///
/// The returned row carries every declared field, in declaration order.
pub fn validate(set: &FieldSet, raw: Row) -> Result<Row> {
    let mut raw = raw;
    let mut out = Row::new();

    for field in &set.fields {
        let value = validate_field(set, field, raw.remove(&field.name)).map_err(|reason| {
            warn!(entity = %set.name, field = %field.name, %reason, "validation failed");
            Error::validation(&set.name, &field.name, reason)
        })?;
        out.set(field.name.clone(), value);
    }

    Ok(out)
}

fn validate_field(
    set: &FieldSet,
    field: &FieldDecl,
    input: Option<Value>,
) -> std::result::Result<Value, String> {
    let present = input.is_some();
    let mut value = match input {
        Some(value) => value,
        None => field.default.clone().unwrap_or(Value::Null),
    };

    for hook in set.pre_validators_for(&field.name) {
        if hook.is_always() || present {
            value = hook.apply(value)?;
        }
    }

    if value.is_null() {
        return if field.optional {
            Ok(Value::Null)
        } else {
            Err("field required".into())
        };
    }

    let value = coerce(&field.kind, value)?;

    match &field.validator {
        // the canonical empty string stands for "unset"
        Some(_) if value.as_str() == Some("") => Ok(value),
        Some(validator) => validator.validate(value),
        None => Ok(value),
    }
}

/// Coerce a non-null value to a field kind.
pub fn coerce(kind: &FieldKind, value: Value) -> std::result::Result<Value, String> {
    match kind {
        FieldKind::Scalar(scalar) => coerce_scalar(*scalar, value),
        FieldKind::Foreign { entity } => match value {
            Value::Int(_) | Value::String(_) => Ok(value),
            other => Err(format!(
                "expected a primary key of {}, found {}",
                entity,
                other.type_name()
            )),
        },
        FieldKind::Structured => match value {
            Value::Json(_) => Ok(value),
            other => Ok(Value::Json(other.to_plain_json())),
        },
    }
}

fn coerce_scalar(scalar: ScalarType, value: Value) -> std::result::Result<Value, String> {
    let mismatch = |value: &Value| {
        Err(format!(
            "expected {:?}, found {}",
            scalar,
            value.type_name()
        ))
    };

    match (scalar, value) {
        (ScalarType::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
        (ScalarType::Bool, Value::Int(i @ (0 | 1))) => Ok(Value::Bool(i == 1)),
        (ScalarType::Bool, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(format!("'{}' is not a valid boolean", s)),
        },

        (ScalarType::Int, Value::Int(i)) => Ok(Value::Int(i)),
        (ScalarType::Int, Value::Float(f)) if f.fract() == 0.0 && f.is_finite() => {
            Ok(Value::Int(f as i64))
        }
        (ScalarType::Int, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("'{}' is not a valid integer", s)),

        (ScalarType::Float, Value::Float(f)) if f.is_finite() => Ok(Value::Float(f)),
        (ScalarType::Float, Value::Float(f)) => Err(format!("{} is not a finite number", f)),
        (ScalarType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (ScalarType::Float, Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(format!("'{}' is not a valid number", s)),
        },

        (ScalarType::String, Value::String(s)) => Ok(Value::String(s)),
        (ScalarType::String, Value::Int(i)) => Ok(Value::String(i.to_string())),
        (ScalarType::String, Value::Float(f)) => Ok(Value::String(f.to_string())),

        (ScalarType::Timestamp, Value::Timestamp(t)) => Ok(Value::Timestamp(t)),
        (ScalarType::Timestamp, Value::Int(t)) => Ok(Value::Timestamp(t)),
        (ScalarType::Timestamp, Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Value::Timestamp(dt.timestamp_micros()))
            .map_err(|_| format!("'{}' is not a valid RFC 3339 timestamp", s)),

        (_, other) => mismatch(&other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDecl, ViewDecl};
    use crate::validation::{EmailValidator, PreValidator, SecretValidator};
    use crate::value::Secret;

    fn user() -> FieldSet {
        EntityDecl::standard("User", "users")
            .field(FieldDecl::scalar("full_name", ScalarType::String))
            .field(FieldDecl::scalar("email", ScalarType::String).with_validator(EmailValidator))
            .field(
                FieldDecl::optional("password", ScalarType::String)
                    .with_validator(SecretValidator::new().with_max_length(64)),
            )
            .field(FieldDecl::optional("age", ScalarType::Int))
            .pre_validator("full_name", PreValidator::empty_string())
            .shape
    }

    #[test]
    fn test_valid_row_in_declaration_order() {
        let raw = Row::new()
            .with("email", "Ada@Example.com")
            .with("full_name", "Ada")
            .with("age", "36")
            .with("unknown", 1i64);
        let row = validate(&user(), raw).unwrap();

        assert_eq!(
            row.names().collect::<Vec<_>>(),
            vec!["id", "full_name", "email", "password", "age"]
        );
        assert_eq!(row.get("email"), Some(&Value::from("Ada@example.com")));
        assert_eq!(row.get("age"), Some(&Value::Int(36)));
        assert_eq!(row.get("id"), Some(&Value::Null));
        assert!(!row.contains("unknown"));
    }

    #[test]
    fn test_always_hook_fills_absent_value() {
        let raw = Row::new().with("email", "a@b.com");
        let row = validate(&user(), raw).unwrap();
        assert_eq!(row.get("full_name"), Some(&Value::from("")));

        let raw = Row::new().with("email", "a@b.com").with("full_name", Value::Null);
        let row = validate(&user(), raw).unwrap();
        assert_eq!(row.get("full_name"), Some(&Value::from("")));
    }

    #[test]
    fn test_required_field() {
        let err = validate(&user(), Row::new().with("full_name", "Ada")).unwrap_err();
        match err {
            Error::Validation { entity, field, reason } => {
                assert_eq!(entity, "User");
                assert_eq!(field, "email");
                assert_eq!(reason, "field required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_semantic_validator_failure() {
        let raw = Row::new().with("email", "not-an-email");
        assert!(matches!(
            validate(&user(), raw),
            Err(Error::Validation { field, .. }) if field == "email"
        ));

        let raw = Row::new()
            .with("email", "a@b.com")
            .with("password", Secret::new("x".repeat(65)));
        assert!(matches!(
            validate(&user(), raw),
            Err(Error::Validation { field, .. }) if field == "password"
        ));
    }

    #[test]
    fn test_empty_string_skips_semantic_validator() {
        let set = ViewDecl::new("UserInfo", "user_info", "email")
            .field(FieldDecl::scalar("email", ScalarType::String).with_validator(EmailValidator))
            .pre_validator("email", PreValidator::empty_string())
            .shape;
        let row = validate(&set, Row::new()).unwrap();
        assert_eq!(row.get("email"), Some(&Value::from("")));
    }

    #[test]
    fn test_structured_and_declared_default() {
        let set = ViewDecl::new("UserInfo", "user_info", "email")
            .field(FieldDecl::structured("numbers"))
            .field(FieldDecl::scalar("tier", ScalarType::Int).with_default(3i64))
            .pre_validator("numbers", PreValidator::empty_list())
            .shape;
        let row = validate(&set, Row::new()).unwrap();

        assert_eq!(row.get("numbers"), Some(&Value::Json(serde_json::json!([]))));
        assert_eq!(row.get("tier"), Some(&Value::Int(3)));

        let raw = Row::new().with("numbers", vec!["555".to_string()]);
        let row = validate(&set, raw).unwrap();
        assert_eq!(row.get("numbers"), Some(&Value::Json(serde_json::json!(["555"]))));
    }

    #[test]
    fn test_when_present_hook_skips_absent_input() {
        let set = ViewDecl::new("V", "v", "name")
            .field(FieldDecl::optional("name", ScalarType::String))
            .pre_validator("name", PreValidator::when_present(|_| Value::from("touched")))
            .shape;
        assert_eq!(validate(&set, Row::new()).unwrap().get("name"), Some(&Value::Null));

        let row = validate(&set, Row::new().with("name", "x")).unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("touched")));
    }

    #[test]
    fn test_coercion() {
        let int = FieldKind::Scalar(ScalarType::Int);
        assert_eq!(coerce(&int, Value::Float(2.0)), Ok(Value::Int(2)));
        assert!(coerce(&int, Value::Float(2.5)).is_err());
        assert!(coerce(&int, Value::Bool(true)).is_err());

        let ts = FieldKind::Scalar(ScalarType::Timestamp);
        assert_eq!(
            coerce(&ts, Value::from("1970-01-01T00:00:01Z")),
            Ok(Value::Timestamp(1_000_000))
        );

        let float = FieldKind::Scalar(ScalarType::Float);
        assert_eq!(coerce(&float, Value::from(" 2.5 ")), Ok(Value::Float(2.5)));
        for raw in ["NaN", "inf", "-infinity"] {
            assert!(coerce(&float, Value::from(raw)).is_err(), "{raw} accepted");
        }
        assert!(coerce(&float, Value::Float(f64::INFINITY)).is_err());

        let fk = FieldKind::Foreign { entity: "User".into() };
        assert_eq!(coerce(&fk, Value::Int(4)), Ok(Value::Int(4)));
        assert!(coerce(&fk, Value::Bool(true)).is_err());
    }
}
