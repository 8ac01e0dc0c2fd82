//! Scalar validators: raw value in, normalized value or a reason out.

use std::fmt;

use crate::value::Value;

/// Semantic check applied after type coercion.
pub trait ScalarValidator: Send + Sync + fmt::Debug {
    /// Short name recorded in the compiled column.
    fn name(&self) -> &'static str;

    /// Validate and normalize `value`, or explain the rejection.
    fn validate(&self, value: Value) -> Result<Value, String>;
}

/// E-mail address shape check; lower-cases the domain part.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailValidator;

impl ScalarValidator for EmailValidator {
    fn name(&self) -> &'static str {
        "email"
    }

    fn validate(&self, value: Value) -> Result<Value, String> {
        let raw = match value {
            Value::String(s) => s,
            other => return Err(format!("expected string, found {}", other.type_name())),
        };
        let address = raw.trim();
        if address.chars().any(char::is_whitespace) {
            return Err("value is not a valid email address".into());
        }

        let (local, domain) = address
            .split_once('@')
            .ok_or_else(|| "value is not a valid email address".to_string())?;
        if local.is_empty() || domain.contains('@') {
            return Err("value is not a valid email address".into());
        }

        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
            return Err("the domain part of the email address is invalid".into());
        }

        Ok(Value::String(format!("{}@{}", local, domain.to_lowercase())))
    }
}

/// Secret string policy: must be a string, optionally bounded in length.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretValidator {
    max_length: Option<usize>,
}

impl SecretValidator {
    /// Create a validator with no length bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject secrets longer than `max` characters.
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

impl ScalarValidator for SecretValidator {
    fn name(&self) -> &'static str {
        "secret"
    }

    fn validate(&self, value: Value) -> Result<Value, String> {
        match value {
            Value::String(s) => match self.max_length {
                Some(max) if s.chars().count() > max => {
                    Err(format!("secret exceeds {} characters", max))
                }
                _ => Ok(Value::String(s)),
            },
            other => Err(format!("expected string, found {}", other.type_name())),
        }
    }
}
