//! Pre-normalization hooks run before type coercion.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

type PreFn = dyn Fn(Value) -> Result<Value, String> + Send + Sync;

/// A per-field hook that rewrites the raw input before coercion.
///
/// `always` hooks also run when the field is absent from the input, which is
/// what lets them turn a missing value into the field's canonical empty value.
#[derive(Clone)]
pub struct PreValidator {
    always: bool,
    func: Arc<PreFn>,
}

impl PreValidator {
    /// Hook that runs even when the raw value is absent.
    pub fn always<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            always: true,
            func: Arc::new(move |v| Ok(f(v))),
        }
    }

    /// Hook that only runs when the input carries the field.
    pub fn when_present<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            always: false,
            func: Arc::new(move |v| Ok(f(v))),
        }
    }

    /// Hook that may reject the value outright.
    pub fn fallible<F>(always: bool, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            always,
            func: Arc::new(f),
        }
    }

    /// `v or ""`
    pub fn empty_string() -> Self {
        Self::always(|v| v.or(Value::String(String::new())))
    }

    /// `v or []`
    pub fn empty_list() -> Self {
        Self::always(|v| v.or(Value::Json(serde_json::Value::Array(Vec::new()))))
    }

    /// Whether the hook runs for absent input.
    pub fn is_always(&self) -> bool {
        self.always
    }

    /// Run the hook.
    pub fn apply(&self, value: Value) -> Result<Value, String> {
        (self.func)(value)
    }
}

impl fmt::Debug for PreValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreValidator")
            .field("always", &self.always)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_hooks() {
        assert_eq!(
            PreValidator::empty_string().apply(Value::Null).unwrap(),
            Value::from("")
        );
        assert_eq!(
            PreValidator::empty_list().apply(Value::Null).unwrap(),
            Value::Json(serde_json::json!([]))
        );
        assert!(PreValidator::empty_list().is_always());
        assert!(!PreValidator::when_present(|v| v).is_always());
    }

    #[test]
    fn test_fallible_hook() {
        let hook = PreValidator::fallible(false, |v| match v {
            Value::String(s) if s.len() > 3 => Err("too long".into()),
            other => Ok(other),
        });
        assert!(hook.apply(Value::from("abcd")).is_err());
        assert!(hook.apply(Value::from("ab")).is_ok());
    }
}
