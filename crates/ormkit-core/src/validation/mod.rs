//! Validation pipeline and the hooks it runs.

mod pipeline;
mod pre;
mod scalar;

pub use pipeline::{coerce, validate};
pub use pre::PreValidator;
pub use scalar::{EmailValidator, ScalarValidator, SecretValidator};
