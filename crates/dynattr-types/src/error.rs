use thiserror::Error;

/// Errors produced by typed value accessors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}
