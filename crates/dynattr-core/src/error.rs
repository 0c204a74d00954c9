//! Error types for dynamic attribute operations.

use dynattr_codec::EncodingError;

/// Errors from dynamic attribute operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttrError {
    /// The key is neither declared by the host nor eligible for dynamic
    /// storage, and the host has no fallback for it.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// The mapping could not be encoded; nothing was modified.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias for dynamic attribute operations.
pub type AttrResult<T> = Result<T, AttrError>;
