use thiserror::Error;

/// Errors raised while encoding a mapping.
///
/// Decoding never produces an error: malformed or foreign blobs degrade to
/// "no mapping".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// A float somewhere under `key` is NaN or infinite.
    #[error("value under key {key:?} contains a non-finite float")]
    NonFiniteFloat { key: String },

    /// The value under `key` nests lists and maps past the blob limit.
    #[error("value under key {key:?} nests deeper than {max} levels")]
    TooDeep { key: String, max: usize },

    #[error("encoded blob too large: {size} bytes (max {max})")]
    BlobTooLarge { size: usize, max: usize },

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type CodecResult<T> = Result<T, EncodingError>;
