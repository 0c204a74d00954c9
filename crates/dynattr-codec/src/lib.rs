//! Blob codec for dynattr.
//!
//! Turns a whole dynamic attribute [`Mapping`](dynattr_types::Mapping) into the
//! bytes stored on the host's blob attribute, and back. Encoding is strict
//! (unrepresentable values are errors); decoding is forgiving (anything that
//! is not a well-formed mapping, or nests deeper than [`MAX_NESTING_DEPTH`],
//! decodes to `None`).
//!
//! # Key Types
//!
//! - [`BlobCodec`] — Encoder/decoder bound to a format and size ceiling
//! - [`BlobFormat`] — `Bincode` (framed, default) or `Json`
//! - [`EncodingError`] — Why a mapping could not be encoded

pub mod codec;
pub mod error;
mod nesting;

pub use codec::{BlobCodec, BlobFormat, BLOB_MAGIC, BLOB_VERSION, DEFAULT_MAX_BLOB_SIZE};
pub use error::{CodecResult, EncodingError};
pub use nesting::MAX_NESTING_DEPTH;
