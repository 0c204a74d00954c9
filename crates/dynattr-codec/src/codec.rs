//! Whole-mapping blob encoding.
//!
//! Bincode blobs are framed so foreign bytes are recognised cheaply:
//!
//! ```text
//! [4 bytes: magic "DYNA"]
//! [1 byte:  format version]
//! [N bytes: bincode-serialized root AttrValue (always a Map on encode)]
//! ```
//!
//! JSON blobs are the serde_json form of the root value with no framing.
//!
//! Both formats are read through a depth-limited seed that caps container
//! nesting at [`MAX_NESTING_DEPTH`]. Encode enforces the same cap so every
//! blob it produces can be read back.

use bincode::Options;
use serde::de::DeserializeSeed;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use dynattr_types::{AttrValue, Mapping};

use crate::error::{CodecResult, EncodingError};
use crate::nesting::{ValueSeed, MAX_NESTING_DEPTH};

/// Leading bytes of every bincode blob.
pub const BLOB_MAGIC: [u8; 4] = *b"DYNA";

/// Current bincode blob layout version.
pub const BLOB_VERSION: u8 = 1;

/// Default ceiling for encoded blobs (16 MiB).
pub const DEFAULT_MAX_BLOB_SIZE: usize = 16 * 1024 * 1024;

const HEADER_LEN: usize = BLOB_MAGIC.len() + 1;

/// Variant index of `AttrValue::Map` in declaration order. See the note on
/// [`AttrValue`] about variant order.
const MAP_VARIANT_INDEX: u32 = 7;

/// On-disk encoding of the blob attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobFormat {
    #[default]
    Bincode,
    Json,
}

/// Serializes a borrowed mapping exactly as `AttrValue::Map` would, without
/// cloning it into an `AttrValue` first.
struct MapRoot<'a>(&'a Mapping);

impl Serialize for MapRoot<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_variant("AttrValue", MAP_VARIANT_INDEX, "Map", self.0)
    }
}

/// Encoder/decoder for the dynamic attribute blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlobCodec {
    format: BlobFormat,
    max_blob_size: usize,
}

impl Default for BlobCodec {
    fn default() -> Self {
        Self::new(BlobFormat::default(), DEFAULT_MAX_BLOB_SIZE)
    }
}

impl BlobCodec {
    pub fn new(format: BlobFormat, max_blob_size: usize) -> Self {
        Self {
            format,
            max_blob_size,
        }
    }

    pub fn format(&self) -> BlobFormat {
        self.format
    }

    pub fn max_blob_size(&self) -> usize {
        self.max_blob_size
    }

    /// Encode the entire mapping.
    ///
    /// Fails if any value holds a non-finite float or nests too deeply, if
    /// serialization fails, or if the result exceeds the size ceiling.
    pub fn encode(&self, mapping: &Mapping) -> CodecResult<Vec<u8>> {
        for (key, value) in mapping {
            if !value.is_finite() {
                return Err(EncodingError::NonFiniteFloat { key: key.clone() });
            }
            // The root mapping is one level itself.
            if value.nesting_depth() >= MAX_NESTING_DEPTH {
                return Err(EncodingError::TooDeep {
                    key: key.clone(),
                    max: MAX_NESTING_DEPTH,
                });
            }
        }

        let root = MapRoot(mapping);
        let bytes = match self.format {
            BlobFormat::Bincode => {
                let payload = bincode::DefaultOptions::new()
                    .serialize(&root)
                    .map_err(|e| EncodingError::Serialization(e.to_string()))?;
                let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
                buf.extend_from_slice(&BLOB_MAGIC);
                buf.push(BLOB_VERSION);
                buf.extend_from_slice(&payload);
                buf
            }
            BlobFormat::Json => serde_json::to_vec(&root)
                .map_err(|e| EncodingError::Serialization(e.to_string()))?,
        };

        if bytes.len() > self.max_blob_size {
            return Err(EncodingError::BlobTooLarge {
                size: bytes.len(),
                max: self.max_blob_size,
            });
        }

        debug!(entries = mapping.len(), bytes = bytes.len(), format = ?self.format, "encoded blob");
        Ok(bytes)
    }

    /// Decode a blob back into a mapping.
    ///
    /// Returns `None` for empty input, oversized input, malformed bytes,
    /// nesting deeper than [`MAX_NESTING_DEPTH`], or a root value that is not
    /// a mapping. Never fails.
    pub fn decode(&self, data: &[u8]) -> Option<Mapping> {
        if data.is_empty() {
            return None;
        }
        if data.len() > self.max_blob_size {
            warn!(size = data.len(), max = self.max_blob_size, "blob exceeds size limit; ignoring");
            return None;
        }

        let root = match self.format {
            BlobFormat::Bincode => self.decode_framed(data)?,
            BlobFormat::Json => decode_json(data)?,
        };

        match root {
            AttrValue::Map(mapping) => Some(mapping),
            other => {
                warn!(found = other.type_name(), "blob root is not a mapping; ignoring");
                None
            }
        }
    }

    fn decode_framed(&self, data: &[u8]) -> Option<AttrValue> {
        if data.len() < HEADER_LEN || data[..BLOB_MAGIC.len()] != BLOB_MAGIC {
            warn!(len = data.len(), "blob missing magic header; ignoring");
            return None;
        }
        let version = data[BLOB_MAGIC.len()];
        if version != BLOB_VERSION {
            warn!(version, expected = BLOB_VERSION, "unsupported blob version; ignoring");
            return None;
        }

        bincode::DefaultOptions::new()
            .with_limit(self.max_blob_size as u64)
            .deserialize_seed(ValueSeed::default(), &data[HEADER_LEN..])
            .map_err(|e| warn!(error = %e, "malformed bincode blob; ignoring"))
            .ok()
    }
}

fn decode_json(data: &[u8]) -> Option<AttrValue> {
    let mut de = serde_json::Deserializer::from_slice(data);
    ValueSeed::default()
        .deserialize(&mut de)
        .and_then(|root| de.end().map(|()| root))
        .map_err(|e| warn!(error = %e, "malformed JSON blob; ignoring"))
        .ok()
}
