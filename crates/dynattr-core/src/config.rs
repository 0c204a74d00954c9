//! Configuration for a dynamic attribute bag: blob key, encoding and size ceiling.

use serde::{Deserialize, Serialize};

use dynattr_codec::{BlobCodec, BlobFormat, DEFAULT_MAX_BLOB_SIZE};

use crate::error::{AttrError, AttrResult};

/// Attribute name that holds the encoded blob unless overridden.
pub const DEFAULT_BLOB_KEY: &str = "dynamic_attributes";

/// Configuration for a dynamic attribute bag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicConfig {
    /// Host attribute holding the encoded blob. Must be declared by the host.
    pub blob_key: String,
    /// Encoding used for the blob.
    pub format: BlobFormat,
    /// Largest blob that will be written or read, in bytes.
    pub max_blob_size: usize,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            blob_key: DEFAULT_BLOB_KEY.to_string(),
            format: BlobFormat::default(),
            max_blob_size: DEFAULT_MAX_BLOB_SIZE,
        }
    }
}

impl DynamicConfig {
    /// Override the blob attribute name.
    pub fn with_blob_key(mut self, blob_key: impl Into<String>) -> Self {
        self.blob_key = blob_key.into();
        self
    }

    pub fn with_format(mut self, format: BlobFormat) -> Self {
        self.format = format;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> AttrResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| AttrError::Config(e.to_string()))?;
        if config.blob_key.is_empty() {
            return Err(AttrError::Config("blob_key must not be empty".into()));
        }
        Ok(config)
    }

    /// The codec this configuration describes.
    pub fn codec(&self) -> BlobCodec {
        BlobCodec::new(self.format, self.max_blob_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = DynamicConfig::default();
        assert_eq!(c.blob_key, "dynamic_attributes");
        assert_eq!(c.format, BlobFormat::Bincode);
        assert_eq!(c.max_blob_size, 16 * 1024 * 1024);
    }

    #[test]
    fn builder_overrides() {
        let c = DynamicConfig::default()
            .with_blob_key("extras")
            .with_format(BlobFormat::Json);
        assert_eq!(c.blob_key, "extras");
        assert_eq!(c.codec().format(), BlobFormat::Json);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = DynamicConfig::from_json(r#"{"format": "json"}"#).unwrap();
        assert_eq!(c.format, BlobFormat::Json);
        assert_eq!(c.blob_key, DEFAULT_BLOB_KEY);
    }

    #[test]
    fn invalid_json_rejected() {
        let err = DynamicConfig::from_json(r#"{"format": "yaml"}"#).unwrap_err();
        assert!(matches!(err, AttrError::Config(_)));
        let err = DynamicConfig::from_json(r#"{"blob_key": ""}"#).unwrap_err();
        assert!(matches!(err, AttrError::Config(_)));
    }
}
