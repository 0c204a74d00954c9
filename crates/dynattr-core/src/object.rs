//! A host object extended with a dynamic attribute bag.
//!
//! [`DynamicObject`] pairs a host with its [`PropertyStore`] and is the single
//! entry point for attribute access and for the host's notification
//! dispatch. Declared attributes go straight to the host; undeclared keys are
//! routed by the host's `is_dynamic` predicate either into the bag or into
//! the host's undefined-key fallback.

use dynattr_types::{AttrValue, Mapping};
use tracing::debug;

use crate::config::DynamicConfig;
use crate::error::AttrResult;
use crate::host::AttributeHost;
use crate::store::PropertyStore;

/// A host object plus its dynamic attributes.
///
/// Confined to one execution context: every operation takes `&mut self` or
/// `&self` and nothing is shared.
pub struct DynamicObject<H> {
    pub(crate) host: H,
    pub(crate) properties: PropertyStore,
}

impl<H: std::fmt::Debug> std::fmt::Debug for DynamicObject<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicObject")
            .field("host", &self.host)
            .field("blob_key", &self.properties.blob_key())
            .field("materialized", &self.properties.is_materialized())
            .finish()
    }
}

impl<H: AttributeHost> DynamicObject<H> {
    /// Wrap a host using the default configuration.
    pub fn new(host: H) -> Self {
        Self::with_config(host, &DynamicConfig::default())
    }

    pub fn with_config(host: H, config: &DynamicConfig) -> Self {
        Self {
            host,
            properties: PropertyStore::new(config),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn blob_key(&self) -> &str {
        self.properties.blob_key()
    }

    pub fn is_materialized(&self) -> bool {
        self.properties.is_materialized()
    }

    // ---------------------------------------------------------------
    // Property store
    // ---------------------------------------------------------------

    /// Current value of a dynamic attribute. Does not consult `is_dynamic`.
    pub fn get(&mut self, key: &str) -> Option<AttrValue> {
        self.properties.get(&self.host, key)
    }

    /// Copy of every dynamic attribute.
    pub fn snapshot(&mut self) -> Mapping {
        self.properties.snapshot(&self.host)
    }

    /// Store a dynamic attribute and rewrite the blob, without emitting
    /// notifications for `key`. Returns the previous value.
    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) -> AttrResult<Option<AttrValue>> {
        self.properties.set(&mut self.host, key, value.into())
    }

    /// Remove a dynamic attribute and rewrite the blob, without emitting
    /// notifications for `key`. Returns the removed value.
    pub fn remove(&mut self, key: &str) -> AttrResult<Option<AttrValue>> {
        self.properties.remove(&mut self.host, key)
    }

    /// Eviction hook: drop the cached mapping in lockstep with the host.
    pub fn evict(&mut self) {
        self.properties.discard();
    }

    // ---------------------------------------------------------------
    // Undefined-key interception
    // ---------------------------------------------------------------

    /// Read an undeclared key.
    pub fn read(&mut self, key: &str) -> AttrResult<Option<AttrValue>> {
        if self.host.is_dynamic(key) {
            Ok(self.properties.get(&self.host, key))
        } else {
            self.host.undefined_value(key)
        }
    }

    /// Write an undeclared key. `None` removes it.
    ///
    /// Dynamic keys are bracketed by their own before/after notifications,
    /// which stay paired when encoding fails.
    pub fn write(&mut self, key: &str, value: Option<AttrValue>) -> AttrResult<()> {
        if !self.host.is_dynamic(key) {
            return self.host.set_undefined_value(key, value);
        }

        self.host.will_change(key);
        let result = match value {
            Some(value) => self.properties.set(&mut self.host, key, value),
            None => self.properties.remove(&mut self.host, key),
        };
        self.host.did_change(key);
        debug!(key, ok = result.is_ok(), "dynamic attribute written");
        result.map(|_| ())
    }

    // ---------------------------------------------------------------
    // Full attribute surface
    // ---------------------------------------------------------------

    /// Read any attribute: declared keys from the host, the rest through
    /// [`read`](Self::read).
    pub fn value(&mut self, key: &str) -> AttrResult<Option<AttrValue>> {
        if self.host.has_attribute(key) {
            Ok(self.host.attribute(key))
        } else {
            self.read(key)
        }
    }

    /// Write any attribute: declared keys to the host inside a notification
    /// pair, the rest through [`write`](Self::write).
    pub fn set_value(&mut self, key: &str, value: Option<AttrValue>) -> AttrResult<()> {
        if !self.host.has_attribute(key) {
            return self.write(key, value);
        }
        self.will_change(key);
        self.host.set_attribute(key, value);
        self.did_change(key);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Notification dispatch
    // ---------------------------------------------------------------

    /// Before-change entry point for the host's notification dispatch.
    pub fn will_change(&mut self, key: &str) {
        self.host.will_change(key);
    }

    /// After-change entry point for the host's notification dispatch.
    ///
    /// For the blob key, history reconciliation runs first; the host's own
    /// after-change handling always runs afterwards.
    pub fn did_change(&mut self, key: &str) {
        if key == self.properties.blob_key() {
            self.reconcile();
        }
        self.host.did_change(key);
    }
}
