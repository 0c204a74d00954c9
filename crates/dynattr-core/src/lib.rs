//! Dynamic attribute bag for persisted objects.
//!
//! A host object managed by a persistence framework declares a fixed schema.
//! This crate lets callers store arbitrary extra attributes on it: they live
//! in an in-memory mapping that is encoded, as a whole, into one declared
//! blob attribute on every mutation.
//!
//! # Key Types
//!
//! - [`DynamicObject`] — A host plus its dynamic attributes; the entry point
//!   for attribute access and notification dispatch
//! - [`PropertyStore`] — Lazily materialized mapping with blob write-back
//! - [`AttributeHost`] — Capabilities consumed from the host framework
//! - [`ReconcileReport`] — Outcome of undo/redo reconciliation
//! - [`KeySelection`] — Key scope of committed-value queries
//! - [`DynamicConfig`] — Blob key, format and size limit
//! - [`InMemoryHost`] — Reference host for tests and embedding
//!
//! # Rules
//!
//! 1. The mapping is unmaterialized until first use and discarded on
//!    eviction.
//! 2. Every set/remove re-encodes the entire mapping and writes the blob,
//!    even when the bytes are unchanged.
//! 3. A failed encode modifies nothing.
//! 4. Every before-change notification is paired with an after-change on
//!    every exit path.
//! 5. Undo/redo reconciliation replays only differing keys and never writes
//!    the blob.
//! 6. Objects are confined to one execution context; there is no locking.

pub mod config;
pub mod error;
pub mod host;
pub mod memory;
pub mod object;
pub mod reconcile;
pub mod store;
pub mod views;

pub use config::{DynamicConfig, DEFAULT_BLOB_KEY};
pub use error::{AttrError, AttrResult};
pub use host::{
    AttributeHost, AttributeStorage, ChangeObserver, DynamicAttributes, HistoryNavigation,
    HistoryState,
};
pub use memory::{DynamicKeys, InMemoryHost, Notification};
pub use object::DynamicObject;
pub use reconcile::ReconcileReport;
pub use store::PropertyStore;
pub use views::KeySelection;

// Re-export key types
pub use dynattr_codec::{BlobCodec, BlobFormat, EncodingError, MAX_NESTING_DEPTH};
pub use dynattr_diff::{changed_keys, diff_mappings, ChangeKind, MappingChange, MappingDiff};
pub use dynattr_types::{mapping_from_pairs, AttrValue, Mapping};
