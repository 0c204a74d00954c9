//! Diff engine for dynattr.
//!
//! Compares two optional dynamic attribute mappings. An absent side (a blob
//! that was never written or does not decode) differs from the other side in
//! every key the other side holds.
//!
//! # Key Types
//!
//! - [`changed_keys`] -- Keys whose lookups differ
//! - [`MappingDiff`] / [`MappingChange`] -- The same keys with old and new
//!   values, as replayed by the history reconciler

pub mod mapping_diff;

pub use mapping_diff::{changed_keys, diff_mappings, ChangeKind, MappingChange, MappingDiff};
