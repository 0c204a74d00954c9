//! Foundation types for dynattr.
//!
//! Every other dynattr crate depends on `dynattr-types`. It defines the closed
//! set of values a dynamic attribute may hold and the mapping that groups them.
//!
//! # Key Types
//!
//! - [`AttrValue`] — A codec-representable attribute value
//! - [`Mapping`] — Key → value container backing the dynamic attribute bag
//! - [`TypeError`] — Typed accessor failures

pub mod error;
pub mod mapping;
pub mod value;

pub use error::TypeError;
pub use mapping::{mapping_from_pairs, Mapping};
pub use value::AttrValue;
