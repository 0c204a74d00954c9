//! The dynamic attribute mapping.

use std::collections::BTreeMap;

use crate::value::AttrValue;

/// Key → value container for dynamic attributes.
///
/// Keys are unique and ordering carries no meaning; a `BTreeMap` is used so
/// that iteration (and therefore encoding and diff output) is deterministic.
pub type Mapping = BTreeMap<String, AttrValue>;

/// Build a mapping from `(key, value)` pairs. Later duplicates win.
pub fn mapping_from_pairs<K, V, I>(pairs: I) -> Mapping
where
    K: Into<String>,
    V: Into<AttrValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
