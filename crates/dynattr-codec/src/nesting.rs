//! Depth-limited deserialization of [`AttrValue`].
//!
//! The derived `Deserialize` recurses once per nested list or map with no
//! bound, so a small hostile blob can exhaust the stack. [`ValueSeed`] reads
//! the same externally tagged representation but refuses to descend past
//! [`MAX_NESTING_DEPTH`] containers. It works for both bincode (variant
//! indices) and JSON (variant names).

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, MapAccess, SeqAccess, Unexpected,
    VariantAccess, Visitor,
};
use serde::Deserialize;

use dynattr_types::AttrValue;

/// Deepest container nesting a blob may hold, counting the root mapping.
///
/// JSON spends two levels of serde_json's own recursion budget (128) per
/// container, so this stays well below half of it.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Upper bound on preallocation driven by an untrusted length prefix.
const MAX_PREALLOC: usize = 1024;

const VARIANTS: &[&str] = &["Null", "Bool", "Int", "Float", "Text", "Bytes", "List", "Map"];

/// Seed that deserializes one `AttrValue`, tracking how many containers
/// enclose it.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ValueSeed {
    depth: usize,
}

impl ValueSeed {
    fn enter<E: de::Error>(self) -> Result<Self, E> {
        let depth = self.depth + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(E::custom(format!(
                "value nested deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }
        Ok(Self { depth })
    }
}

impl<'de> DeserializeSeed<'de> for ValueSeed {
    type Value = AttrValue;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<AttrValue, D::Error> {
        deserializer.deserialize_enum("AttrValue", VARIANTS, self)
    }
}

impl<'de> Visitor<'de> for ValueSeed {
    type Value = AttrValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an attribute value")
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<AttrValue, A::Error> {
        let (tag, variant) = data.variant::<Tag>()?;
        match tag {
            Tag::Null => variant.unit_variant().map(|()| AttrValue::Null),
            Tag::Bool => variant.newtype_variant().map(AttrValue::Bool),
            Tag::Int => variant.newtype_variant().map(AttrValue::Int),
            Tag::Float => variant.newtype_variant().map(AttrValue::Float),
            Tag::Text => variant.newtype_variant().map(AttrValue::Text),
            Tag::Bytes => variant.newtype_variant::<Vec<u8>>().map(AttrValue::Bytes),
            Tag::List => variant
                .newtype_variant_seed(ListSeed(self.enter()?))
                .map(AttrValue::List),
            Tag::Map => variant
                .newtype_variant_seed(MapSeed(self.enter()?))
                .map(AttrValue::Map),
        }
    }
}

/// Variant tag, accepted as an index (bincode) or a name (JSON).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tag {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    List,
    Map,
}

impl Tag {
    const ALL: [Tag; 8] = [
        Tag::Null,
        Tag::Bool,
        Tag::Int,
        Tag::Float,
        Tag::Text,
        Tag::Bytes,
        Tag::List,
        Tag::Map,
    ];
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_identifier(TagVisitor)
    }
}

struct TagVisitor;

impl<'de> Visitor<'de> for TagVisitor {
    type Value = Tag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an attribute value variant")
    }

    fn visit_u64<E: de::Error>(self, index: u64) -> Result<Tag, E> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Tag::ALL.get(i).copied())
            .ok_or_else(|| E::invalid_value(Unexpected::Unsigned(index), &self))
    }

    fn visit_str<E: de::Error>(self, name: &str) -> Result<Tag, E> {
        VARIANTS
            .iter()
            .position(|v| *v == name)
            .map(|i| Tag::ALL[i])
            .ok_or_else(|| E::unknown_variant(name, VARIANTS))
    }

    fn visit_bytes<E: de::Error>(self, name: &[u8]) -> Result<Tag, E> {
        match std::str::from_utf8(name) {
            Ok(name) => self.visit_str(name),
            Err(_) => Err(E::invalid_value(Unexpected::Bytes(name), &self)),
        }
    }
}

struct ListSeed(ValueSeed);

impl<'de> DeserializeSeed<'de> for ListSeed {
    type Value = Vec<AttrValue>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ListSeed {
    type Value = Vec<AttrValue>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of attribute values")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(MAX_PREALLOC));
        while let Some(item) = seq.next_element_seed(self.0)? {
            items.push(item);
        }
        Ok(items)
    }
}

struct MapSeed(ValueSeed);

impl<'de> DeserializeSeed<'de> for MapSeed {
    type Value = BTreeMap<String, AttrValue>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for MapSeed {
    type Value = BTreeMap<String, AttrValue>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of attribute values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(self.0)?;
            entries.insert(key, value);
        }
        Ok(entries)
    }
}
