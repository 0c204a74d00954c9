//! The property store: lazily materialized mapping backed by the blob.
//!
//! The store is either *unmaterialized* (nothing loaded) or *materialized*
//! (a concrete mapping, possibly empty). Every mutation re-encodes the whole
//! mapping and writes it to the host, so the host always observes a write on
//! the blob attribute.

use dynattr_codec::BlobCodec;
use dynattr_types::{AttrValue, Mapping};
use tracing::{debug, warn};

use crate::config::DynamicConfig;
use crate::error::AttrResult;
use crate::host::AttributeStorage;

/// In-memory owner of one object's dynamic attributes.
#[derive(Clone, Debug)]
pub struct PropertyStore {
    codec: BlobCodec,
    blob_key: String,
    mapping: Option<Mapping>,
}

impl PropertyStore {
    /// Create an unmaterialized store.
    pub fn new(config: &DynamicConfig) -> Self {
        Self {
            codec: config.codec(),
            blob_key: config.blob_key.clone(),
            mapping: None,
        }
    }

    pub fn blob_key(&self) -> &str {
        &self.blob_key
    }

    pub fn codec(&self) -> &BlobCodec {
        &self.codec
    }

    pub fn is_materialized(&self) -> bool {
        self.mapping.is_some()
    }

    /// The materialized mapping, without loading it.
    pub fn peek(&self) -> Option<&Mapping> {
        self.mapping.as_ref()
    }

    /// Load the mapping from the host's blob if not yet loaded.
    ///
    /// An absent or undecodable blob yields an empty mapping.
    pub fn materialize<S: AttributeStorage + ?Sized>(&mut self, storage: &S) -> &mut Mapping {
        if self.mapping.is_none() {
            let loaded = self.decode_value(storage.attribute(&self.blob_key).as_ref());
            debug!(
                blob_key = %self.blob_key,
                decoded = loaded.is_some(),
                entries = loaded.as_ref().map_or(0, Mapping::len),
                "materialized dynamic attributes"
            );
            self.mapping = Some(loaded.unwrap_or_default());
        }
        self.mapping.get_or_insert_with(Mapping::new)
    }

    /// Drop the materialized mapping. The next access reloads from the blob.
    pub fn discard(&mut self) {
        if self.mapping.take().is_some() {
            debug!(blob_key = %self.blob_key, "discarded dynamic attributes");
        }
    }

    pub fn get<S: AttributeStorage + ?Sized>(&mut self, storage: &S, key: &str) -> Option<AttrValue> {
        self.materialize(storage).get(key).cloned()
    }

    /// Copy of the whole mapping.
    pub fn snapshot<S: AttributeStorage + ?Sized>(&mut self, storage: &S) -> Mapping {
        self.materialize(storage).clone()
    }

    /// Insert or overwrite `key`, then rewrite the blob.
    pub fn set<S: AttributeStorage + ?Sized>(
        &mut self,
        storage: &mut S,
        key: &str,
        value: AttrValue,
    ) -> AttrResult<Option<AttrValue>> {
        self.mutate(storage, key, Some(value))
    }

    /// Remove `key` if present, then rewrite the blob (even if nothing was
    /// removed).
    pub fn remove<S: AttributeStorage + ?Sized>(
        &mut self,
        storage: &mut S,
        key: &str,
    ) -> AttrResult<Option<AttrValue>> {
        self.mutate(storage, key, None)
    }

    /// Apply one history-replayed entry to the in-memory mapping only.
    ///
    /// Leaves an unmaterialized store untouched: its next load decodes the
    /// navigated blob, which already holds the value.
    pub(crate) fn replay(&mut self, key: &str, value: Option<AttrValue>) {
        let Some(mapping) = self.mapping.as_mut() else {
            return;
        };
        match value {
            Some(value) => {
                mapping.insert(key.to_string(), value);
            }
            None => {
                mapping.remove(key);
            }
        }
    }

    /// Decode a blob attribute value. Anything but decodable bytes is `None`.
    pub fn decode_value(&self, value: Option<&AttrValue>) -> Option<Mapping> {
        match value? {
            AttrValue::Bytes(bytes) => self.codec.decode(bytes),
            other => {
                warn!(
                    blob_key = %self.blob_key,
                    found = other.type_name(),
                    "blob attribute does not hold bytes; ignoring"
                );
                None
            }
        }
    }

    fn mutate<S: AttributeStorage + ?Sized>(
        &mut self,
        storage: &mut S,
        key: &str,
        next: Option<AttrValue>,
    ) -> AttrResult<Option<AttrValue>> {
        self.materialize(&*storage);
        let Self {
            codec,
            blob_key,
            mapping,
        } = self;
        let mapping = mapping.get_or_insert_with(Mapping::new);

        let previous = match next {
            Some(value) => mapping.insert(key.to_string(), value),
            None => mapping.remove(key),
        };

        match codec.encode(mapping) {
            Ok(bytes) => {
                storage.set_attribute(blob_key, Some(AttrValue::Bytes(bytes)));
                Ok(previous)
            }
            Err(err) => {
                // Roll back so the mapping still matches the stored blob.
                match previous {
                    Some(old) => {
                        mapping.insert(key.to_string(), old);
                    }
                    None => {
                        mapping.remove(key);
                    }
                }
                warn!(key, error = %err, "dynamic attribute mutation rejected");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttrError;
    use crate::memory::InMemoryHost;
    use dynattr_codec::EncodingError;
    use dynattr_types::mapping_from_pairs;
    use proptest::prelude::*;

    fn make_store() -> PropertyStore {
        PropertyStore::new(&DynamicConfig::default())
    }

    fn blob_of(store: &PropertyStore, mapping: &Mapping) -> AttrValue {
        AttrValue::Bytes(store.codec().encode(mapping).unwrap())
    }

    #[test]
    fn starts_unmaterialized() {
        let store = make_store();
        assert!(!store.is_materialized());
        assert!(store.peek().is_none());
    }

    #[test]
    fn absent_blob_materializes_empty() {
        let host = InMemoryHost::new();
        let mut store = make_store();
        assert_eq!(store.get(&host, "x"), None);
        assert!(store.is_materialized());
        assert_eq!(store.peek(), Some(&Mapping::new()));
    }

    #[test]
    fn existing_blob_is_decoded() {
        let mut store = make_store();
        let mapping = mapping_from_pairs([("color", "red")]);
        let host = InMemoryHost::new().with_attribute(store.blob_key(), Some(blob_of(&store, &mapping)));
        assert_eq!(store.get(&host, "color"), Some(AttrValue::from("red")));
    }

    #[test]
    fn garbage_blob_materializes_empty() {
        let host = InMemoryHost::new()
            .with_attribute("dynamic_attributes", Some(AttrValue::bytes(b"not a blob".to_vec())));
        let mut store = make_store();
        assert_eq!(store.snapshot(&host), Mapping::new());
        assert!(store.is_materialized());
    }

    #[test]
    fn overly_nested_blob_materializes_empty() {
        let mut payload = b"DYNA\x01".to_vec();
        payload.extend_from_slice(&[7, 1, 1, b'k']);
        for _ in 0..100_000 {
            payload.extend_from_slice(&[6, 1]);
        }
        payload.push(0);
        let host = InMemoryHost::new()
            .with_attribute("dynamic_attributes", Some(AttrValue::bytes(payload)));
        let mut store = make_store();
        assert_eq!(store.snapshot(&host), Mapping::new());
        assert!(store.is_materialized());
    }

    #[test]
    fn too_deep_value_is_rejected_and_rolled_back() {
        let mut host = InMemoryHost::new();
        let mut store = make_store();
        let deep = (0..dynattr_codec::MAX_NESTING_DEPTH)
            .fold(AttrValue::Null, |inner, _| AttrValue::List(vec![inner]));
        let err = store.set(&mut host, "deep", deep).unwrap_err();
        assert!(matches!(err, AttrError::Encoding(EncodingError::TooDeep { .. })));
        assert_eq!(store.get(&host, "deep"), None);
        assert_eq!(host.blob_writes(), 0);
    }

    #[test]
    fn non_bytes_blob_materializes_empty() {
        let host = InMemoryHost::new().with_attribute("dynamic_attributes", Some(AttrValue::Int(3)));
        let mut store = make_store();
        assert_eq!(store.snapshot(&host), Mapping::new());
    }

    #[test]
    fn set_then_get() {
        let mut host = InMemoryHost::new();
        let mut store = make_store();
        assert_eq!(store.set(&mut host, "x", AttrValue::Int(5)).unwrap(), None);
        assert_eq!(store.get(&host, "x"), Some(AttrValue::Int(5)));
        assert_eq!(
            store.set(&mut host, "x", AttrValue::Int(6)).unwrap(),
            Some(AttrValue::Int(5))
        );
    }

    #[test]
    fn remove_then_get_is_absent() {
        let mut host = InMemoryHost::new();
        let mut store = make_store();
        store.set(&mut host, "x", AttrValue::Int(5)).unwrap();
        assert_eq!(store.remove(&mut host, "x").unwrap(), Some(AttrValue::Int(5)));
        assert_eq!(store.get(&host, "x"), None);
    }

    #[test]
    fn every_mutation_writes_blob() {
        let mut host = InMemoryHost::new();
        let mut store = make_store();
        store.set(&mut host, "x", AttrValue::Int(5)).unwrap();
        let first = host.attribute("dynamic_attributes");
        store.set(&mut host, "x", AttrValue::Int(5)).unwrap();
        assert_eq!(host.attribute("dynamic_attributes"), first);
        store.remove(&mut host, "never-there").unwrap();
        assert_eq!(host.blob_writes(), 3);
    }

    #[test]
    fn blob_holds_entire_mapping() {
        let mut host = InMemoryHost::new();
        let mut store = make_store();
        store.set(&mut host, "a", AttrValue::Int(1)).unwrap();
        store.set(&mut host, "b", AttrValue::Int(2)).unwrap();
        let decoded = store.decode_value(host.attribute("dynamic_attributes").as_ref());
        assert_eq!(decoded, Some(mapping_from_pairs([("a", 1), ("b", 2)])));
    }

    #[test]
    fn failed_encode_is_all_or_nothing() {
        let mut host = InMemoryHost::new();
        let mut store = make_store();
        store.set(&mut host, "x", AttrValue::Int(1)).unwrap();
        let blob_before = host.attribute("dynamic_attributes");

        let err = store
            .set(&mut host, "x", AttrValue::Float(f64::NAN))
            .unwrap_err();
        assert_eq!(
            err,
            AttrError::Encoding(EncodingError::NonFiniteFloat { key: "x".into() })
        );
        assert_eq!(store.get(&host, "x"), Some(AttrValue::Int(1)));

        store.set(&mut host, "y", AttrValue::Float(f64::INFINITY)).unwrap_err();
        assert_eq!(store.get(&host, "y"), None);

        assert_eq!(host.attribute("dynamic_attributes"), blob_before);
        assert_eq!(host.blob_writes(), 1);
    }

    #[test]
    fn discard_reloads_from_current_blob() {
        let mut host = InMemoryHost::new();
        let mut store = make_store();
        store.set(&mut host, "k", AttrValue::from("stale")).unwrap();

        let fresh = blob_of(&store, &mapping_from_pairs([("k", "fresh")]));
        host.set_attribute("dynamic_attributes", Some(fresh));
        assert_eq!(store.get(&host, "k"), Some(AttrValue::from("stale")));

        store.discard();
        assert!(!store.is_materialized());
        assert_eq!(store.get(&host, "k"), Some(AttrValue::from("fresh")));
    }

    #[test]
    fn replay_skips_unmaterialized_store() {
        let mut store = make_store();
        store.replay("k", Some(AttrValue::Int(1)));
        assert!(!store.is_materialized());
    }

    #[test]
    fn custom_blob_key() {
        let config = DynamicConfig::default().with_blob_key("extras");
        let mut host = InMemoryHost::for_config(&config);
        let mut store = PropertyStore::new(&config);
        store.set(&mut host, "x", AttrValue::Bool(true)).unwrap();
        assert!(matches!(host.attribute("extras"), Some(AttrValue::Bytes(_))));
        assert_eq!(host.attribute("dynamic_attributes"), None);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Set(String, i64),
        Remove(String),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            ("[a-d]", any::<i64>()).prop_map(|(k, v)| Op::Set(k, v)),
            "[a-d]".prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn blob_tracks_model(ops in proptest::collection::vec(arb_op(), 1..24)) {
            let mut host = InMemoryHost::new();
            let mut store = make_store();
            let mut model = Mapping::new();
            for op in &ops {
                match op {
                    Op::Set(k, v) => {
                        store.set(&mut host, k, AttrValue::Int(*v)).unwrap();
                        model.insert(k.clone(), AttrValue::Int(*v));
                    }
                    Op::Remove(k) => {
                        store.remove(&mut host, k).unwrap();
                        model.remove(k);
                    }
                }
            }
            prop_assert_eq!(host.blob_writes(), ops.len());
            prop_assert_eq!(store.peek(), Some(&model));
            store.discard();
            prop_assert_eq!(store.snapshot(&host), model);
        }
    }
}
