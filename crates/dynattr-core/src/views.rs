//! Committed and changed value views that include dynamic attributes.
//!
//! The host only knows the raw blob attribute. These views decode it and
//! present the dynamic attributes as if they were ordinary attributes,
//! hiding the blob key unless a caller asked for it by name.

use std::collections::BTreeSet;

use dynattr_types::Mapping;

use crate::host::AttributeHost;
use crate::object::DynamicObject;

/// Which keys a committed-values query covers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum KeySelection {
    #[default]
    All,
    Keys(BTreeSet<String>),
}

impl KeySelection {
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }

    /// The explicit key set, `None` for [`KeySelection::All`].
    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::All => None,
            Self::Keys(keys) => Some(keys),
        }
    }
}

impl<H: AttributeHost> DynamicObject<H> {
    /// Last committed values, optionally including dynamic attributes
    /// decoded from the committed blob.
    ///
    /// Declared attributes win over dynamic ones of the same name. The raw
    /// blob entry is dropped unless `keys` names it explicitly.
    pub fn committed_values(&self, keys: &KeySelection, include_dynamic: bool) -> Mapping {
        if !include_dynamic {
            return self.host.committed_values(keys.as_set());
        }

        let blob_key = self.properties.blob_key();
        let (query, blob_requested) = match keys {
            KeySelection::All => (None, false),
            KeySelection::Keys(requested) => {
                let mut query = requested.clone();
                let newly_added = query.insert(blob_key.to_string());
                (Some(query), !newly_added)
            }
        };

        let standard = self.host.committed_values(query.as_ref());
        let mut result = Mapping::new();
        if let Some(mut decoded) = self.properties.decode_value(standard.get(blob_key)) {
            if let KeySelection::Keys(requested) = keys {
                decoded.retain(|key, _| requested.contains(key));
            }
            result.extend(decoded);
        }
        result.extend(standard);

        if !blob_requested {
            result.remove(blob_key);
        }
        result
    }

    /// Uncommitted changes, optionally replacing the raw blob entry with the
    /// live dynamic attributes.
    pub fn changed_values(&mut self, include_dynamic: bool) -> Mapping {
        let mut delta = self.host.changed_values();
        if include_dynamic && delta.remove(self.properties.blob_key()).is_some() {
            delta.extend(self.properties.snapshot(&self.host));
        }
        delta
    }
}
