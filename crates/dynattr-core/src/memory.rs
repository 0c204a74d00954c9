//! In-memory reference host.
//!
//! [`InMemoryHost`] stands in for a persistence framework: it keeps declared
//! attributes with a committed baseline, logs every notification, counts
//! blob writes and records a linear undo/redo history of blob values. It is
//! intended for tests and embedding.

use std::collections::{BTreeMap, BTreeSet};

use dynattr_types::{AttrValue, Mapping};
use tracing::debug;

use crate::config::{DynamicConfig, DEFAULT_BLOB_KEY};
use crate::host::{
    AttributeStorage, ChangeObserver, DynamicAttributes, HistoryNavigation, HistoryState,
};
use crate::object::DynamicObject;

/// A logged change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    WillChange(String),
    DidChange(String),
}

/// Which undeclared keys the host treats as dynamic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DynamicKeys {
    #[default]
    None,
    All,
    Exact(BTreeSet<String>),
    Prefix(String),
}

impl DynamicKeys {
    pub fn exact<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::Exact(keys.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Exact(keys) => keys.contains(key),
            Self::Prefix(prefix) => key.starts_with(prefix.as_str()),
        }
    }
}

/// Deterministic host for tests and embedding.
#[derive(Clone, Debug)]
pub struct InMemoryHost {
    blob_key: String,
    schema: BTreeSet<String>,
    current: Mapping,
    committed: Mapping,
    dynamic_keys: DynamicKeys,
    history_state: HistoryState,
    undo_stack: Vec<Option<AttrValue>>,
    redo_stack: Vec<Option<AttrValue>>,
    notifications: Vec<Notification>,
    history_updates: Vec<(String, Option<AttrValue>)>,
    blob_writes: usize,
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHost {
    /// A host whose only declared attribute is the default blob key.
    pub fn new() -> Self {
        Self::with_blob_key(DEFAULT_BLOB_KEY)
    }

    pub fn for_config(config: &DynamicConfig) -> Self {
        Self::with_blob_key(config.blob_key.clone())
    }

    pub fn with_blob_key(blob_key: impl Into<String>) -> Self {
        let blob_key = blob_key.into();
        let mut schema = BTreeSet::new();
        schema.insert(blob_key.clone());
        Self {
            blob_key,
            schema,
            current: Mapping::new(),
            committed: Mapping::new(),
            dynamic_keys: DynamicKeys::None,
            history_state: HistoryState::Idle,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            notifications: Vec::new(),
            history_updates: Vec::new(),
            blob_writes: 0,
        }
    }

    /// Declare an attribute with an initial (uncommitted) value.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Option<AttrValue>) -> Self {
        let key = key.into();
        if let Some(value) = value {
            self.current.insert(key.clone(), value);
        }
        self.schema.insert(key);
        self
    }

    pub fn with_dynamic_keys(mut self, dynamic_keys: DynamicKeys) -> Self {
        self.dynamic_keys = dynamic_keys;
        self
    }

    // ---------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------

    /// Promote every current value to committed.
    pub fn commit(&mut self) {
        self.committed = self.current.clone();
        debug!(attributes = self.committed.len(), "in-memory host committed");
    }

    // ---------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    /// Returns `true` if every before-change was closed by an after-change
    /// for the same key, and no after-change came without one.
    pub fn is_balanced(&self) -> bool {
        let mut open: BTreeMap<&str, usize> = BTreeMap::new();
        for n in &self.notifications {
            match n {
                Notification::WillChange(key) => *open.entry(key.as_str()).or_default() += 1,
                Notification::DidChange(key) => match open.get_mut(key.as_str()) {
                    Some(count) if *count > 0 => *count -= 1,
                    _ => return false,
                },
            }
        }
        open.values().all(|count| *count == 0)
    }

    /// Number of writes to the blob attribute through `set_attribute`.
    pub fn blob_writes(&self) -> usize {
        self.blob_writes
    }

    /// Every `on_history_update` call, in order.
    pub fn history_updates(&self) -> &[(String, Option<AttrValue>)] {
        &self.history_updates
    }

    // ---------------------------------------------------------------
    // History
    // ---------------------------------------------------------------

    pub fn set_history_state(&mut self, state: HistoryState) {
        self.history_state = state;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Put a blob value in place the way a history manager does: no write
    /// is counted and no history is recorded.
    pub fn restore_blob(&mut self, value: Option<AttrValue>) {
        let key = self.blob_key.clone();
        self.store(key, value);
    }

    /// Pop the blob value a navigation step restores, moving the current
    /// value onto the opposite stack.
    fn take_history_step(&mut self, direction: HistoryState) -> Option<Option<AttrValue>> {
        let current = self.current.get(&self.blob_key).cloned();
        match direction {
            HistoryState::Undoing => {
                let target = self.undo_stack.pop()?;
                self.redo_stack.push(current);
                Some(target)
            }
            HistoryState::Redoing => {
                let target = self.redo_stack.pop()?;
                self.undo_stack.push(current);
                Some(target)
            }
            HistoryState::Idle => None,
        }
    }

    fn store(&mut self, key: String, value: Option<AttrValue>) {
        match value {
            Some(value) => {
                self.current.insert(key, value);
            }
            None => {
                self.current.remove(&key);
            }
        }
    }
}

impl AttributeStorage for InMemoryHost {
    fn has_attribute(&self, key: &str) -> bool {
        self.schema.contains(key)
    }

    fn attribute(&self, key: &str) -> Option<AttrValue> {
        self.current.get(key).cloned()
    }

    fn set_attribute(&mut self, key: &str, value: Option<AttrValue>) {
        if key == self.blob_key {
            let previous = self.current.get(key).cloned();
            self.undo_stack.push(previous);
            self.redo_stack.clear();
            self.blob_writes += 1;
        }
        self.schema.insert(key.to_string());
        self.store(key.to_string(), value);
    }

    fn committed_values(&self, keys: Option<&BTreeSet<String>>) -> Mapping {
        match keys {
            None => self.committed.clone(),
            Some(keys) => self
                .committed
                .iter()
                .filter(|(key, _)| keys.contains(*key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Changed keys map to their current value, or `Null` when cleared.
    fn changed_values(&self) -> Mapping {
        self.current
            .keys()
            .chain(self.committed.keys())
            .filter(|key| self.current.get(*key) != self.committed.get(*key))
            .map(|key| {
                let value = self.current.get(key).cloned().unwrap_or(AttrValue::Null);
                (key.clone(), value)
            })
            .collect()
    }
}

impl ChangeObserver for InMemoryHost {
    fn will_change(&mut self, key: &str) {
        self.notifications.push(Notification::WillChange(key.to_string()));
    }

    fn did_change(&mut self, key: &str) {
        self.notifications.push(Notification::DidChange(key.to_string()));
    }
}

impl HistoryNavigation for InMemoryHost {
    fn history_state(&self) -> HistoryState {
        self.history_state
    }
}

impl DynamicAttributes for InMemoryHost {
    fn is_dynamic(&self, key: &str) -> bool {
        self.dynamic_keys.matches(key)
    }

    fn on_history_update(&mut self, key: &str, value: Option<&AttrValue>) {
        self.history_updates.push((key.to_string(), value.cloned()));
    }
}

impl DynamicObject<InMemoryHost> {
    /// Undo the last blob write. Returns `false` if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.navigate(HistoryState::Undoing)
    }

    /// Redo the last undone blob write. Returns `false` if there is nothing
    /// to redo.
    pub fn redo(&mut self) -> bool {
        self.navigate(HistoryState::Redoing)
    }

    fn navigate(&mut self, direction: HistoryState) -> bool {
        let Some(target) = self.host.take_history_step(direction) else {
            return false;
        };
        let blob_key = self.blob_key().to_string();

        self.host.set_history_state(direction);
        self.will_change(&blob_key);
        self.host.restore_blob(target);
        self.did_change(&blob_key);
        self.host.set_history_state(HistoryState::Idle);
        true
    }
}
