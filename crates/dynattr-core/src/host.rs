//! Capabilities consumed from the host persistence framework.
//!
//! The host owns the object lifecycle, the static schema, change
//! notifications and the history manager. The dynamic attribute bag only
//! calls into these traits. Hosts implement the four concern traits; the
//! blanket [`AttributeHost`] bundles them.

use std::collections::BTreeSet;

use dynattr_types::{AttrValue, Mapping};

use crate::error::{AttrError, AttrResult};

/// What the host's history manager is doing right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HistoryState {
    #[default]
    Idle,
    Undoing,
    Redoing,
}

impl HistoryState {
    /// Returns `true` while an undo or redo is being replayed.
    pub fn is_navigating(&self) -> bool {
        matches!(self, Self::Undoing | Self::Redoing)
    }
}

/// Attribute storage over the host's static schema.
///
/// The blob attribute is an ordinary declared attribute holding
/// [`AttrValue::Bytes`].
pub trait AttributeStorage {
    /// Returns `true` if `key` is declared in the static schema.
    fn has_attribute(&self, key: &str) -> bool;

    /// Current value of a declared attribute.
    fn attribute(&self, key: &str) -> Option<AttrValue>;

    /// Write a declared attribute. `None` clears it.
    ///
    /// Every call counts as a write, even when the value is unchanged.
    fn set_attribute(&mut self, key: &str, value: Option<AttrValue>);

    /// Last committed values of declared attributes, restricted to `keys`
    /// when given.
    fn committed_values(&self, keys: Option<&BTreeSet<String>>) -> Mapping;

    /// Declared attributes whose current value differs from the committed
    /// one.
    fn changed_values(&self) -> Mapping;

    /// Read fallback for keys that are neither declared nor dynamic.
    fn undefined_value(&self, key: &str) -> AttrResult<Option<AttrValue>> {
        Err(AttrError::UnknownAttribute(key.to_string()))
    }

    /// Write fallback for keys that are neither declared nor dynamic.
    fn set_undefined_value(&mut self, key: &str, _value: Option<AttrValue>) -> AttrResult<()> {
        Err(AttrError::UnknownAttribute(key.to_string()))
    }
}

/// Change notification hooks.
///
/// Every `will_change(key)` must be followed by exactly one
/// `did_change(key)`.
pub trait ChangeObserver {
    fn will_change(&mut self, key: &str);
    fn did_change(&mut self, key: &str);
}

/// Query into the host's undo/redo manager.
pub trait HistoryNavigation {
    fn history_state(&self) -> HistoryState;
}

/// Override points for hosts that carry dynamic attributes.
pub trait DynamicAttributes {
    /// Whether an undeclared `key` may be stored in the dynamic bag.
    fn is_dynamic(&self, _key: &str) -> bool {
        false
    }

    /// Called once per key replayed by history reconciliation, after the
    /// in-memory value has been updated. `value` is `None` for a removal.
    fn on_history_update(&mut self, _key: &str, _value: Option<&AttrValue>) {}
}

/// Everything a host object must provide.
pub trait AttributeHost:
    AttributeStorage + ChangeObserver + HistoryNavigation + DynamicAttributes
{
}

impl<T> AttributeHost for T where
    T: AttributeStorage + ChangeObserver + HistoryNavigation + DynamicAttributes
{
}
