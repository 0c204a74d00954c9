//! History reconciliation.
//!
//! Undo and redo restore an earlier blob value directly on the host, behind
//! the property store's back. When the blob's after-change notification
//! arrives during navigation, the navigated blob is decoded, diffed against
//! the in-memory mapping, and only the differing keys are replayed, each
//! inside its own notification pair. Replay never re-encodes or writes the
//! blob.

use dynattr_diff::{diff_mappings, ChangeKind};
use tracing::debug;

use crate::host::{AttributeHost, HistoryState};
use crate::object::DynamicObject;

/// What one reconciliation pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// History state observed when the pass ran.
    pub state: HistoryState,
    /// Keys written into the in-memory mapping, in key order.
    pub replayed: Vec<String>,
    /// Subset of `replayed` that was bracketed by notifications.
    pub notified: Vec<String>,
    /// Keys the navigated blob holds that the live mapping lacked.
    pub added: usize,
    /// Keys the live mapping held that the navigated blob lacks.
    pub removed: usize,
    /// Keys present on both sides with different values.
    pub modified: usize,
}

impl ReconcileReport {
    /// Returns `true` if the pass ran while navigating history.
    pub fn ran(&self) -> bool {
        self.state.is_navigating()
    }

    pub fn is_empty(&self) -> bool {
        self.replayed.is_empty()
    }
}

impl<H: AttributeHost> DynamicObject<H> {
    /// Bring the in-memory mapping in line with a navigated blob.
    ///
    /// Does nothing unless the host reports an undo or redo in progress. An
    /// unmaterialized mapping is diffed as absent and stays unmaterialized.
    pub fn reconcile(&mut self) -> ReconcileReport {
        let state = self.host.history_state();
        let mut report = ReconcileReport {
            state,
            ..Default::default()
        };
        if !state.is_navigating() {
            return report;
        }

        let navigated = self
            .properties
            .decode_value(self.host.attribute(self.properties.blob_key()).as_ref());
        let diff = diff_mappings(self.properties.peek(), navigated.as_ref());
        report.added = diff.count(ChangeKind::Added);
        report.removed = diff.count(ChangeKind::Removed);
        report.modified = diff.count(ChangeKind::Modified);

        for change in diff {
            let (key, value) = (change.key, change.new);
            let notify = self.host.is_dynamic(&key);

            if notify {
                self.host.will_change(&key);
            }
            self.properties.replay(&key, value.clone());
            self.host.on_history_update(&key, value.as_ref());
            if notify {
                self.host.did_change(&key);
                report.notified.push(key.clone());
            }
            report.replayed.push(key);
        }

        debug!(
            state = ?state,
            replayed = report.replayed.len(),
            added = report.added,
            removed = report.removed,
            modified = report.modified,
            notified = report.notified.len(),
            "reconciled dynamic attributes after history navigation"
        );
        report
    }
}
