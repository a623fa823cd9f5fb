//! Pending-operation records for optimistic mutations.
//!
//! Every optimistic mutation registers a record of the pre-mutation
//! state before its REST confirmation is issued; rolling back replays
//! the record. Keeping these explicit (rather than ad hoc flags) makes
//! the revert behavior checkable from the outside.

use crate::api::{Notification, Preferences};

/// Pre-mutation state captured by an optimistic update that is awaiting
/// its REST confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOp {
    /// `read` was flipped to true; `was_read` restores it.
    MarkRead { id: u64, was_read: bool },
    /// Every entry was flipped to read; `unread_ids` lists the ones
    /// that were unread before.
    MarkAllRead { unread_ids: Vec<u64> },
    /// The entry was removed; `removed` re-inserts it at its sorted
    /// position.
    Delete { removed: Notification },
    /// Preferences were replaced; `previous` restores them.
    UpdatePreferences { previous: Option<Preferences> },
}

impl PendingOp {
    /// Operation name, as used in error reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PendingOp::MarkRead { .. } => "mark_read",
            PendingOp::MarkAllRead { .. } => "mark_all_read",
            PendingOp::Delete { .. } => "delete",
            PendingOp::UpdatePreferences { .. } => "update_preferences",
        }
    }
}
