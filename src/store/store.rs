//! In-memory notification store.
//!
//! Reconciles three inputs over one cached collection: the initial REST
//! snapshot, pushed events from the realtime channel, and optimistic
//! user mutations confirmed (or rolled back) via REST.

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{FetchError, Notification, NotificationApi, Preferences};
use crate::realtime::{ConnectionState, RealtimeChannel};

use super::pending::PendingOp;

/// An optimistic mutation whose REST confirmation failed. Produced only
/// after the local rollback has completed.
#[derive(Debug, Error)]
#[error("failed to confirm {operation}: {source}")]
pub struct SyncError {
    /// Which mutation failed.
    pub operation: &'static str,
    /// Affected notification id, when the operation targets one.
    pub id: Option<u64>,
    #[source]
    pub source: FetchError,
}

/// A preferences update rejected locally, before any request is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("at least one notification category must remain enabled")]
    NoCategoryEnabled,
}

/// Failure modes of `update_preferences`.
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

#[derive(Default)]
struct StoreState {
    /// Sorted newest-first by `created_at`, ties by `id` descending.
    notifications: Vec<Notification>,
    preferences: Option<Preferences>,
    /// Optimistic mutations awaiting their REST confirmation.
    pending: Vec<PendingOp>,
}

/// The notification store.
///
/// The realtime channel is injected at construction and wired to
/// `apply_push` by `start()`; there is no process-wide socket state.
/// The interior lock is never held across I/O. A push arriving while a
/// confirmation is in flight interleaves freely; whichever callback
/// runs last wins. There is no per-entity versioning.
pub struct NotificationStore {
    api: Arc<dyn NotificationApi>,
    channel: RealtimeChannel,
    state: Arc<RwLock<StoreState>>,
}

impl NotificationStore {
    pub fn new(api: Arc<dyn NotificationApi>, channel: RealtimeChannel) -> Self {
        Self {
            api,
            channel,
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Start the realtime subscription, feeding pushes into the store.
    pub fn start(&self) {
        self.start_with_observer(|_| {});
    }

    /// Like `start`, additionally invoking `observer` after each push
    /// has been applied (for UIs that render incrementally).
    pub fn start_with_observer<F>(&self, observer: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let state = Arc::clone(&self.state);
        self.channel.connect(move |notification| {
            apply_push_to(&state, notification.clone());
            observer(&notification);
        });
    }

    /// Stop the realtime subscription. No reconnect fires afterwards.
    pub async fn shutdown(&self) {
        self.channel.shutdown().await;
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Sorted snapshot of the cached collection.
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.read().unwrap().notifications.clone()
    }

    /// Count of cached notifications with `read == false`.
    pub fn unread_count(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub fn preferences(&self) -> Option<Preferences> {
        self.state.read().unwrap().preferences.clone()
    }

    /// Optimistic mutations currently awaiting confirmation.
    pub fn pending_ops(&self) -> Vec<PendingOp> {
        self.state.read().unwrap().pending.clone()
    }

    // =========================================================================
    // Snapshot loads
    // =========================================================================

    /// Fetch the full list and replace the cached collection.
    ///
    /// No automatic retry; the caller re-issues on failure.
    pub async fn load(&self) -> Result<usize, FetchError> {
        let mut fetched = self.api.list_notifications().await?;
        sort_notifications(&mut fetched);
        let count = fetched.len();

        let mut state = self.state.write().unwrap();
        state.notifications = fetched;
        Ok(count)
    }

    /// Fetch preferences into the cache.
    pub async fn load_preferences(&self) -> Result<Preferences, FetchError> {
        let prefs = self.api.get_preferences().await?;
        self.state.write().unwrap().preferences = Some(prefs.clone());
        Ok(prefs)
    }

    // =========================================================================
    // Push reconciliation
    // =========================================================================

    /// Apply a pushed notification: merge on an existing `id`
    /// (last-write-wins on all fields), insert at the sorted position
    /// otherwise. Never fails.
    pub fn apply_push(&self, incoming: Notification) {
        apply_push_to(&self.state, incoming);
    }

    // =========================================================================
    // Optimistic mutations
    // =========================================================================

    /// Mark one notification read. Optimistic; rolled back when the
    /// confirmation fails. Returns Ok(false), without a REST call, when
    /// the id is not cached.
    pub async fn mark_read(&self, id: u64) -> Result<bool, SyncError> {
        let record = {
            let mut state = self.state.write().unwrap();
            let Some(entry) = state.notifications.iter_mut().find(|n| n.id == id) else {
                debug!("mark_read({id}) ignored: not cached");
                return Ok(false);
            };
            let record = PendingOp::MarkRead {
                id,
                was_read: entry.read,
            };
            entry.read = true;
            state.pending.push(record.clone());
            record
        };

        match self.api.mark_read(id).await {
            Ok(()) => {
                self.settle(&record);
                Ok(true)
            }
            Err(source) => Err(self.roll_back(record, Some(id), source)),
        }
    }

    /// Mark every cached notification read with a single confirmation
    /// call. On failure exactly the previously-unread set is restored.
    pub async fn mark_all_read(&self) -> Result<usize, SyncError> {
        let (record, count) = {
            let mut state = self.state.write().unwrap();
            let unread_ids: Vec<u64> = state
                .notifications
                .iter()
                .filter(|n| !n.read)
                .map(|n| n.id)
                .collect();
            if unread_ids.is_empty() {
                return Ok(0);
            }
            let count = unread_ids.len();
            for entry in state.notifications.iter_mut() {
                entry.read = true;
            }
            let record = PendingOp::MarkAllRead { unread_ids };
            state.pending.push(record.clone());
            (record, count)
        };

        match self.api.mark_all_read().await {
            Ok(()) => {
                self.settle(&record);
                Ok(count)
            }
            Err(source) => Err(self.roll_back(record, None, source)),
        }
    }

    /// Delete one notification. Optimistic; a failed confirmation
    /// re-inserts it at its sorted position. Returns Ok(false), without
    /// a REST call, when the id is not cached.
    pub async fn delete(&self, id: u64) -> Result<bool, SyncError> {
        let record = {
            let mut state = self.state.write().unwrap();
            let Some(pos) = state.notifications.iter().position(|n| n.id == id) else {
                debug!("delete({id}) ignored: not cached");
                return Ok(false);
            };
            let removed = state.notifications.remove(pos);
            let record = PendingOp::Delete { removed };
            state.pending.push(record.clone());
            record
        };

        match self.api.delete_notification(id).await {
            Ok(()) => {
                self.settle(&record);
                Ok(true)
            }
            Err(source) => Err(self.roll_back(record, Some(id), source)),
        }
    }

    /// Replace preferences. Rejected locally when every category would
    /// be disabled; otherwise optimistic with rollback on a failed
    /// confirmation. Returns the server's confirmed version.
    pub async fn update_preferences(
        &self,
        next: Preferences,
    ) -> Result<Preferences, PreferencesError> {
        if !next.has_enabled_category() {
            return Err(ValidationError::NoCategoryEnabled.into());
        }

        let record = {
            let mut state = self.state.write().unwrap();
            let record = PendingOp::UpdatePreferences {
                previous: state.preferences.clone(),
            };
            state.preferences = Some(next.clone());
            state.pending.push(record.clone());
            record
        };

        match self.api.update_preferences(&next).await {
            Ok(confirmed) => {
                self.settle(&record);
                self.state.write().unwrap().preferences = Some(confirmed.clone());
                Ok(confirmed)
            }
            Err(source) => Err(self.roll_back(record, None, source).into()),
        }
    }

    // =========================================================================
    // Rollback machinery
    // =========================================================================

    /// Drop a confirmed record from the pending set.
    fn settle(&self, record: &PendingOp) {
        let mut state = self.state.write().unwrap();
        if let Some(pos) = state.pending.iter().position(|p| p == record) {
            state.pending.remove(pos);
        }
    }

    /// Replay a record's pre-mutation state and build the SyncError.
    fn roll_back(&self, record: PendingOp, id: Option<u64>, source: FetchError) -> SyncError {
        let operation = record.kind();
        warn!("{operation} confirmation failed, rolling back: {source}");

        let mut state = self.state.write().unwrap();
        if let Some(pos) = state.pending.iter().position(|p| *p == record) {
            state.pending.remove(pos);
        }

        match record {
            PendingOp::MarkRead { id, was_read } => {
                if let Some(entry) = state.notifications.iter_mut().find(|n| n.id == id) {
                    entry.read = was_read;
                }
            }
            PendingOp::MarkAllRead { unread_ids } => {
                for entry in state.notifications.iter_mut() {
                    if unread_ids.contains(&entry.id) {
                        entry.read = false;
                    }
                }
            }
            PendingOp::Delete { removed } => {
                // A push may have re-created the id in the meantime; the
                // pushed version wins.
                if !state.notifications.iter().any(|n| n.id == removed.id) {
                    insert_sorted(&mut state.notifications, removed);
                }
            }
            PendingOp::UpdatePreferences { previous } => {
                state.preferences = previous;
            }
        }

        SyncError {
            operation,
            id,
            source,
        }
    }
}

fn apply_push_to(state: &RwLock<StoreState>, incoming: Notification) {
    let mut state = state.write().unwrap();
    let slot = state
        .notifications
        .iter_mut()
        .find(|n| n.id == incoming.id);
    if let Some(existing) = slot {
        debug!("merging pushed update for notification {}", incoming.id);
        *existing = incoming;
        // The merge may have moved created_at.
        sort_notifications(&mut state.notifications);
    } else {
        debug!("inserting pushed notification {}", incoming.id);
        insert_sorted(&mut state.notifications, incoming);
    }
}

fn sort_notifications(items: &mut [Notification]) {
    items.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
}

fn insert_sorted(items: &mut Vec<Notification>, incoming: Notification) {
    let key = incoming.sort_key();
    let pos = items.partition_point(|n| n.sort_key() > key);
    items.insert(pos, incoming);
}
