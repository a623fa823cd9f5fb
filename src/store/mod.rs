//! Notification store: the cached collection and its optimistic
//! mutation machinery.

mod pending;
mod store;

pub use pending::PendingOp;
pub use store::{NotificationStore, PreferencesError, SyncError, ValidationError};
