//! Notification Sync Client Library
//!
//! Keeps a local notification collection consistent with a remote
//! backend: an initial REST snapshot, a realtime WebSocket feed with
//! bounded reconnection, and optimistic read/delete/preferences
//! mutations that roll back when their confirmation fails.

pub mod api;
pub mod config;
pub mod realtime;
pub mod session;
pub mod store;

// Re-export commonly used types for convenience
pub use api::{ApiClient, Category, FetchError, Notification, NotificationApi, Preferences, Priority};
pub use realtime::{ChannelConfig, ConnectionState, RealtimeChannel, ReconnectPolicy};
pub use session::{FileTokenProvider, StaticTokenProvider, TokenProvider};
pub use store::{NotificationStore, PendingOp, PreferencesError, SyncError, ValidationError};
