//! REST API layer: wire data models and the HTTP client.

mod client;
mod models;

pub use client::{ApiClient, FetchError, NotificationApi};
pub use models::{Category, Notification, NotificationList, NotificationPage, Preferences, Priority};
