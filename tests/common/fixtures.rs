//! Test fixture builders.

use notify_client::config::{AppConfig, CliConfig};
use notify_client::{Category, Notification, Priority};

use super::constants::{RECONNECT_BASE_DELAY, REQUEST_TIMEOUT_SECS};
use super::server::StubServer;

/// A notification with the given identity; remaining fields are fixed.
pub fn notification(id: u64, created_at: i64, read: bool) -> Notification {
    Notification {
        id,
        title: format!("Notification {id}"),
        message: format!("Message body {id}"),
        category: Category::TaskUpdated,
        priority: Priority::Medium,
        read,
        created_at,
        updated_at: None,
    }
}

/// Client configuration pointed at a stub server, with test-friendly
/// reconnect pacing.
pub fn app_config(server: &StubServer, max_attempts: u32) -> AppConfig {
    let cli = CliConfig {
        server_url: Some(server.base_url.clone()),
        ws_url: Some(server.ws_url.clone()),
        request_timeout_sec: REQUEST_TIMEOUT_SECS,
        reconnect_base_delay_ms: RECONNECT_BASE_DELAY.as_millis() as u64,
        reconnect_max_attempts: max_attempts,
        ..Default::default()
    };
    AppConfig::resolve(&cli, None).expect("Failed to resolve test config")
}
