//! Realtime message types.
//!
//! Defines the canonical message envelope used on the notification
//! WebSocket. Payloads are carried as JSON values so unknown message
//! kinds can be skipped without failing the whole frame.

use serde::{Deserialize, Serialize};

/// Server -> Client message envelope.
///
/// Every inbound frame is one of these; `msg_type` selects the payload
/// shape (e.g., "notification", "pong").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushMessage {
    /// Message type identifier
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Type-specific payload (JSON value)
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Client -> Server message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    /// Message type identifier
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl ClientMessage {
    /// Keepalive request; the server answers with `pong`.
    pub fn ping() -> Self {
        Self {
            msg_type: msg_types::PING.to_string(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Reserved message type constants.
pub mod msg_types {
    /// A created or updated notification (server -> client); payload is
    /// a full Notification.
    pub const NOTIFICATION: &str = "notification";
    /// Client heartbeat request.
    pub const PING: &str = "ping";
    /// Server heartbeat response.
    pub const PONG: &str = "pong";
}
