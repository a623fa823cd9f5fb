//! Realtime notification feed.
//!
//! One persistent WebSocket subscription with an explicit reconnect
//! state machine and linear, bounded backoff.

mod channel;
mod messages;
mod reconnect;

pub use channel::{ChannelConfig, ChannelError, ConnectionState, RealtimeChannel};
pub use messages::{msg_types, ClientMessage, PushMessage};
pub use reconnect::ReconnectPolicy;
