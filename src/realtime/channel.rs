//! Realtime notification channel.
//!
//! Maintains the single persistent WebSocket subscription as an explicit
//! state machine: connect attempts, linear-backoff reconnects with a
//! bounded attempt count, and a cancellation-safe shutdown that clears
//! any pending backoff timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::Notification;
use crate::session::TokenProvider;

use super::messages::{msg_types, ClientMessage, PushMessage};
use super::reconnect::ReconnectPolicy;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle of the realtime channel. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

/// Transport-level channel error. Handled internally by the reconnect
/// loop; never surfaced to callers except as the terminal
/// `Disconnected` state.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no session token available")]
    MissingToken,

    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Configuration for the realtime channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Full WebSocket endpoint URL, without the token query parameter.
    pub ws_url: String,
    /// Reconnect backoff policy.
    pub policy: ReconnectPolicy,
    /// Keepalive ping interval while the connection is open.
    pub ping_interval: Duration,
}

impl ChannelConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            policy: ReconnectPolicy::default(),
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// The single realtime subscription.
///
/// One connect/reconnect sequence is active at a time; `connect` while
/// not `Disconnected` is a no-op. Exactly one handler is invoked per
/// inbound notification message.
pub struct RealtimeChannel {
    config: ChannelConfig,
    tokens: Arc<dyn TokenProvider>,
    state: Arc<Mutex<ConnectionState>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeChannel {
    pub fn new(config: ChannelConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            config,
            tokens,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    /// Start the connect loop, delivering each pushed notification to
    /// `handler`.
    ///
    /// No-op when a connect/reconnect sequence is already active or the
    /// channel has been shut down.
    pub fn connect<F>(&self, handler: F)
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        if self.cancel.is_cancelled() {
            debug!("ignoring connect on a shut-down channel");
            return;
        }
        {
            let mut state = self.state.lock().unwrap();
            if *state != ConnectionState::Disconnected {
                debug!("ignoring connect while {}", state.as_str());
                return;
            }
            *state = ConnectionState::Connecting;
        }

        let config = self.config.clone();
        let tokens = Arc::clone(&self.tokens);
        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(run_loop(config, tokens, state, cancel, Arc::new(handler)));
        *self.task.lock().unwrap() = Some(handle);
    }

    /// Close the connection and cancel any pending reconnect timer.
    ///
    /// After this returns the state is `Disconnected` and no further
    /// connect attempt will ever be scheduled.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                debug!("realtime task ended abnormally: {err}");
            }
        }
        *self.state.lock().unwrap() = ConnectionState::Disconnected;
    }
}

fn set_state(state: &Mutex<ConnectionState>, next: ConnectionState) {
    let mut current = state.lock().unwrap();
    if *current != next {
        debug!("realtime channel {} -> {}", current.as_str(), next.as_str());
        *current = next;
    }
}

async fn run_loop(
    config: ChannelConfig,
    tokens: Arc<dyn TokenProvider>,
    state: Arc<Mutex<ConnectionState>>,
    cancel: CancellationToken,
    handler: Arc<dyn Fn(Notification) + Send + Sync>,
) {
    // Consecutive failures since the last Open transition. A dropped
    // open connection counts as one so the first reconnect already
    // waits `base_delay`.
    let mut failures: u32 = 0;

    loop {
        set_state(&state, ConnectionState::Connecting);

        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = open_socket(&config, tokens.as_ref()) => attempt,
        };

        match attempt {
            Ok(socket) => {
                failures = 0;
                set_state(&state, ConnectionState::Open);
                if read_frames(socket, &config, &cancel, &handler).await {
                    break; // cancelled
                }
                failures += 1;
            }
            Err(err) => {
                warn!("realtime connect attempt failed: {err}");
                failures += 1;
            }
        }

        if config.policy.is_exhausted(failures) {
            warn!(
                "realtime channel giving up after {} consecutive failures",
                failures
            );
            break;
        }

        set_state(&state, ConnectionState::Reconnecting);
        let delay = config.policy.delay_for(failures);
        debug!("reconnecting in {:?} (failure {})", delay, failures);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    set_state(&state, ConnectionState::Disconnected);
}

async fn open_socket(
    config: &ChannelConfig,
    tokens: &dyn TokenProvider,
) -> Result<WsStream, ChannelError> {
    let token = tokens.bearer_token().ok_or(ChannelError::MissingToken)?;
    let url = format!("{}?token={}", config.ws_url, urlencoding::encode(&token));
    let (socket, _response) = connect_async(url).await?;
    Ok(socket)
}

/// Pump frames until the socket drops or the channel is cancelled.
/// Returns true when the exit was caused by cancellation.
async fn read_frames(
    socket: WsStream,
    config: &ChannelConfig,
    cancel: &CancellationToken,
    handler: &Arc<dyn Fn(Notification) + Send + Sync>,
) -> bool {
    let (mut sink, mut stream) = socket.split();
    let mut ping = tokio::time::interval(config.ping_interval);
    // Skip the immediate first tick; the first ping waits a full interval.
    ping.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return true;
            }
            _ = ping.tick() => {
                let frame = serde_json::to_string(&ClientMessage::ping())
                    .expect("ping message serializes");
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    debug!("realtime keepalive send failed");
                    return false;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => handle_text(text.as_str(), handler),
                    Some(Ok(Message::Close(_))) => {
                        debug!("server closed the realtime connection");
                        return false;
                    }
                    // Binary frames are not part of the contract; ping/pong
                    // control frames are answered by the transport.
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!("realtime socket error: {err}");
                        return false;
                    }
                    None => {
                        debug!("realtime stream ended");
                        return false;
                    }
                }
            }
        }
    }
}

/// Parse one inbound text frame. Malformed input is logged and dropped;
/// it never transitions the state machine.
fn handle_text(text: &str, handler: &Arc<dyn Fn(Notification) + Send + Sync>) {
    let message = match serde_json::from_str::<PushMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            warn!("dropping malformed realtime frame: {err}");
            return;
        }
    };

    match message.msg_type.as_str() {
        msg_types::NOTIFICATION => {
            match serde_json::from_value::<Notification>(message.payload) {
                Ok(notification) => handler(notification),
                Err(err) => warn!("dropping malformed notification payload: {err}"),
            }
        }
        msg_types::PONG => {}
        other => debug!("ignoring realtime message type {:?}", other),
    }
}
