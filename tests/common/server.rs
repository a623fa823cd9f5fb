//! Stub backend lifecycle management
//!
//! Spawns an in-process notification backend exposing the REST routes
//! and the WebSocket feed the client consumes, with switches for fault
//! injection. Each test gets an isolated instance on a random port.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};

use notify_client::{Notification, Preferences};

use super::constants::TEST_TOKEN;

/// Shared state of the stub backend, exposed so tests can seed data,
/// flip failure switches, and observe what the client actually did.
pub struct StubState {
    pub notifications: Mutex<Vec<Notification>>,
    pub preferences: Mutex<Preferences>,

    /// When set, every mutation endpoint answers 500.
    pub fail_mutations: AtomicBool,
    /// When set, WebSocket upgrade requests answer 503.
    pub reject_connections: AtomicBool,
    /// When set, the list endpoint wraps results in a paginated envelope.
    pub paginate: AtomicBool,

    /// Mutation endpoint hits (mark_read, mark_all_read, delete, patch).
    pub mutation_calls: AtomicUsize,
    /// Accepted WebSocket connections.
    pub ws_connections: AtomicUsize,
    /// Keepalive pings received over the socket.
    pub pings_received: AtomicUsize,

    push_tx: broadcast::Sender<String>,
    kick_tx: broadcast::Sender<()>,
}

/// Stub backend instance.
///
/// When dropped, the server shuts down and the port is released.
pub struct StubServer {
    /// Base URL for REST requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,
    /// WebSocket feed URL.
    pub ws_url: String,
    /// Shared state handle.
    pub state: Arc<StubState>,

    _shutdown_tx: Option<oneshot::Sender<()>>,
}

impl StubServer {
    /// Spawns a stub backend on a random port.
    pub async fn spawn() -> Self {
        let (push_tx, _) = broadcast::channel(32);
        let (kick_tx, _) = broadcast::channel(8);
        let state = Arc::new(StubState {
            notifications: Mutex::new(Vec::new()),
            preferences: Mutex::new(Preferences::all_enabled(1)),
            fail_mutations: AtomicBool::new(false),
            reject_connections: AtomicBool::new(false),
            paginate: AtomicBool::new(false),
            mutation_calls: AtomicUsize::new(0),
            ws_connections: AtomicUsize::new(0),
            pings_received: AtomicUsize::new(0),
            push_tx,
            kick_tx,
        });

        let app = Router::new()
            .route("/api/notifications/", get(list_notifications))
            .route("/api/notifications/mark_all_read/", post(mark_all_read))
            .route("/api/notifications/{id}/mark_read/", post(mark_read))
            .route("/api/notifications/{id}/", delete(delete_notification))
            .route("/api/preferences/", get(get_preferences))
            .route("/api/preferences/{id}/", patch(update_preferences))
            .route("/ws/notifications/", get(ws_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Stub server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            ws_url: format!("ws://127.0.0.1:{}/ws/notifications/", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Replace the server-side notification list.
    pub fn seed(&self, items: Vec<Notification>) {
        *self.state.notifications.lock().unwrap() = items;
    }

    /// Server-side view of one notification.
    pub fn notification(&self, id: u64) -> Option<Notification> {
        self.state
            .notifications
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == id)
            .cloned()
    }

    /// Broadcast a notification push to every connected socket.
    pub fn push_notification(&self, notification: &Notification) {
        let frame = serde_json::json!({
            "type": "notification",
            "payload": notification,
        });
        self.push_raw(frame.to_string());
    }

    /// Broadcast a raw text frame to every connected socket.
    pub fn push_raw(&self, text: impl Into<String>) {
        // No receivers just means no connected sockets.
        let _ = self.state.push_tx.send(text.into());
    }

    /// Server-side close of every connected socket.
    pub fn kick_connections(&self) {
        let _ = self.state.kick_tx.send(());
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", TEST_TOKEN);
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str())
}

async fn list_notifications(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let items = state.notifications.lock().unwrap().clone();
    if state.paginate.load(Ordering::SeqCst) {
        Json(serde_json::json!({
            "count": items.len(),
            "next": null,
            "previous": null,
            "results": items,
        }))
        .into_response()
    } else {
        Json(items).into_response()
    }
}

async fn mark_read(
    State(state): State<Arc<StubState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.mutation_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_mutations.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let mut items = state.notifications.lock().unwrap();
    match items.iter_mut().find(|n| n.id == id) {
        Some(notification) => {
            notification.read = true;
            Json(notification.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn mark_all_read(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.mutation_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_mutations.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    for notification in state.notifications.lock().unwrap().iter_mut() {
        notification.read = true;
    }
    StatusCode::OK.into_response()
}

async fn delete_notification(
    State(state): State<Arc<StubState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.mutation_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_mutations.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let mut items = state.notifications.lock().unwrap();
    match items.iter().position(|n| n.id == id) {
        Some(pos) => {
            items.remove(pos);
            StatusCode::NO_CONTENT.into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_preferences(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(state.preferences.lock().unwrap().clone()).into_response()
}

async fn update_preferences(
    State(state): State<Arc<StubState>>,
    Path(_id): Path<u64>,
    headers: HeaderMap,
    Json(next): Json<Preferences>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.mutation_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_mutations.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    *state.preferences.lock().unwrap() = next.clone();
    Json(next).into_response()
}

async fn ws_handler(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    if state.reject_connections.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if params.get("token").map(String::as_str) != Some(TEST_TOKEN) {
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(socket: WebSocket, state: Arc<StubState>) {
    state.ws_connections.fetch_add(1, Ordering::SeqCst);
    let mut pushes = state.push_tx.subscribe();
    let mut kicks = state.kick_tx.subscribe();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = pushes.recv() => match frame {
                Ok(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            _ = kicks.recv() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if text.as_str().contains("\"ping\"") {
                        state.pings_received.fetch_add(1, Ordering::SeqCst);
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            }
        }
    }
}
