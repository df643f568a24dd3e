//! WebSocket server setup.
//!
//! # Responsibilities
//! - Create Axum Router accepting upgrades on every path
//! - Enforce max_connections before upgrading
//! - Turn each upgraded socket into an `Incoming` event
//! - Pump frames between the socket and the connection handle

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use crate::config::{RouterConfig, WebSocketConfig};
use crate::net::connection::ConnectionGuard;
use crate::net::{
    ConnectionHandle, ConnectionId, ConnectionTracker, Incoming, Outbound, Payload, RequestInfo,
};

/// Application state injected into handlers.
#[derive(Clone)]
struct AppState {
    incoming: mpsc::UnboundedSender<Incoming>,
    tracker: ConnectionTracker,
    max_connections: usize,
    websocket: WebSocketConfig,
}

/// WebSocket server feeding accepted connections to a router.
pub struct WsServer {
    router: Router,
    config: RouterConfig,
    tracker: ConnectionTracker,
}

impl WsServer {
    /// Create a server and the connection source to attach a router to.
    pub fn new(config: RouterConfig) -> (Self, mpsc::UnboundedReceiver<Incoming>) {
        let (incoming, connections) = mpsc::unbounded_channel();
        let tracker = ConnectionTracker::new();

        let state = AppState {
            incoming,
            tracker: tracker.clone(),
            max_connections: config.listener.max_connections,
            websocket: config.websocket.clone(),
        };

        let router = Router::new()
            .route("/{*path}", any(upgrade_handler))
            .route("/", any(upgrade_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        let server = Self {
            router,
            config,
            tracker,
        };
        (server, connections)
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_connections = self.config.listener.max_connections,
            "WebSocket server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("WebSocket server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Currently open WebSocket connections.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }
}

/// Accept the upgrade if below the connection limit.
async fn upgrade_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(guard) = state.tracker.try_track(state.max_connections) else {
        tracing::warn!(client = %addr, limit = state.max_connections, "Connection limit reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    let request = RequestInfo {
        path: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect(),
        remote_addr: Some(addr),
    };

    ws.max_message_size(state.websocket.max_message_bytes)
        .max_frame_size(state.websocket.max_frame_bytes)
        .on_upgrade(move |socket| pump(state, socket, request, guard))
}

/// Hand the socket to the router and move frames until either side closes.
async fn pump(state: AppState, socket: WebSocket, request: RequestInfo, _guard: ConnectionGuard) {
    let (handle, mut outbound) = ConnectionHandle::channel();
    // mpsc::channel panics on a zero capacity
    let (messages_tx, messages) = mpsc::channel(state.websocket.message_buffer.max(1));
    let connection_id = handle.id();
    let remote_addr = request.remote_addr;

    if state
        .incoming
        .send(Incoming {
            handle,
            request,
            messages,
        })
        .is_err()
    {
        tracing::warn!(connection_id = %connection_id, "No router attached, dropping connection");
        return;
    }

    tracing::info!(connection_id = %connection_id, client = ?remote_addr, "WebSocket connection established");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if messages_tx.send(Payload::Text(text.to_string())).await.is_err() {
                        listener_gone(&mut sink, connection_id).await;
                        break;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    if messages_tx.send(Payload::Binary(bytes.to_vec())).await.is_err() {
                        listener_gone(&mut sink, connection_id).await;
                        break;
                    }
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // Pong is handled automatically by axum
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!(connection_id = %connection_id, "Client closed connection");
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                    break;
                }
            },
            instruction = outbound.recv() => match instruction {
                Some(Outbound::Message(payload)) => {
                    if let Err(e) = sink.send(into_frame(payload)).await {
                        tracing::warn!(connection_id = %connection_id, error = %e, "Send failed");
                        break;
                    }
                }
                Some(Outbound::Close) => {
                    let _ = sink.send(Message::Close(None)).await;
                    tracing::info!(connection_id = %connection_id, "Connection closed by server");
                    break;
                }
                // every handle dropped; nothing can write anymore
                None => break,
            },
            _ = messages_tx.closed() => {
                listener_gone(&mut sink, connection_id).await;
                break;
            }
        }
    }
}

/// The router stopped reading this connection (e.g. a message handler panicked).
async fn listener_gone(sink: &mut SplitSink<WebSocket, Message>, connection_id: ConnectionId) {
    tracing::warn!(connection_id = %connection_id, "Message listener stopped, closing connection");
    let _ = sink.send(Message::Close(None)).await;
}

fn into_frame(payload: Payload) -> Message {
    match payload {
        Payload::Text(text) => Message::Text(text.into()),
        Payload::Binary(bytes) => Message::Binary(bytes.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_to_frame() {
        assert_eq!(into_frame(Payload::from("hi")), Message::Text("hi".into()));
        assert_eq!(into_frame(Payload::from(vec![1u8, 2])), Message::Binary(vec![1u8, 2].into()));
    }
}
