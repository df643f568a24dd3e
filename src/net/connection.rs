//! Connection handles and the connection-accepting collaborator.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Give handlers a cloneable handle to send frames and close the socket
//! - Describe the "new connection" event a transport hands to the router
//! - Count live connections for backpressure

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Raw message payload, as received from or sent to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    /// Text view of the payload, if it is a text frame.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes)
    }
}

/// Instruction queued for the transport writing to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Message(Payload),
    Close,
}

/// Error returned when the transport side of a handle is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection {0} is closed")]
pub struct ConnectionClosed(pub ConnectionId);

/// Cloneable handle to one accepted connection.
///
/// The router itself never sends or closes; the handle exists for handlers
/// and the error hook.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver the transport drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: ConnectionId::new(),
            outbound: tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a payload for the peer.
    pub fn send(&self, payload: impl Into<Payload>) -> Result<(), ConnectionClosed> {
        self.outbound
            .send(Outbound::Message(payload.into()))
            .map_err(|_| ConnectionClosed(self.id))
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<(), ConnectionClosed> {
        self.send(Payload::Text(text.into()))
    }

    pub fn send_binary(&self, bytes: impl Into<Vec<u8>>) -> Result<(), ConnectionClosed> {
        self.send(Payload::Binary(bytes.into()))
    }

    /// Ask the transport to close the connection.
    ///
    /// Closing an already closed connection is a no-op.
    pub fn close(&self) {
        if self.outbound.send(Outbound::Close).is_ok() {
            tracing::debug!(connection_id = %self.id, "Close requested");
        }
    }

    /// Returns true once the transport stopped draining this handle.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// Metadata from the upgrade request that opened the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// Request target exactly as received (path plus query, unnormalized).
    pub path: String,
    /// Request headers, lossily decoded to strings.
    pub headers: Vec<(String, String)>,
    /// Peer address, when the transport knows it.
    pub remote_addr: Option<SocketAddr>,
}

impl RequestInfo {
    /// Request info carrying only a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// First header with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A "new connection" event produced by a transport.
#[derive(Debug)]
pub struct Incoming {
    pub handle: ConnectionHandle,
    pub request: RequestInfo,
    /// Inbound payloads for this connection; ends when the peer goes away.
    /// Bounded so a slow handler pushes back on the socket reader.
    pub messages: mpsc::Receiver<Payload>,
}

/// Anything that can hand the router newly accepted connections.
pub trait ConnectionSource: Send + 'static {
    /// Wait for the next connection. `None` means no more connections will arrive.
    fn accept(&mut self) -> impl Future<Output = Option<Incoming>> + Send;
}

impl ConnectionSource for mpsc::Receiver<Incoming> {
    fn accept(&mut self) -> impl Future<Output = Option<Incoming>> + Send {
        self.recv()
    }
}

impl ConnectionSource for mpsc::UnboundedReceiver<Incoming> {
    fn accept(&mut self) -> impl Future<Output = Option<Incoming>> + Send {
        self.recv()
    }
}

/// Tracks active connections for backpressure.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    /// Current count of active connections.
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection unless `limit` is already reached.
    /// Returns a guard that decrements on drop.
    pub fn try_track(&self, limit: usize) -> Option<ConnectionGuard> {
        let limit = limit as u64;
        self.active_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < limit).then_some(n + 1))
            .ok()?;
        Some(ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
        })
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }
}
