//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use socket_router::config::RouterConfig;
use socket_router::{Router, WsServer};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Running server; dropping it shuts the server down.
pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

/// Start the WebSocket server on an ephemeral port with `router` attached.
pub async fn start_server(router: &mut Router, config: RouterConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (server, connections) = WsServer::new(config);
    router.attach(connections).unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = server
            .run(listener, async {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        addr,
        _shutdown: tx,
    }
}

pub async fn connect(server: &TestServer, path: &str) -> Client {
    let (ws, _response) = tokio_tungstenite::connect_async(server.url(path))
        .await
        .expect("WebSocket handshake failed");
    ws
}

/// Next frame from the server, or `None` if nothing arrives in time or the stream ended.
pub async fn next_frame(ws: &mut Client) -> Option<Message> {
    match tokio::time::timeout(Duration::from_secs(2), ws.next()).await {
        Ok(Some(Ok(frame))) => Some(frame),
        _ => None,
    }
}

/// Next text frame, skipping control frames.
#[allow(dead_code)]
pub async fn next_text(ws: &mut Client) -> Option<String> {
    loop {
        match next_frame(ws).await? {
            Message::Text(text) => return Some(text.as_str().to_string()),
            Message::Ping(_) | Message::Pong(_) => continue,
            _ => return None,
        }
    }
}
