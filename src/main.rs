//! WebSocket middleware router (demo server).
//!
//! Accepts WebSocket connections on every path and runs the registered route
//! chains against each one.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──upgrade──▶ http::server ──Incoming──▶ routing::Router
//!                         (axum, limits)            │
//!                                                   ├─ sweep: chain 1 → chain 2 → ...
//!                                                   │    [match step, handlers, terminator]
//!                                                   └─ messages: handler 1 → handler 2 → ...
//!   Client ◀──frames──── http::server ◀──Outbound── ConnectionHandle
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use socket_router::config::{load_config, RouterConfig};
use socket_router::observability::logging;
use socket_router::routing::BoxError;
use socket_router::{handler, message_handler, Flow, Router, WsServer};

#[derive(Parser)]
#[command(name = "socket-router")]
#[command(about = "WebSocket middleware router", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

/// Marker left by the first `/client` handler for the second.
#[derive(Clone)]
struct ClientTag(&'static str);

fn routes(router: &mut Router) {
    router
        .register(
            "/manager",
            vec![
                handler(|ctx| {
                    Box::pin(async move {
                        tracing::info!(connection_id = %ctx.handle().id(), "Manager step 1");
                        Ok(Flow::Continue)
                    })
                }),
                handler(|ctx| {
                    Box::pin(async move {
                        tracing::info!(connection_id = %ctx.handle().id(), "Manager step 2");
                        Ok(Flow::Continue)
                    })
                }),
            ],
        )
        .register(
            "/client",
            vec![
                handler(|ctx| {
                    Box::pin(async move {
                        ctx.insert(ClientTag("client"));
                        Ok(Flow::Continue)
                    })
                }),
                handler(|ctx| {
                    Box::pin(async move {
                        let tag = ctx.get::<ClientTag>().map(|t| t.0).unwrap_or("unknown");
                        ctx.handle().send_text(format!("hello {tag}"))?;
                        Ok::<_, BoxError>(Flow::Continue)
                    })
                }),
            ],
        )
        .register(
            "/client/:orderId",
            vec![handler(|ctx| {
                Box::pin(async move {
                    let order_id = ctx.param("orderId").unwrap_or_default().to_string();
                    tracing::info!(connection_id = %ctx.handle().id(), order_id = %order_id, "Order client");
                    ctx.handle()
                        .send_text(json!({ "orderId": order_id }).to_string())?;
                    Ok::<_, BoxError>(Flow::Continue)
                })
            })],
        )
        .on_message(message_handler(|ctx| {
            Box::pin(async move {
                let Some(text) = ctx.payload().as_text() else {
                    return Ok(Flow::StopChain);
                };
                let value: serde_json::Value = serde_json::from_str(text)?;
                let reply = json!({ "connection": ctx.handle().id().as_u64(), "echo": value });
                ctx.handle().send_text(reply.to_string())?;
                Ok::<_, BoxError>(Flow::Continue)
            })
        }));

    router.set_error_hook(|err, handle| {
        tracing::error!(connection_id = %handle.id(), error = %err, "Custom catch, closing connection");
        handle.close();
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!("socket-router v{} starting", env!("CARGO_PKG_VERSION"));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let (server, connections) = WsServer::new(config);

    let mut router = Router::new();
    routes(&mut router);
    router.attach(connections)?;

    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
