//! HTTP/WebSocket transport adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, upgrade handshake, connection limit)
//!     → Incoming { handle, request, messages } sent to the attached router
//!     → frame pump: inbound frames → messages, handle → outbound frames
//! ```
//!
//! # Design Decisions
//! - The router never sees axum types; this module is the only place that does
//! - Every path upgrades; route selection happens in the router's sweep

pub mod server;

pub use server::WsServer;
