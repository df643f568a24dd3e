//! Connection layer shared by the router and transports.
//!
//! # Data Flow
//! ```text
//! Transport accepts a socket
//!     → Incoming { handle, request, messages }
//!     → ConnectionSource::accept() hands it to the router
//!     → handlers reply and close through ConnectionHandle
//! ```
//!
//! # Design Decisions
//! - The router depends only on ConnectionSource, never on a concrete server
//! - Handles are channel-backed so they can be cloned into any handler
//! - Each connection tracked for backpressure

pub mod connection;

pub use connection::{
    ConnectionClosed, ConnectionHandle, ConnectionId, ConnectionSource, ConnectionTracker,
    Incoming, Outbound, Payload, RequestInfo,
};
