//! WebSocket middleware router library.

pub mod config;
pub mod http;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use http::WsServer;
pub use routing::{handler, message_handler, Flow, Router};
