//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! router, transport and handlers produce:
//!     → tracing events with connection_id / pattern / path fields
//!     → logging.rs subscriber (text or JSON to stdout)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Connection ID flows through every dispatch log line

pub mod logging;
