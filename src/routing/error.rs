//! Routing error types.

use thiserror::Error;

/// Error type handlers return. Any `std::error::Error` converts into it with `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A handler failed while the router was dispatching.
///
/// Pattern mismatches are not errors; they only short-circuit a chain.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A step of a connection chain failed; the rest of the sweep was abandoned.
    #[error("route `{pattern}` step {step} failed: {source}")]
    Connection {
        pattern: String,
        /// Position in the chain, counting the leading match step as 0.
        step: usize,
        #[source]
        source: BoxError,
    },

    /// A message handler failed; later messages are still dispatched.
    #[error("message handler {step} failed: {source}")]
    Message {
        step: usize,
        #[source]
        source: BoxError,
    },
}

impl DispatchError {
    /// The error the handler returned.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        match self {
            DispatchError::Connection { source, .. } | DispatchError::Message { source, .. } => {
                source.as_ref()
            }
        }
    }

    /// Unwrap into the error the handler returned.
    pub fn into_source(self) -> BoxError {
        match self {
            DispatchError::Connection { source, .. } | DispatchError::Message { source, .. } => {
                source
            }
        }
    }
}

/// Error returned by [`Router::attach`](crate::routing::Router::attach).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttachError {
    #[error("router is already attached to a connection source")]
    AlreadyAttached,
}
