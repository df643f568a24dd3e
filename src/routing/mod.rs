//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before attach):
//!     register(pattern, handlers)
//!     → chain.rs ([match step, ...handlers, terminator])
//!     → router.rs (append to ordered chain list)
//!
//! New connection (after attach):
//!     Incoming { handle, request }
//!     → router.rs sweep: for each chain in registration order
//!         → context.rs (fresh ConnectionContext)
//!         → matcher.rs (path match, capture params, or StopChain)
//!         → user handlers in order
//!     → first handler error → error hook or log, sweep ends
//!
//! Inbound message:
//!     → message.rs (all message handlers in order, StopChain ends early)
//! ```
//!
//! # Design Decisions
//! - Chains are built once and never mutated
//! - Deterministic: same path always runs the same chains in the same order
//! - No regex; patterns are literal or `:param` segments

pub mod chain;
pub mod context;
pub mod error;
pub mod matcher;
pub mod message;
pub mod router;

pub use chain::{
    handler, message_handler, BoxFuture, ConnectionHandler, Flow, Handler, HandlerResult,
    MessageHandler,
};
pub use context::{ConnectionContext, MessageContext};
pub use error::{AttachError, BoxError, DispatchError};
pub use matcher::{Params, RoutePattern};
pub use router::{Outcome, Router};
