//! Handler chains.
//!
//! # Responsibilities
//! - Define the async handler contract shared by connection and message handlers
//! - Build a route chain: match step, user handlers, terminator
//! - Run steps strictly in order with short-circuit on [`Flow::StopChain`]
//!
//! # Design Decisions
//! - Steps never run concurrently; later steps see what earlier ones wrote
//! - No retries: the first error aborts the run and is returned to the caller
//! - The match step is the only step the router itself inserts that can stop a chain

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::routing::context::{ConnectionContext, MessageContext};
use crate::routing::error::BoxError;
use crate::routing::matcher::RoutePattern;

/// Boxed future returned by handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler tells the chain to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the next step.
    Continue,
    /// Skip the remaining steps of this chain only.
    StopChain,
}

/// Result of a single handler step.
pub type HandlerResult = Result<Flow, BoxError>;

/// One async step operating on a context of type `C`.
pub trait Handler<C>: Send + Sync {
    fn call<'a>(&'a self, ctx: &'a mut C) -> BoxFuture<'a, HandlerResult>;
}

impl<C, F> Handler<C> for F
where
    F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    fn call<'a>(&'a self, ctx: &'a mut C) -> BoxFuture<'a, HandlerResult> {
        self(ctx)
    }
}

/// Shared connection handler.
pub type ConnectionHandler = Arc<dyn Handler<ConnectionContext>>;

/// Shared message handler.
pub type MessageHandler = Arc<dyn Handler<MessageContext>>;

/// Wrap a closure as a connection handler.
///
/// ```ignore
/// handler(|ctx| Box::pin(async move {
///     tracing::info!(order = ?ctx.param("orderId"), "order client");
///     Ok(Flow::Continue)
/// }))
/// ```
pub fn handler<F>(f: F) -> ConnectionHandler
where
    F: for<'a> Fn(&'a mut ConnectionContext) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a message handler.
pub fn message_handler<F>(f: F) -> MessageHandler
where
    F: for<'a> Fn(&'a mut MessageContext) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// A step failed at `step`.
#[derive(Debug)]
pub struct StepError {
    pub step: usize,
    pub source: BoxError,
}

/// Run `steps` in order against `ctx`.
///
/// Returns [`Flow::StopChain`] if a step stopped the run early, otherwise
/// [`Flow::Continue`].
pub async fn run_steps<C, H>(steps: &[Arc<H>], ctx: &mut C) -> Result<Flow, StepError>
where
    H: Handler<C> + ?Sized,
{
    for (step, h) in steps.iter().enumerate() {
        match h.call(ctx).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::StopChain) => return Ok(Flow::StopChain),
            Err(source) => return Err(StepError { step, source }),
        }
    }
    Ok(Flow::Continue)
}

/// First step of every chain: matches the request path, stops the chain on mismatch.
#[derive(Debug)]
struct MatchStep {
    pattern: RoutePattern,
}

impl Handler<ConnectionContext> for MatchStep {
    fn call<'a>(&'a self, ctx: &'a mut ConnectionContext) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            match self.pattern.matches(&ctx.request().path) {
                Some(params) => {
                    if self.pattern.is_parameterized() {
                        ctx.set_params(params);
                    }
                    Ok(Flow::Continue)
                }
                None => {
                    tracing::debug!(
                        connection_id = %ctx.handle().id(),
                        pattern = %self.pattern,
                        path = %ctx.request().path,
                        "Route skipped"
                    );
                    Ok(Flow::StopChain)
                }
            }
        })
    }
}

/// Last step of every chain. Does nothing; keeps the chain tail stable.
#[derive(Debug)]
struct Terminator;

impl Handler<ConnectionContext> for Terminator {
    fn call<'a>(&'a self, _ctx: &'a mut ConnectionContext) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async { Ok(Flow::Continue) })
    }
}

/// Ordered steps registered for one route pattern. Never mutated after construction.
pub struct Chain {
    pattern: RoutePattern,
    steps: Vec<ConnectionHandler>,
}

#[allow(clippy::len_without_is_empty)]
impl Chain {
    /// Build `[match step, ...handlers, terminator]`.
    pub fn new(pattern: RoutePattern, handlers: impl IntoIterator<Item = ConnectionHandler>) -> Self {
        let mut steps: Vec<ConnectionHandler> = vec![Arc::new(MatchStep {
            pattern: pattern.clone(),
        })];
        steps.extend(handlers);
        steps.push(Arc::new(Terminator));
        Self { pattern, steps }
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Number of steps including the match step and terminator.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Run the chain to completion or until a step stops or fails.
    pub async fn run(&self, ctx: &mut ConnectionContext) -> Result<Flow, StepError> {
        run_steps(&self.steps, ctx).await
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("pattern", &self.pattern)
            .field("steps", &self.steps.len())
            .finish()
    }
}
