//! Route registration and connection dispatch.
//!
//! # Responsibilities
//! - Store route chains in registration order
//! - Run every chain against each new connection (the sweep)
//! - Dispatch inbound messages to the message handlers
//! - Route handler failures to the error hook or the default logger
//!
//! # Design Decisions
//! - Registration order is the only precedence; there are no priorities
//! - Each chain run gets a fresh context; nothing leaks between routes
//! - The first failure ends the sweep for that connection, hook or not
//! - Chains and message handlers are frozen once attached
//! - The error hook can be swapped at any time without locking

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::task::JoinHandle;

use crate::net::{ConnectionHandle, ConnectionSource, Incoming, Payload, RequestInfo};
use crate::routing::chain::{Chain, ConnectionHandler, Flow, MessageHandler};
use crate::routing::context::{ConnectionContext, MessageContext};
use crate::routing::error::{AttachError, DispatchError};
use crate::routing::matcher::RoutePattern;
use crate::routing::message::MessageRouter;

/// User callback invoked when a handler fails.
///
/// Owns recovery entirely: the router takes no further action after calling it.
pub struct ErrorHook {
    f: Box<dyn Fn(&DispatchError, &ConnectionHandle) + Send + Sync>,
}

impl ErrorHook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&DispatchError, &ConnectionHandle) + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }

    fn invoke(&self, err: &DispatchError, handle: &ConnectionHandle) {
        (self.f)(err, handle)
    }
}

impl std::fmt::Debug for ErrorHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ErrorHook")
    }
}

/// How a sweep or a message dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every step ran.
    Completed,
    /// A handler returned [`Flow::StopChain`] (message dispatch only).
    Stopped,
    /// A handler failed and the error was reported.
    Aborted,
}

/// Read-only view shared by the accept loop and per-connection tasks.
#[derive(Clone)]
struct Dispatch {
    chains: Arc<Vec<Chain>>,
    messages: Arc<MessageRouter>,
    error_hook: Arc<ArcSwapOption<ErrorHook>>,
}

impl Dispatch {
    async fn sweep(&self, handle: &ConnectionHandle, request: &Arc<RequestInfo>) -> Outcome {
        for chain in self.chains.iter() {
            let mut ctx = ConnectionContext::new(handle.clone(), Arc::clone(request));
            if let Err(err) = chain.run(&mut ctx).await {
                let err = DispatchError::Connection {
                    pattern: chain.pattern().to_string(),
                    step: err.step,
                    source: err.source,
                };
                self.report(err, handle);
                return Outcome::Aborted;
            }
        }
        Outcome::Completed
    }

    async fn dispatch_message(
        &self,
        handle: &ConnectionHandle,
        request: &Arc<RequestInfo>,
        payload: Payload,
    ) -> Outcome {
        let mut ctx = MessageContext::new(handle.clone(), Arc::clone(request), payload);
        match self.messages.dispatch(&mut ctx).await {
            Ok(Flow::Continue) => Outcome::Completed,
            Ok(Flow::StopChain) => Outcome::Stopped,
            Err(err) => {
                self.report(err, handle);
                Outcome::Aborted
            }
        }
    }

    fn report(&self, err: DispatchError, handle: &ConnectionHandle) {
        match self.error_hook.load_full() {
            Some(hook) => hook.invoke(&err, handle),
            None => tracing::error!(connection_id = %handle.id(), error = %err, "Handler failed"),
        }
    }

    /// Drive one accepted connection: start its message listener, then sweep.
    async fn serve(self, incoming: Incoming) {
        let Incoming {
            handle,
            request,
            mut messages,
        } = incoming;
        let request = Arc::new(request);

        tracing::debug!(connection_id = %handle.id(), path = %request.path, "Connection accepted");

        let listener = self.clone();
        let listener_handle = handle.clone();
        let listener_request = Arc::clone(&request);
        tokio::spawn(async move {
            while let Some(payload) = messages.recv().await {
                listener
                    .dispatch_message(&listener_handle, &listener_request, payload)
                    .await;
            }
            tracing::trace!(connection_id = %listener_handle.id(), "Message stream ended");
        });

        if self.sweep(&handle, &request).await == Outcome::Aborted {
            tracing::debug!(connection_id = %handle.id(), "Sweep aborted");
        }
    }
}

/// WebSocket middleware router.
///
/// Register routes and message handlers, then [`attach`](Router::attach) to a
/// connection source.
pub struct Router {
    chains: Arc<Vec<Chain>>,
    messages: Arc<MessageRouter>,
    error_hook: Arc<ArcSwapOption<ErrorHook>>,
    attached: bool,
}

impl Router {
    pub fn new() -> Self {
        Self {
            chains: Arc::new(Vec::new()),
            messages: Arc::new(MessageRouter::new()),
            error_hook: Arc::new(ArcSwapOption::empty()),
            attached: false,
        }
    }

    /// Append a chain for `pattern` running `handlers` in order.
    ///
    /// Ignored (with a warning) once the router is attached.
    pub fn register<I>(&mut self, pattern: impl Into<RoutePattern>, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = ConnectionHandler>,
    {
        let chain = Chain::new(pattern.into(), handlers);
        match Arc::get_mut(&mut self.chains) {
            Some(chains) if !self.attached => {
                tracing::debug!(pattern = %chain.pattern(), steps = chain.len(), "Route registered");
                chains.push(chain);
            }
            _ => {
                tracing::warn!(pattern = %chain.pattern(), "Router already attached, route ignored");
            }
        }
        self
    }

    /// Append a handler run for every inbound message.
    ///
    /// Ignored (with a warning) once the router is attached.
    pub fn on_message(&mut self, handler: MessageHandler) -> &mut Self {
        match Arc::get_mut(&mut self.messages) {
            Some(messages) if !self.attached => messages.push(handler),
            _ => tracing::warn!("Router already attached, message handler ignored"),
        }
        self
    }

    /// Install the error hook, replacing any previous one.
    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: Fn(&DispatchError, &ConnectionHandle) + Send + Sync + 'static,
    {
        self.error_hook.store(Some(Arc::new(ErrorHook::new(hook))));
    }

    /// Remove the error hook, restoring log-and-continue.
    pub fn clear_error_hook(&self) {
        self.error_hook.store(None);
    }

    pub fn has_error_hook(&self) -> bool {
        self.error_hook.load().is_some()
    }

    /// Registered patterns in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RoutePattern> {
        self.chains.iter().map(Chain::pattern)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Run every chain against one connection, in registration order.
    ///
    /// Stops at the first handler failure, which goes to the error hook.
    pub async fn sweep(&self, handle: &ConnectionHandle, request: RequestInfo) -> Outcome {
        self.dispatch().sweep(handle, &Arc::new(request)).await
    }

    /// Run the message handlers for one inbound payload.
    pub async fn dispatch_message(
        &self,
        handle: &ConnectionHandle,
        request: Arc<RequestInfo>,
        payload: Payload,
    ) -> Outcome {
        self.dispatch()
            .dispatch_message(handle, &request, payload)
            .await
    }

    /// Bind to `source` and start dispatching on the current tokio runtime.
    ///
    /// Only the first call binds; later calls fail with
    /// [`AttachError::AlreadyAttached`]. The returned task ends when the source
    /// stops producing connections.
    pub fn attach<S: ConnectionSource>(&mut self, mut source: S) -> Result<JoinHandle<()>, AttachError> {
        if self.attached {
            return Err(AttachError::AlreadyAttached);
        }
        self.attached = true;

        let dispatch = self.dispatch();
        tracing::info!(
            routes = self.chains.len(),
            message_handlers = self.messages.len(),
            "Router attached"
        );

        Ok(tokio::spawn(async move {
            while let Some(incoming) = source.accept().await {
                tokio::spawn(dispatch.clone().serve(incoming));
            }
            tracing::info!("Connection source closed");
        }))
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch {
            chains: Arc::clone(&self.chains),
            messages: Arc::clone(&self.messages),
            error_hook: Arc::clone(&self.error_hook),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("chains", &self.chains)
            .field("messages", &self.messages)
            .field("error_hook", &self.has_error_hook())
            .field("attached", &self.attached)
            .finish()
    }
}
