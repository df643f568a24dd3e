//! Message dispatch for established connections.
//!
//! Every registered handler runs for every inbound message on every
//! connection; there is no pattern matching at this level.

use crate::routing::chain::{run_steps, Flow, MessageHandler};
use crate::routing::context::MessageContext;
use crate::routing::error::DispatchError;

/// Ordered, append-only list of message handlers.
#[derive(Default)]
pub struct MessageRouter {
    handlers: Vec<MessageHandler>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handler: MessageHandler) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run all handlers in order for one message.
    ///
    /// Stops after a handler returns [`Flow::StopChain`] or fails. A failure is
    /// returned to the caller, which decides how to report it.
    pub async fn dispatch(&self, ctx: &mut MessageContext) -> Result<Flow, DispatchError> {
        run_steps(&self.handlers, ctx)
            .await
            .map_err(|err| DispatchError::Message {
                step: err.step,
                source: err.source,
            })
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{ConnectionHandle, Payload, RequestInfo};
    use crate::routing::chain::message_handler;
    use crate::routing::error::BoxError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn context(text: &str) -> MessageContext {
        let (handle, _rx) = ConnectionHandle::channel();
        MessageContext::new(handle, Arc::new(RequestInfo::new("/chat")), Payload::from(text))
    }

    fn counting(counter: &Arc<AtomicUsize>, flow: Flow) -> MessageHandler {
        let counter = counter.clone();
        message_handler(move |_ctx| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(flow)
            })
        })
    }

    #[tokio::test]
    async fn test_all_handlers_run() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut router = MessageRouter::new();
        router.push(counting(&first, Flow::Continue));
        router.push(counting(&second, Flow::Continue));

        let flow = router.dispatch(&mut context("hi")).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_chain_skips_rest() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut router = MessageRouter::new();
        router.push(counting(&first, Flow::StopChain));
        router.push(counting(&second, Flow::Continue));

        let flow = router.dispatch(&mut context("hi")).await.unwrap();
        assert_eq!(flow, Flow::StopChain);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_reports_step() {
        let after = Arc::new(AtomicUsize::new(0));
        let mut router = MessageRouter::new();
        router.push(message_handler(|ctx| {
            Box::pin(async move {
                match ctx.payload().as_text() {
                    Some("bad") => Err(BoxError::from("rejected payload")),
                    _ => Ok(Flow::Continue),
                }
            })
        }));
        router.push(counting(&after, Flow::Continue));

        let err = router.dispatch(&mut context("bad")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Message { step: 0, .. }));
        assert_eq!(err.inner().to_string(), "rejected payload");
        assert_eq!(after.load(Ordering::SeqCst), 0);

        router.dispatch(&mut context("good")).await.unwrap();
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_router_continues() {
        let router = MessageRouter::new();
        assert!(router.is_empty());
        assert_eq!(router.dispatch(&mut context("hi")).await.unwrap(), Flow::Continue);
    }
}
