//! Per-run state handed to handlers.
//!
//! A [`ConnectionContext`] lives for exactly one chain run: it is created right
//! before the chain starts and dropped when it ends, so handlers in the same
//! chain share it and handlers of other routes never see it.

use std::sync::Arc;

use axum::http::Extensions;

use crate::net::{ConnectionHandle, Payload, RequestInfo};
use crate::routing::matcher::Params;

/// State shared by the steps of one chain run against one connection.
#[derive(Debug)]
pub struct ConnectionContext {
    handle: ConnectionHandle,
    request: Arc<RequestInfo>,
    params: Option<Params>,
    extensions: Extensions,
}

impl ConnectionContext {
    /// Fresh context with no params and an empty extension map.
    pub fn new(handle: ConnectionHandle, request: Arc<RequestInfo>) -> Self {
        Self {
            handle,
            request,
            params: None,
            extensions: Extensions::new(),
        }
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Parameters captured by the route pattern.
    ///
    /// `None` for literal patterns, which capture nothing.
    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// Single captured parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.as_ref()?.get(name).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = Some(params);
    }

    /// User data shared between handlers of this chain run.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Store a value for later handlers, returning the previous one of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}

/// State for one inbound message on an established connection.
#[derive(Debug)]
pub struct MessageContext {
    handle: ConnectionHandle,
    request: Arc<RequestInfo>,
    payload: Payload,
}

impl MessageContext {
    pub fn new(handle: ConnectionHandle, request: Arc<RequestInfo>, payload: Payload) -> Self {
        Self {
            handle,
            request,
            payload,
        }
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// The upgrade request that opened the connection.
    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Role(&'static str);

    #[test]
    fn test_extensions_shared_within_context() {
        let (handle, _rx) = ConnectionHandle::channel();
        let mut ctx = ConnectionContext::new(handle, Arc::new(RequestInfo::new("/client")));

        assert!(ctx.get::<Role>().is_none());
        assert_eq!(ctx.insert(Role("client")), None);
        assert_eq!(ctx.get::<Role>(), Some(&Role("client")));
        assert_eq!(ctx.insert(Role("manager")), Some(Role("client")));
    }

    #[test]
    fn test_params_absent_until_set() {
        let (handle, _rx) = ConnectionHandle::channel();
        let mut ctx = ConnectionContext::new(handle, Arc::new(RequestInfo::new("/client/42")));
        assert!(ctx.params().is_none());
        assert_eq!(ctx.param("orderId"), None);

        ctx.set_params(Params::from([("orderId".to_string(), "42".to_string())]));
        assert_eq!(ctx.param("orderId"), Some("42"));
        assert_eq!(ctx.request().path, "/client/42");
    }
}
