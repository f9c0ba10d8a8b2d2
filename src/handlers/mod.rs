//! Request handlers for Apiary routes
//!
//! A route module's manifest names a handler kind; this module defines the
//! `RouteHandler` trait those handlers implement and the request context
//! they receive. Handlers return a bare JSON payload; the response envelope
//! is applied later, in the HTTP layer.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub mod builtin;

pub use builtin::{build_handler, EchoHandler, InspectHandler, JsonFileHandler, StaticHandler};

/// What a handler gets to see of the incoming request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Lowercase HTTP method of the request.
    pub method: String,

    /// Request path relative to `/api`.
    pub path: String,

    /// Query parameters as sent by the client.
    pub query: HashMap<String, String>,

    /// Parsed JSON request body, if the client sent one.
    pub body: Option<Value>,
}

impl RequestContext {
    /// Create a context with no query parameters and no body.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: HashMap::new(),
            body: None,
        }
    }

    /// Attach query parameters.
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Attach a parsed JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A handler bound to a route.
///
/// Implementations produce the route's JSON payload. Errors are reported to
/// the client as the host's internal-error response, so handlers should
/// return them rather than panic.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    /// Produce the JSON payload for one request.
    async fn handle(&self, ctx: RequestContext) -> Result<Value>;
}
