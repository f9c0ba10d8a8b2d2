//! Built-in handler library
//!
//! Every handler a module manifest can name lives here. Each one is
//! configured entirely from manifest data, so publishing a new route never
//! requires Rust changes. Instantiation is infallible; handlers that touch
//! the filesystem do so per request and surface failures through the
//! internal-error response.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::{ApiaryError, Result};
use crate::modules::HandlerSpec;

use super::{RequestContext, RouteHandler};

/// Instantiate the handler a manifest asks for.
///
/// `base_dir` is the directory of the module file; handlers that reference
/// files resolve them against it.
pub fn build_handler(spec: &HandlerSpec, base_dir: &Path) -> Arc<dyn RouteHandler> {
    match spec {
        HandlerSpec::Static { body } => Arc::new(StaticHandler::new(body.clone())),
        HandlerSpec::Echo { merge } => Arc::new(EchoHandler::new(merge.clone())),
        HandlerSpec::Inspect => Arc::new(InspectHandler),
        HandlerSpec::JsonFile { file } => Arc::new(JsonFileHandler::new(base_dir.join(file))),
    }
}

/// Responds with a fixed JSON value on every request.
pub struct StaticHandler {
    body: Value,
}

impl StaticHandler {
    pub fn new(body: Value) -> Self {
        Self { body }
    }
}

#[async_trait]
impl RouteHandler for StaticHandler {
    async fn handle(&self, _ctx: RequestContext) -> Result<Value> {
        Ok(self.body.clone())
    }
}

/// Reflects the request body back to the caller.
///
/// Object bodies come back as-is; anything else, including no body at all,
/// comes back under an `echo` key. Entries from the configured `merge`
/// object are applied last, so a module can pin keys such as `status`
/// regardless of what the caller sent.
pub struct EchoHandler {
    merge: Value,
}

impl EchoHandler {
    pub fn new(merge: Value) -> Self {
        Self { merge }
    }
}

#[async_trait]
impl RouteHandler for EchoHandler {
    async fn handle(&self, ctx: RequestContext) -> Result<Value> {
        let mut payload = match ctx.body {
            Some(Value::Object(entries)) => entries,
            other => {
                let mut map = Map::new();
                map.insert("echo".to_string(), other.unwrap_or(Value::Null));
                map
            }
        };
        if let Value::Object(overlay) = &self.merge {
            for (key, value) in overlay {
                payload.insert(key.clone(), value.clone());
            }
        }
        Ok(Value::Object(payload))
    }
}

/// Responds with what the host observed about the request.
pub struct InspectHandler;

#[async_trait]
impl RouteHandler for InspectHandler {
    async fn handle(&self, ctx: RequestContext) -> Result<Value> {
        Ok(json!({
            "method": ctx.method,
            "path": ctx.path,
            "query": ctx.query,
        }))
    }
}

/// Responds with a JSON document read from disk on every request.
///
/// The file is read at request time, so edits to it show up without a
/// restart. A missing or malformed file fails the request.
pub struct JsonFileHandler {
    path: PathBuf,
}

impl JsonFileHandler {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RouteHandler for JsonFileHandler {
    async fn handle(&self, _ctx: RequestContext) -> Result<Value> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ApiaryError::Handler(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            ApiaryError::Handler(format!("invalid JSON in {}: {}", self.path.display(), e))
        })
    }
}
