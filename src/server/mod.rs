//! HTTP server for Apiary
//!
//! Builds the axum router from a frozen route registry and runs it. The
//! layout mirrors the hosting contract:
//!
//! - every bound module is mounted under `/api`, behind the response
//!   envelope
//! - `GET /api/info` serves the route catalog
//! - `GET /settings.json` serves the raw settings document, unenveloped
//! - anything else gets the fixed 404 body, and handler failures or panics
//!   get the fixed 500 body
//!
//! Each path gets a single method router with its own 404 fallback, so a
//! request for a known path with an unregistered method falls through to
//! the not-found response instead of a 405.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use http_body_util::Full;
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info};

use crate::catalog::{build_catalog, Catalog};
use crate::config::Settings;
use crate::envelope::{apply_envelope, EnvelopeConfig};
use crate::error::{ApiaryError, Result};
use crate::handlers::RequestContext;
use crate::modules::{RouteBinding, RouteRegistry, API_PREFIX, CATALOG_PATH};

/// Shared state behind every request.
pub struct AppState {
    /// The settings document loaded at startup.
    pub settings: Settings,

    /// The frozen route set; the catalog is derived from it per request.
    pub bindings: Vec<RouteBinding>,
}

/// A handler failure on its way to the client.
///
/// The error is logged here, at the single point where it turns into a
/// response, so handlers never need to log their own failures.
struct RouteFailure(ApiaryError);

impl IntoResponse for RouteFailure {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Route handler failed");
        internal_error_response()
    }
}

fn not_found_body() -> Value {
    json!({
        "status": 404,
        "error": "Not Found",
        "message": "The requested resource does not exist on this host"
    })
}

fn internal_error_body() -> Value {
    json!({
        "status": 500,
        "error": "Internal Server Error",
        "message": "The route handler failed to produce a response"
    })
}

/// The fixed response for unknown routes.
pub fn not_found_response() -> Response {
    (StatusCode::NOT_FOUND, Json(not_found_body())).into_response()
}

/// The fixed response for handler failures.
pub fn internal_error_response() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(internal_error_body())).into_response()
}

async fn fallback_404() -> Response {
    not_found_response()
}

/// Response built when a handler panics instead of returning.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> axum::http::Response<Full<Bytes>> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "non-string panic payload".to_string()
    };
    error!(panic = %detail, "Route handler panicked");

    let body = serde_json::to_vec(&internal_error_body()).unwrap_or_default();
    let mut response = axum::http::Response::new(Full::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Serve the route catalog, grouped fresh from the frozen bindings.
async fn catalog_info(State(state): State<Arc<AppState>>) -> Json<Catalog> {
    Json(build_catalog(&state.bindings))
}

/// Serve the settings document exactly as it was read from disk.
async fn serve_settings(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.settings.raw_document().to_string(),
    )
        .into_response()
}

/// Bodies that do not parse as JSON are presented to handlers as absent.
fn parse_body(body: &Bytes) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}

/// Build the router for the bound modules.
///
/// Bindings are grouped by path so each path carries one method router.
fn api_router(bindings: &[RouteBinding]) -> Router<Arc<AppState>> {
    let mut grouped: BTreeMap<&str, Vec<&RouteBinding>> = BTreeMap::new();
    for binding in bindings {
        grouped.entry(binding.base_path()).or_default().push(binding);
    }

    let mut router = Router::new();
    for (path, bindings) in grouped {
        let mut method_router = MethodRouter::new();
        for binding in bindings {
            let handler = Arc::clone(&binding.handler);
            let method = binding.method();
            let route_path = binding.base_path().to_string();

            let endpoint = move |Query(query): Query<HashMap<String, String>>, body: Bytes| {
                let handler = Arc::clone(&handler);
                let route_path = route_path.clone();
                async move {
                    let ctx = RequestContext {
                        method: method.as_str().to_string(),
                        path: route_path,
                        query,
                        body: parse_body(&body),
                    };
                    match handler.handle(ctx).await {
                        Ok(payload) => Ok(Json(payload)),
                        Err(e) => Err(RouteFailure(e)),
                    }
                }
            };

            method_router = method_router.on(method.method_filter(), endpoint);
        }
        router = router.route(path, method_router.fallback(fallback_404));
    }
    router
}

/// Build the full application router from a frozen registry.
///
/// The registry is consumed; once the router exists no route can be added
/// or removed.
pub fn build_router(settings: Settings, registry: RouteRegistry) -> Router {
    let envelope = EnvelopeConfig::new(settings.creator());
    let bindings = registry.into_bindings();

    let api = api_router(&bindings)
        .route(CATALOG_PATH, get(catalog_info))
        .layer(middleware::from_fn_with_state(envelope, apply_envelope));

    let state = Arc::new(AppState { settings, bindings });

    Router::new()
        .nest(API_PREFIX, api)
        .route("/settings.json", get(serve_settings))
        .fallback(fallback_404)
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// Bind the listen port and serve until the process is stopped.
pub async fn serve(settings: Settings, registry: RouteRegistry, port: u16) -> Result<()> {
    let routes = registry.route_count();
    let app = build_router(settings, registry);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, routes, "Apiary listening");

    axum::serve(listener, app).await?;
    Ok(())
}
