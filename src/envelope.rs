//! Uniform response envelope
//!
//! Every successful JSON object produced under `/api` is merged into the
//! envelope `{ "status": 200, "creator": ... }` before it leaves the host.
//! Payload keys win, so a route can override either field. Non-object
//! payloads (arrays, strings, numbers) are passed through byte for byte,
//! as are non-JSON and non-200 responses.
//!
//! The envelope is applied as middleware on the `/api` sub-router only;
//! `/settings.json` and the fallback responses never see it.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use tracing::warn;

/// Everything the envelope needs from the settings document.
#[derive(Debug, Clone)]
pub struct EnvelopeConfig {
    /// Value of the envelope's `creator` field.
    pub creator: String,
}

impl EnvelopeConfig {
    pub fn new(creator: impl Into<String>) -> Self {
        Self {
            creator: creator.into(),
        }
    }
}

/// Merge a payload object into the envelope. Payload keys win.
pub fn wrap_object(payload: Map<String, Value>, creator: &str) -> Value {
    let mut wrapped = Map::new();
    wrapped.insert("status".to_string(), Value::from(200));
    wrapped.insert("creator".to_string(), Value::from(creator));
    wrapped.extend(payload);
    Value::Object(wrapped)
}

/// Middleware that applies the envelope to `/api` responses.
///
/// Only `200 application/json` responses are touched. The body is buffered
/// and re-serialized only when it parses as a JSON object; anything else is
/// re-emitted with its original bytes.
pub async fn apply_envelope(
    State(config): State<EnvelopeConfig>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    let (mut parts, body) = response.into_parts();

    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if parts.status != StatusCode::OK || !is_json {
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to buffer response body for envelope");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(payload)) => {
            match serde_json::to_vec(&wrap_object(payload, &config.creator)) {
                Ok(wrapped) => Bytes::from(wrapped),
                Err(e) => {
                    warn!(error = %e, "Failed to serialize enveloped response");
                    bytes
                }
            }
        }
        _ => bytes,
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Json, Router};
    use serde_json::json;
    use tower::util::ServiceExt;

    #[test]
    fn test_wrap_object_adds_status_and_creator() {
        let payload = match json!({ "message": "pong" }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let wrapped = wrap_object(payload, "Created Using Apiary UI");
        assert_eq!(
            wrapped,
            json!({
                "status": 200,
                "creator": "Created Using Apiary UI",
                "message": "pong"
            })
        );
    }

    #[test]
    fn test_wrap_object_payload_keys_win() {
        let payload = match json!({ "status": 418, "creator": "me", "ok": true }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let wrapped = wrap_object(payload, "Created Using Apiary UI");
        assert_eq!(wrapped["status"], 418);
        assert_eq!(wrapped["creator"], "me");
        assert_eq!(wrapped["ok"], true);
    }

    #[test]
    fn test_wrap_object_empty_payload() {
        let wrapped = wrap_object(Map::new(), "c");
        assert_eq!(wrapped, json!({ "status": 200, "creator": "c" }));
    }

    fn wrapped_router(handler_router: Router) -> Router {
        handler_router.layer(middleware::from_fn_with_state(
            EnvelopeConfig::new("test-creator"),
            apply_envelope,
        ))
    }

    async fn body_bytes(response: Response) -> Bytes {
        to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn test_middleware_wraps_object_payloads() {
        let app = wrapped_router(
            Router::new().route("/x", get(|| async { Json(json!({ "message": "pong" })) })),
        );

        let response = app
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let value: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(value["status"], 200);
        assert_eq!(value["creator"], "test-creator");
        assert_eq!(value["message"], "pong");
    }

    #[tokio::test]
    async fn test_middleware_passes_arrays_through_byte_identical() {
        let app = wrapped_router(
            Router::new().route("/x", get(|| async { Json(json!([1, 2, 3])) })),
        );

        let response = app
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(&body_bytes(response).await[..], b"[1,2,3]");
    }

    #[tokio::test]
    async fn test_middleware_skips_non_200_responses() {
        let app = wrapped_router(Router::new().route(
            "/x",
            get(|| async { (StatusCode::CREATED, Json(json!({ "id": 7 }))) }),
        ));

        let response = app
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let value: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(value, json!({ "id": 7 }));
    }

    #[tokio::test]
    async fn test_middleware_leaves_unparsable_json_bodies_alone() {
        let app = wrapped_router(Router::new().route(
            "/x",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{ nope") }),
        ));

        let response = app
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(&body_bytes(response).await[..], b"{ nope");
    }

    #[tokio::test]
    async fn test_middleware_skips_non_json_responses() {
        let app = wrapped_router(Router::new().route("/x", get(|| async { "plain text" })));

        let response = app
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(&body_bytes(response).await[..], b"plain text");
    }
}
