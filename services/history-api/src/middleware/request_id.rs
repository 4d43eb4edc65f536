// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Request id middleware.
//!
//! Every request gets an id, either the caller's `x-request-id` header or a
//! fresh UUID. The id is stored in the request extensions, recorded on the
//! request's trace span and echoed on the response so CI logs can be
//! correlated with service logs.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::{debug, info_span, Span};
use uuid::Uuid;

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request id stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Attach a [`RequestId`] to the request and echo it on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    debug!(request_id = %id, method = %req.method(), uri = %req.uri(), "Request received");
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

/// Trace span for a request, carrying its [`RequestId`].
///
/// Used with `TraceLayer::make_span_with`; the layer must sit inside
/// [`request_id_middleware`] so the id is already present.
pub fn make_span(req: &Request) -> Span {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.as_str())
        .unwrap_or("-");
    info_span!(
        "request",
        method = %req.method(),
        uri = %req.uri(),
        request_id = %request_id,
    )
}
