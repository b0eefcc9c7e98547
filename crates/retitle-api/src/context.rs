//! Per-request context and request-id propagation.
//!
//! Every request gets a request id: the caller's `X-Request-Id` header when
//! present, otherwise a freshly minted ULID. The id is stored in request
//! extensions, carried through handler spans, and echoed back on the
//! response so clients can correlate logs with their calls.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request};
use axum::http::header::HeaderName;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use ulid::Ulid;

use retitle_core::observability::api_span;

use crate::metrics::endpoint_label;

/// Header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context derived from headers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request ID for tracing/correlation.
    pub request_id: String,
}

impl RequestContext {
    /// Builds a context from request headers, minting a fresh id when the
    /// caller did not send one.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id =
            request_id_from_headers(headers).unwrap_or_else(|| Ulid::new().to_string());
        Self { request_id }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<Self>() {
            return Ok(existing.clone());
        }
        Ok(Self::from_headers(&parts.headers))
    }
}

fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Request-Id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Middleware that injects a [`RequestContext`], wraps the handler in a span
/// carrying the request id, and echoes the id on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let ctx = RequestContext::from_headers(req.headers());
    let request_id = ctx.request_id.clone();
    let span = api_span(&endpoint_label(&req), &request_id);
    req.extensions_mut().insert(ctx);

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}
