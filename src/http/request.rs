//! Request handling.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Extract the forwarding-relevant parts of an inbound request
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Only method, path, query and `Range` are kept; the inbound body and
//!   other headers are never forwarded

use axum::http::{header, request::Parts, HeaderName, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Assigns a UUID v4 to requests that arrive without `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// The parts of a client request the forwarder acts on.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub range: Option<HeaderValue>,
    pub request_id: String,
}

impl InboundRequest {
    pub fn from_parts(parts: &Parts) -> Self {
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            range: parts.headers.get(header::RANGE).cloned(),
            request_id,
        }
    }

    /// `Range` as text for logging; empty when absent or not visible ASCII.
    pub fn range_str(&self) -> &str {
        self.range
            .as_ref()
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}
