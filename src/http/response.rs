//! Response handling and transformation.
//!
//! # Responsibilities
//! - Decide which backend response headers reach the client
//! - Build the bodiless status responses the forwarder answers with
//!
//! # Design Decisions
//! - Allow-list, not deny-list: only headers the player needs pass through
//! - A header with an empty value is treated as absent

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

pub const SERVER_NAME: &str = "VOD S3 Helper";

/// Backend response headers forwarded to the client.
pub static FORWARDED_HEADERS: [HeaderName; 6] = [
    header::DATE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::CONTENT_TYPE,
    header::LAST_MODIFIED,
    header::ETAG,
];

/// Stateless forward/drop policy over a fixed allow-list.
#[derive(Debug, Clone, Copy)]
pub struct HeaderFilter {
    allowed: &'static [HeaderName],
}

impl HeaderFilter {
    pub const fn new(allowed: &'static [HeaderName]) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, name: &HeaderName, value: &HeaderValue) -> bool {
        !value.is_empty() && self.allowed.contains(name)
    }

    /// Copy every allowed, non-empty header (first value only) from `from`.
    pub fn copy_allowed(&self, from: &HeaderMap, to: &mut HeaderMap) {
        for name in self.allowed {
            if let Some(value) = from.get(name) {
                if self.allows(name, value) {
                    to.insert(name.clone(), value.clone());
                }
            }
        }
    }
}

impl Default for HeaderFilter {
    fn default() -> Self {
        Self::new(&FORWARDED_HEADERS)
    }
}

/// Response with only a status line.
pub fn status_only(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

pub fn method_not_allowed() -> Response<Body> {
    let mut response = status_only(StatusCode::METHOD_NOT_ALLOWED);
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
    response
}
