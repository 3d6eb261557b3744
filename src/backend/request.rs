//! Backend request construction.
//!
//! # Responsibilities
//! - Compose the backend URL from the target and the inbound path, with the
//!   key in canonical S3 escaping
//! - Set `Host` and forward `Range` verbatim
//! - Hand out one fresh `Request` per attempt from the signed template
//!
//! # Design Decisions
//! - The request is built and signed once; attempts clone the template
//! - The inbound query string is not forwarded
//! - GET/HEAD carry no body, so the template has none

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Uri};

use crate::backend::target::BackendTarget;

/// Backend URL could not be formed.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid backend URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },
    #[error("backend URL has no host: {0}")]
    MissingHost(String),
}

impl BuildError {
    pub fn url(&self) -> &str {
        match self {
            BuildError::InvalidUrl { url, .. } => url,
            BuildError::MissingHost(url) => url,
        }
    }
}

/// A signed (or about to be signed) request for the storage backend.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl BackendRequest {
    pub fn build(
        target: &BackendTarget,
        method: &Method,
        path: &str,
        range: Option<&HeaderValue>,
    ) -> Result<Self, BuildError> {
        let url = target.object_url(path);
        let uri: Uri = url
            .parse()
            .map_err(|source| BuildError::InvalidUrl { url: url.clone(), source })?;

        let host = uri
            .authority()
            .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
            .ok_or_else(|| BuildError::MissingHost(url.clone()))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, host);
        if let Some(range) = range {
            headers.insert(header::RANGE, range.clone());
        }

        Ok(Self {
            method: method.clone(),
            uri,
            headers,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// A fresh request for one attempt.
    pub fn to_http(&self) -> Request<Body> {
        let mut request = Request::new(Body::empty());
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.headers_mut() = self.headers.clone();
        request
    }
}
