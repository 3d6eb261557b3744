//! Backend transport: one HTTP attempt with a deadline.
//!
//! # Responsibilities
//! - Execute a single attempt against the storage backend
//! - Bound connect and time-to-response-headers by the attempt timeout
//! - Report failures with a timeout/other classification
//!
//! # Design Decisions
//! - No idle pooling: every attempt dials a fresh connection, so a retry
//!   never reuses a connection that just failed
//! - The body stream is not under the deadline; large objects take as long
//!   as they take

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::resilience::timeouts::{is_timeout, with_deadline, Elapsed};
use crate::resilience::FailureKind;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no response headers within {0:?}")]
    TimedOut(Duration),
    #[error("backend request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),
    #[error("backend I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        let timed_out = match self {
            TransportError::TimedOut(_) => true,
            TransportError::Client(e) => is_timeout(e),
            TransportError::Io(e) => is_timeout(e),
        };
        if timed_out {
            FailureKind::Timeout
        } else {
            FailureKind::Other
        }
    }
}

impl From<Elapsed> for TransportError {
    fn from(Elapsed(deadline): Elapsed) -> Self {
        TransportError::TimedOut(deadline)
    }
}

/// Executes one backend attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, TransportError>;
}

/// Plain-HTTP transport on hyper's client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    attempt_timeout: Duration,
}

impl HyperTransport {
    pub fn new(attempt_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(attempt_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(attempt_timeout)
            .build(connector);

        Self {
            client,
            attempt_timeout,
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let response = with_deadline(self.attempt_timeout, self.client.request(request)).await??;
        Ok(response.map(Body::new))
    }
}
