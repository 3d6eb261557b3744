//! Request forwarding to the storage backend.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → method check (GET/HEAD, else 405)
//!     → BackendRequest::build (malformed URL → 403)
//!     → RequestSigner::sign, once (failure → 500)
//!     → Transport::send, retried on timeout only (give up → 500)
//!     → status + filtered headers + streamed body
//! ```
//!
//! # Design Decisions
//! - Backend status is relayed verbatim, including 4xx/5xx
//! - Only 2xx responses to GET carry a body; error bodies are not relayed
//! - Every log line for a request carries the `forward` span fields

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Response, StatusCode};
use tracing::{Instrument, Span};

use crate::backend::{BackendRequest, BackendTarget, RequestSigner, Transport, TransportError};
use crate::config::{BackendConfig, RetryConfig};
use crate::http::relay::{RelayStream, TransferProgress};
use crate::http::request::InboundRequest;
use crate::http::response::{method_not_allowed, status_only, HeaderFilter};
use crate::observability::metrics;
use crate::resilience::{RetryDecision, RetryPolicy};

/// Turns one inbound request into one client response.
pub struct Forwarder {
    target: BackendTarget,
    region: String,
    signer: Arc<dyn RequestSigner>,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    filter: HeaderFilter,
}

impl Forwarder {
    pub fn new(
        backend: &BackendConfig,
        retries: &RetryConfig,
        signer: Arc<dyn RequestSigner>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            target: BackendTarget::from_config(backend),
            region: backend.region.clone(),
            signer,
            transport,
            policy: RetryPolicy::from_config(retries),
            filter: HeaderFilter::default(),
        }
    }

    pub fn target(&self) -> &BackendTarget {
        &self.target
    }

    /// Forward `inbound` and build the client response.
    ///
    /// Never fails: every error path maps to a status code.
    pub async fn forward(&self, inbound: InboundRequest) -> Response<Body> {
        let span = tracing::info_span!(
            "forward",
            object = %inbound.path,
            method = %inbound.method,
            range = %inbound.range_str(),
            request_id = %inbound.request_id,
        );
        self.forward_in(inbound, span.clone()).instrument(span).await
    }

    async fn forward_in(&self, inbound: InboundRequest, span: Span) -> Response<Body> {
        if inbound.method != Method::GET && inbound.method != Method::HEAD {
            tracing::warn!("Method not allowed");
            return method_not_allowed();
        }

        let mut request = match BackendRequest::build(
            &self.target,
            &inbound.method,
            &inbound.path,
            inbound.range.as_ref(),
        ) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(url = %e.url(), error = %e, "Failed to create request");
                return status_only(StatusCode::FORBIDDEN);
            }
        };

        tracing::debug!(
            url = %request.uri(),
            dropped_query = inbound.query.as_deref().unwrap_or(""),
            "Request built"
        );

        if let Err(e) = self.signer.sign(&mut request, &self.region).await {
            tracing::error!(error = %e, "Failed to sign request");
            return status_only(StatusCode::INTERNAL_SERVER_ERROR);
        }
        tracing::debug!(region = %self.region, "Request signed");

        match self.send_with_retries(&request).await {
            Ok(response) => self.relay(&inbound.method, response, span),
            Err(_) => status_only(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Send the signed request until it gets a response or the policy gives up.
    async fn send_with_retries(
        &self,
        request: &BackendRequest,
    ) -> Result<Response<Body>, TransportError> {
        let mut retries_done = 0;
        loop {
            let attempt = retries_done + 1;
            tracing::debug!(attempt, "Calling backend");
            match self.transport.send(request.to_http()).await {
                Ok(response) => {
                    metrics::record_attempt("success");
                    tracing::debug!(
                        attempt,
                        status = response.status().as_u16(),
                        "Begin data transfer"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    let kind = e.kind();
                    metrics::record_attempt(kind.as_str());
                    match self.policy.decide(retries_done, kind) {
                        RetryDecision::Retry => {
                            retries_done += 1;
                            tracing::warn!(
                                retry = retries_done,
                                max_retries = self.policy.max_retries(),
                                error = %e,
                                "Backend timed out, retrying"
                            );
                        }
                        RetryDecision::GiveUp(reason) => {
                            tracing::error!(
                                attempts = attempt,
                                reason = ?reason,
                                error = %e,
                                "Failed to receive response"
                            );
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    fn relay(&self, method: &Method, response: Response<Body>, span: Span) -> Response<Body> {
        let (parts, body) = response.into_parts();
        let status = parts.status;
        let is_head = *method == Method::HEAD;

        let mut headers = HeaderMap::new();
        self.filter.copy_allowed(&parts.headers, &mut headers);

        let mut out = if status.is_success() && !is_head {
            let progress = TransferProgress::new();
            let mut out = Response::new(RelayStream::into_body(body, progress.clone(), span));
            out.extensions_mut().insert(progress);
            out
        } else {
            if !status.is_success() {
                tracing::warn!(status = status.as_u16(), "Backend returned non-success status");
                if !is_head {
                    // The body is not relayed, so its framing headers would lie.
                    headers.remove(header::CONTENT_LENGTH);
                    headers.remove(header::CONTENT_RANGE);
                }
            }
            Response::new(Body::empty())
        };

        *out.status_mut() = status;
        *out.headers_mut() = headers;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SigningError;
    use crate::http::relay::TransferState;
    use async_trait::async_trait;
    use axum::http::{HeaderValue, Request, Uri};
    use std::collections::VecDeque;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    type Scripted = Result<Response<Body>, TransportError>;

    /// Replays scripted outcomes and records what it was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Scripted>>,
        seen: Mutex<Vec<(Method, Uri, HeaderMap)>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((
                request.method().clone(),
                request.uri().clone(),
                request.headers().clone(),
            ));
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::TimedOut(Duration::from_millis(1))))
        }
    }

    struct MarkingSigner;

    #[async_trait]
    impl RequestSigner for MarkingSigner {
        async fn sign(&self, request: &mut BackendRequest, region: &str) -> Result<(), SigningError> {
            let value = HeaderValue::from_str(&format!("test {region}")).unwrap();
            request.headers_mut().insert(header::AUTHORIZATION, value);
            Ok(())
        }
    }

    struct FailingSigner;

    #[async_trait]
    impl RequestSigner for FailingSigner {
        async fn sign(&self, _request: &mut BackendRequest, _region: &str) -> Result<(), SigningError> {
            Err(SigningError::Sign("no key".into()))
        }
    }

    fn backend_config(bucket: &str) -> BackendConfig {
        BackendConfig {
            region: "us-east-1".into(),
            bucket: bucket.into(),
            prefix: Some("vod".into()),
            endpoint: Some("http://127.0.0.1:9000".into()),
        }
    }

    fn forwarder_with(
        bucket: &str,
        max_retries: u32,
        signer: Arc<dyn RequestSigner>,
        transport: Arc<ScriptedTransport>,
    ) -> Forwarder {
        let retries = RetryConfig {
            max_retries,
            ..RetryConfig::default()
        };
        Forwarder::new(&backend_config(bucket), &retries, signer, transport)
    }

    fn forwarder(max_retries: u32, transport: Arc<ScriptedTransport>) -> Forwarder {
        forwarder_with("media", max_retries, Arc::new(MarkingSigner), transport)
    }

    fn inbound(method: Method, path: &str, range: Option<&'static str>) -> InboundRequest {
        InboundRequest {
            method,
            path: path.into(),
            query: None,
            range: range.map(HeaderValue::from_static),
            request_id: "test".into(),
        }
    }

    fn ok_response(body: &'static str) -> Scripted {
        Ok(Response::builder()
            .status(200)
            .header("content-length", body.len().to_string())
            .header("content-type", "video/mp4")
            .header("etag", "\"v1\"")
            .header("x-amz-request-id", "ABC")
            .header("server", "AmazonS3")
            .body(Body::from(body))
            .unwrap())
    }

    fn timed_out() -> Scripted {
        Err(TransportError::TimedOut(Duration::from_millis(5)))
    }

    fn refused() -> Scripted {
        Err(TransportError::Io(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "refused",
        )))
    }

    async fn body_of(response: Response<Body>) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn rejects_other_methods_without_backend_call() {
        let transport = ScriptedTransport::new(vec![]);
        let forwarder = forwarder(3, transport.clone());

        for method in [Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS] {
            let response = forwarder.forward(inbound(method, "/a", None)).await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
        }
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn relays_body_and_allowed_headers() {
        let transport = ScriptedTransport::new(vec![ok_response("hello")]);
        let forwarder = forwarder(3, transport.clone());

        let response = forwarder.forward(inbound(Method::GET, "/show/ep1.mp4", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "5");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(response.headers()[header::ETAG], "\"v1\"");
        assert!(response.headers().get("x-amz-request-id").is_none());
        assert!(response.headers().get(header::SERVER).is_none());
        assert_eq!(body_of(response).await, b"hello");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn backend_request_is_signed_and_targeted() {
        let transport = ScriptedTransport::new(vec![ok_response("x")]);
        let forwarder = forwarder(0, transport.clone());

        forwarder
            .forward(inbound(Method::GET, "/show/ep1.mp4", Some("bytes=0-9")))
            .await;

        let seen = transport.seen.lock().unwrap();
        let (method, uri, headers) = &seen[0];
        assert_eq!(*method, Method::GET);
        assert_eq!(uri.to_string(), "http://127.0.0.1:9000/media/vod/show/ep1.mp4");
        assert_eq!(headers[header::HOST], "127.0.0.1:9000");
        assert_eq!(headers[header::RANGE], "bytes=0-9");
        assert_eq!(headers[header::AUTHORIZATION], "test us-east-1");
    }

    #[tokio::test]
    async fn retries_timeouts_then_succeeds() {
        for k in 0..=3 {
            let mut outcomes: Vec<Scripted> = (0..k).map(|_| timed_out()).collect();
            outcomes.push(ok_response("ok"));
            let transport = ScriptedTransport::new(outcomes);
            let forwarder = forwarder(3, transport.clone());

            let response = forwarder.forward(inbound(Method::GET, "/a", None)).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_of(response).await, b"ok");
            assert_eq!(transport.calls(), k + 1);
        }
    }

    #[tokio::test]
    async fn exhausted_budget_is_500() {
        let transport = ScriptedTransport::new(vec![]);
        let forwarder = forwarder(5, transport.clone());

        let response = forwarder.forward(inbound(Method::GET, "/a", None)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.calls(), 6);
    }

    #[tokio::test]
    async fn non_timeout_error_fails_fast() {
        let transport = ScriptedTransport::new(vec![refused(), ok_response("unused")]);
        let forwarder = forwarder(5, transport.clone());

        let response = forwarder.forward(inbound(Method::GET, "/a", None)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_url_is_403_without_backend_call() {
        let transport = ScriptedTransport::new(vec![ok_response("unused")]);
        let forwarder = forwarder_with("bad bucket", 3, Arc::new(MarkingSigner), transport.clone());

        let response = forwarder.forward(inbound(Method::GET, "/a", None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn signing_failure_is_500_without_backend_call() {
        let transport = ScriptedTransport::new(vec![ok_response("unused")]);
        let forwarder = forwarder_with("media", 3, Arc::new(FailingSigner), transport.clone());

        let response = forwarder.forward(inbound(Method::GET, "/a", None)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn head_keeps_headers_and_has_no_body() {
        let transport = ScriptedTransport::new(vec![Ok(Response::builder()
            .status(200)
            .header("content-length", "1048576")
            .header("last-modified", "Mon, 01 Jan 2024 00:00:00 GMT")
            .body(Body::empty())
            .unwrap())]);
        let forwarder = forwarder(0, transport.clone());

        let response = forwarder.forward(inbound(Method::HEAD, "/big.mp4", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "1048576");
        assert!(response.extensions().get::<TransferProgress>().is_none());
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_relayed_without_body() {
        let transport = ScriptedTransport::new(vec![Ok(Response::builder()
            .status(404)
            .header("content-type", "application/xml")
            .header("content-length", "120")
            .body(Body::from("<Error><Code>NoSuchKey</Code></Error>"))
            .unwrap())]);
        let forwarder = forwarder(3, transport.clone());

        let response = forwarder.forward(inbound(Method::GET, "/missing", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
        assert!(body_of(response).await.is_empty());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn partial_content_keeps_range_headers() {
        let transport = ScriptedTransport::new(vec![Ok(Response::builder()
            .status(206)
            .header("content-length", "4")
            .header("content-range", "bytes 0-3/10")
            .body(Body::from("0123"))
            .unwrap())]);
        let forwarder = forwarder(3, transport.clone());

        let response = forwarder
            .forward(inbound(Method::GET, "/a", Some("bytes=0-3")))
            .await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-3/10");
        assert_eq!(body_of(response).await, b"0123");
    }

    #[tokio::test]
    async fn progress_reports_truncated_body() {
        let chunks: Vec<Result<&'static [u8], io::Error>> = vec![
            Ok(b"01234"),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "reset")),
        ];
        let body = Body::from_stream(futures_util::stream::iter(
            chunks
                .into_iter()
                .map(|chunk| chunk.map(axum::body::Bytes::from_static)),
        ));
        let transport = ScriptedTransport::new(vec![Ok(Response::builder()
            .status(200)
            .header("content-length", "10")
            .body(body)
            .unwrap())]);
        let forwarder = forwarder(3, transport.clone());

        let response = forwarder.forward(inbound(Method::GET, "/a", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let progress = response.extensions().get::<TransferProgress>().unwrap().clone();

        assert!(axum::body::to_bytes(response.into_body(), usize::MAX).await.is_err());
        assert_eq!(progress.bytes(), 5);
        assert_eq!(progress.state(), TransferState::Failed);
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn every_decision_point_is_logged() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = ScriptedTransport::new(vec![timed_out(), ok_response("ok")]);
        let forwarder = forwarder(3, transport.clone());
        let response = forwarder.forward(inbound(Method::GET, "/show/ep1.mp4", None)).await;
        assert_eq!(body_of(response).await, b"ok");

        let text = logs.text();
        let built = text.find("Request built").expect("build not logged");
        let signed = text.find("Request signed").expect("signing not logged");
        let first = text.find("attempt=1").expect("first attempt not logged");
        let transfer = text.find("Begin data transfer").expect("transfer not logged");
        assert!(built < signed && signed < first && first < transfer);
        assert!(text.contains("Backend timed out, retrying"));
        assert!(text.contains("attempt=2 status=200"));
        assert!(text.contains("Success copying body"));
        assert!(text.contains("object=/show/ep1.mp4"));
    }
}
