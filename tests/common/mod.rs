//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aws_credential_types::Credentials;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use s3_helper::backend::{HyperTransport, SigV4Signer};
use s3_helper::config::{BackendConfig, RetryConfig};
use s3_helper::http::{Forwarder, HttpServer};

pub const ACCESS_KEY: &str = "AKIDTEST";

/// What the mock backend does with one request.
pub enum Reply {
    /// Full response; `Content-Length` is added from `body`.
    Respond {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
    },
    /// Read the request, never answer.
    Hang,
    /// Read the request, close the connection.
    Drop,
    /// Announce `declared` bytes, send `body`, close.
    Truncate { declared: usize, body: Vec<u8> },
    /// Send headers and the first `split` bytes, pause, then the rest.
    Stalled {
        body: Vec<u8>,
        split: usize,
        pause: Duration,
    },
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Reply::Respond {
            status: 200,
            headers: vec![("Content-Type", "video/mp4".to_string())],
            body: body.into(),
        }
    }

    pub fn status(status: u16, headers: Vec<(&'static str, String)>, body: impl Into<Vec<u8>>) -> Self {
        Reply::Respond {
            status,
            headers,
            body: body.into(),
        }
    }
}

/// Raw-TCP S3 stand-in driven by a script of `(call index, request head)`.
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub async fn start<F>(script: F) -> Self
    where
        F: Fn(usize, &str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(script);

        let (task_calls, task_requests) = (calls.clone(), requests.clone());
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let script = script.clone();
                let calls = task_calls.clone();
                let requests = task_requests.clone();
                tokio::spawn(async move {
                    let mut socket = socket;
                    let head = read_head(&mut socket).await;
                    let index = calls.fetch_add(1, Ordering::SeqCst);
                    requests.lock().unwrap().push(head.clone());
                    let reply = script(index, &head);
                    serve_reply(socket, head.starts_with("HEAD "), reply).await;
                });
            }
        });

        Self {
            addr,
            calls,
            requests,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Raw request heads, lowercased.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|head| head.to_ascii_lowercase())
            .collect()
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        206 => "Partial Content",
        304 => "Not Modified",
        403 => "Forbidden",
        404 => "Not Found",
        416 => "Range Not Satisfiable",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

async fn serve_reply(mut socket: TcpStream, is_head: bool, reply: Reply) {
    match reply {
        Reply::Respond {
            status,
            headers,
            body,
        } => {
            let mut out = format!("HTTP/1.1 {} {}\r\n", status, reason(status));
            for (name, value) in headers {
                out.push_str(&format!("{name}: {value}\r\n"));
            }
            out.push_str(&format!(
                "Content-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            ));
            let mut bytes = out.into_bytes();
            if !is_head {
                bytes.extend_from_slice(&body);
            }
            let _ = socket.write_all(&bytes).await;
            let _ = socket.shutdown().await;
        }
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        Reply::Drop => {
            let _ = socket.shutdown().await;
        }
        Reply::Truncate { declared, body } => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n"
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
        Reply::Stalled { body, split, pause } => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body[..split]).await;
            let _ = socket.flush().await;
            tokio::time::sleep(pause).await;
            let _ = socket.write_all(&body[split..]).await;
            let _ = socket.shutdown().await;
        }
    }
}

pub fn backend_config(endpoint: String, bucket: &str, prefix: Option<&str>) -> BackendConfig {
    BackendConfig {
        region: "us-east-1".into(),
        bucket: bucket.into(),
        prefix: prefix.map(str::to_string),
        endpoint: Some(endpoint),
    }
}

pub fn retry_config(timeout_ms: u64, max_retries: u32) -> RetryConfig {
    RetryConfig {
        timeout_ms,
        max_retries,
    }
}

/// Start the helper on an ephemeral port; it stops when `shutdown` resolves.
pub async fn spawn_helper<F>(
    backend: BackendConfig,
    retries: RetryConfig,
    shutdown: F,
) -> (SocketAddr, JoinHandle<std::io::Result<()>>)
where
    F: Future<Output = ()> + Send + 'static,
{
    let signer = SigV4Signer::from_static(Credentials::new(ACCESS_KEY, "secret", None, None, "test"));
    let transport = HyperTransport::new(retries.attempt_timeout());
    let forwarder = Arc::new(Forwarder::new(
        &backend,
        &retries,
        Arc::new(signer),
        Arc::new(transport),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(HttpServer::new(forwarder).run(listener, shutdown));
    (addr, handle)
}

/// Start the helper for the lifetime of the test.
pub async fn start_helper(backend: BackendConfig, retries: RetryConfig) -> SocketAddr {
    spawn_helper(backend, retries, std::future::pending()).await.0
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
