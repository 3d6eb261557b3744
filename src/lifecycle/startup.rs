//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the Tokio runtime sized from configuration
//! - Resolve AWS credentials and assemble the forwarder
//! - Start the diagnostics endpoint when enabled
//! - Bind the listener and serve until a stop signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Signal handlers first, listener last (traffic only when ready)
//! - On a stop signal the listener closes and in-flight transfers drain

use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;

use crate::backend::{HyperTransport, SigV4Signer};
use crate::config::{HelperConfig, RuntimeConfig};
use crate::http::{Forwarder, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::StopSignals;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("invalid address {addr}: {source}")]
    Address {
        addr: String,
        #[source]
        source: AddrParseError,
    },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("no AWS credentials provider available")]
    NoCredentials,
    #[error("failed to start metrics endpoint: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] io::Error),
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Worker threads for a configured concurrency; 0 means one per CPU.
pub fn worker_threads(concurrency: usize) -> usize {
    if concurrency > 0 {
        return concurrency;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn build_runtime(config: &RuntimeConfig) -> Result<Runtime, StartupError> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads(config.concurrency))
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)
}

pub async fn bind_listener(addr: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Signer backed by the default AWS credentials chain (environment, shared
/// profile, container and instance metadata).
pub async fn resolve_signer(region: &str) -> Result<SigV4Signer, StartupError> {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await;
    let provider = sdk_config
        .credentials_provider()
        .ok_or(StartupError::NoCredentials)?;
    Ok(SigV4Signer::new(provider))
}

fn parse_addr(addr: &str) -> Result<SocketAddr, StartupError> {
    addr.parse().map_err(|source| StartupError::Address {
        addr: addr.to_string(),
        source,
    })
}

/// Run the helper until a stop signal has been handled and all in-flight
/// requests have finished.
pub async fn run(config: HelperConfig) -> Result<(), StartupError> {
    let mut signals = StopSignals::install().map_err(StartupError::Signals)?;

    if config.observability.metrics_enabled {
        metrics::init_metrics(parse_addr(&config.observability.metrics_address)?)?;
    }

    let signer = resolve_signer(&config.backend.region).await?;
    let transport = HyperTransport::new(config.retries.attempt_timeout());
    let forwarder = Arc::new(Forwarder::new(
        &config.backend,
        &config.retries,
        Arc::new(signer),
        Arc::new(transport),
    ));

    tracing::info!(
        endpoint = %forwarder.target().base_url(),
        bucket = %config.backend.bucket,
        region = %config.backend.region,
        timeout_ms = config.retries.timeout_ms,
        max_retries = config.retries.max_retries,
        "Configuration loaded"
    );

    let listener = bind_listener(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let stopped = shutdown.wait();
    tokio::spawn(async move {
        let name = signals.recv().await;
        tracing::info!(signal = name, "Shutdown signal received, draining");
        shutdown.trigger();
    });

    HttpServer::new(forwarder)
        .run(listener, stopped)
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}
