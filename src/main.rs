//! S3 helper
//!
//! Lets a media player stream objects from a private S3 bucket over plain
//! HTTP. Each GET/HEAD is signed with SigV4 and forwarded to the bucket; the
//! response is streamed back with a small set of headers.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request       ┌──────────────────────────────────────────────┐
//!     ─────────────────────┼─▶ http::server ──▶ http::forwarder           │
//!                          │                      │                       │
//!                          │                      ▼                       │
//!                          │   backend::request ─▶ backend::signer        │
//!                          │                      │                       │
//!                          │                      ▼                       │
//!                          │   resilience::retries ◀─▶ backend::transport─┼──▶ S3
//!                          │                      │                       │
//!     Client Response      │                      ▼                       │
//!     ◀────────────────────┼── http::relay ◀── http::response             │
//!                          │                                              │
//!                          │   config · observability · lifecycle         │
//!                          └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use s3_helper::config::{load_config, validation::validate_config, ConfigError};
use s3_helper::lifecycle::startup;
use s3_helper::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "s3-helper", version, about = "Signing HTTP proxy for private S3 buckets")]
struct Cli {
    /// TOML configuration file; S3_* environment variables override it.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Serve Prometheus metrics on the configured diagnostics address.
    #[arg(long)]
    metrics: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.metrics {
        config.observability.metrics_enabled = true;
        validate_config(&config)
            .map_err(ConfigError::Validation)
            .context("failed to load configuration")?;
    }

    let _log_guard = logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "s3-helper starting");

    let runtime = startup::build_runtime(&config.runtime)?;
    let result = runtime.block_on(startup::run(config));
    if let Err(e) = &result {
        tracing::error!(error = %e, "Fatal error");
    }
    Ok(result?)
}
