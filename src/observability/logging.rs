//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config, with `RUST_LOG` taking precedence
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, text format for development
//! - Lines are handed to a background writer thread; a slow stdout never
//!   stalls a request

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Default filter directive for a configured level: the helper logs at
/// `level`, HTTP middleware follows unless it would be noisier than `info`.
pub fn default_directive(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    let http_level = match level.as_str() {
        "trace" | "debug" => level.as_str(),
        _ => "warn",
    };
    format!("s3_helper={level},tower_http={http_level}")
}

/// Install the global subscriber.
///
/// The returned guard flushes buffered lines on drop and must be held until
/// the process exits.
pub fn init_logging(config: &ObservabilityConfig) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(&config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init(),
    }

    guard
}
