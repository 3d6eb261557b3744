//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the helper.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the S3 helper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HelperConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Storage backend the helper signs requests for.
    pub backend: BackendConfig,

    /// Per-attempt timeout and retry budget.
    pub retries: RetryConfig,

    /// Runtime sizing.
    pub runtime: RuntimeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BackendConfig {
    /// Region the bucket lives in; also the SigV4 signing region.
    pub region: String,

    /// Bucket name.
    pub bucket: String,

    /// Key prefix prepended to every request path (e.g., "/vod").
    pub prefix: Option<String>,

    /// Base URL replacing `http://s3.<region>.amazonaws.com`, for
    /// S3-compatible stores.
    pub endpoint: Option<String>,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Connect and response-header timeout for one attempt, in milliseconds.
    pub timeout_ms: u64,

    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
}

impl RetryConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_retries: 5,
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads; 0 means one per available CPU.
    pub concurrency: usize,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable the diagnostics (Prometheus) endpoint.
    pub metrics_enabled: bool,

    /// Diagnostics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "error".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
