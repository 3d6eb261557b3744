//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check required backend settings are present
//! - Validate value ranges and address formats
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HelperConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::Uri;

use crate::config::schema::HelperConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("backend.region is required (S3_REGION)")]
    MissingRegion,
    #[error("backend.bucket is required (S3_BUCKET)")]
    MissingBucket,
    #[error("retries.timeout_ms must be greater than zero")]
    ZeroTimeout,
    #[error("{field} is not a socket address: {value}")]
    BadAddress { field: &'static str, value: String },
    #[error("backend.endpoint must be an absolute http:// URL: {0}")]
    BadEndpoint(String),
    #[error("observability.log_level is not a known level: {0}")]
    BadLogLevel(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &HelperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backend.region.trim().is_empty() {
        errors.push(ValidationError::MissingRegion);
    }
    if config.backend.bucket.trim().is_empty() {
        errors.push(ValidationError::MissingBucket);
    }
    if config.retries.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if let Some(endpoint) = &config.backend.endpoint {
        let valid = endpoint
            .parse::<Uri>()
            .map(|uri| uri.scheme_str() == Some("http") && uri.authority().is_some())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::BadEndpoint(endpoint.clone()));
        }
    }
    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::BadLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
