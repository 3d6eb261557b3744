//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::HelperConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: TOML file (if given), then environment overrides,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<HelperConfig, ConfigError> {
    let config = match path {
        Some(path) => parse_file(path)?,
        None => HelperConfig::default(),
    };
    let config = apply_env(config, |var| std::env::var(var).ok())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<HelperConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay `S3_*` environment variables onto `config`.
///
/// Empty variables are ignored so that an unset-but-exported variable does not
/// clobber a value from the file.
pub fn apply_env<F>(mut config: HelperConfig, lookup: F) -> Result<HelperConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("S3_LISTEN") {
        config.listener.bind_address = v;
    }
    if let Some(v) = get("S3_REGION") {
        config.backend.region = v;
    }
    if let Some(v) = get("S3_BUCKET") {
        config.backend.bucket = v;
    }
    if let Some(v) = get("S3_PREFIX") {
        config.backend.prefix = Some(v);
    }
    if let Some(v) = get("S3_ENDPOINT") {
        config.backend.endpoint = Some(v);
    }
    if let Some(v) = get("S3_TIMEOUT") {
        config.retries.timeout_ms = parse_duration_ms(&v).map_err(|reason| ConfigError::Env {
            var: "S3_TIMEOUT",
            value: v.clone(),
            reason,
        })?;
    }
    if let Some(v) = get("S3_RETRIES") {
        config.retries.max_retries = v.trim().parse().map_err(|e| ConfigError::Env {
            var: "S3_RETRIES",
            value: v.clone(),
            reason: format!("{e}"),
        })?;
    }
    if let Some(v) = get("S3_CONCURRENCY") {
        config.runtime.concurrency = v.trim().parse().map_err(|e| ConfigError::Env {
            var: "S3_CONCURRENCY",
            value: v.clone(),
            reason: format!("{e}"),
        })?;
    }
    if let Some(v) = get("S3_LOGLEVEL") {
        config.observability.log_level = v;
    }

    Ok(config)
}

/// Parse `"5s"`, `"250ms"`, `"2m"` or bare milliseconds into milliseconds.
pub fn parse_duration_ms(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| "expected a number followed by ms, s or m".to_string())?;
    let factor = match unit {
        "" | "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        other => return Err(format!("unknown unit {other:?}")),
    };

    value
        .checked_mul(factor)
        .ok_or_else(|| "duration overflows".to_string())
}
