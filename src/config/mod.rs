//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (S3_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → HelperConfig (validated, immutable)
//!     → handed by value to the server and forwarder at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BackendConfig;
pub use schema::HelperConfig;
pub use schema::ListenerConfig;
pub use schema::{LogFormat, ObservabilityConfig, RetryConfig, RuntimeConfig};
