//! S3 helper library: a signing reverse proxy for private S3 objects.

pub mod backend;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::HelperConfig;
pub use http::{Forwarder, HttpServer};
pub use lifecycle::Shutdown;
