//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarder decision points:
//!     → logging.rs (structured log events inside the `forward` span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID, object path, method and range on every forwarding record
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
