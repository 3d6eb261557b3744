//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce per-attempt connect/response deadline)
//!     → On failure: timeouts.rs classifies timeout vs other
//!     → retries.rs decides: retry immediately or give up
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend attempt has a deadline
//! - Only GET/HEAD ever reach the backend, so every attempt is idempotent
//! - The signed request is reused across attempts

pub mod retries;
pub mod timeouts;

pub use retries::{FailureKind, GiveUpReason, RetryDecision, RetryPolicy};
