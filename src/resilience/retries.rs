//! Retry logic.
//!
//! # Responsibilities
//! - Classify a failed attempt as retryable or terminal
//! - Enforce the per-request retry budget
//!
//! # Design Decisions
//! - Only timeouts are retried; any other transport error fails fast
//! - No delay between attempts: each attempt is already bounded by the
//!   per-attempt timeout
//! - The decision is a pure function so every termination path is testable
//!   without a network

use crate::config::RetryConfig;

/// Class of a failed backend attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connect or response-header deadline elapsed.
    Timeout,
    /// DNS, refused connection, reset, protocol error, ...
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Other => "error",
        }
    }
}

/// Why the forwarder stopped trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    NotRetryable,
    BudgetExhausted,
}

/// Next action after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    GiveUp(GiveUpReason),
}

/// Bounded, timeout-only retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Upper bound on backend calls for one request.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decide what follows a failure, given how many retries were already made.
    pub fn decide(&self, retries_done: u32, failure: FailureKind) -> RetryDecision {
        match failure {
            FailureKind::Other => RetryDecision::GiveUp(GiveUpReason::NotRetryable),
            FailureKind::Timeout if retries_done >= self.max_retries => {
                RetryDecision::GiveUp(GiveUpReason::BudgetExhausted)
            }
            FailureKind::Timeout => RetryDecision::Retry,
        }
    }
}
