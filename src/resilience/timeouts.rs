//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with the per-attempt deadline
//! - Recognise timeouts buried in transport error chains
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - io, hyper and Tokio timeout errors all count, wherever they sit in the
//!   chain
//! - Timeout errors are distinct from other errors (they are the only
//!   retryable class)

use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::time::Duration;

/// Deadline elapsed before the wrapped future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no response within {0:?}")]
pub struct Elapsed(pub Duration);

/// Run `future` with a deadline.
pub async fn with_deadline<F: Future>(deadline: Duration, future: F) -> Result<F::Output, Elapsed> {
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| Elapsed(deadline))
}

/// True if any error in the `source()` chain is a timeout.
pub fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::TimedOut {
                return true;
            }
        }
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            if hyper_err.is_timeout() {
                return true;
            }
        }
        if e.is::<Elapsed>() || e.is::<tokio::time::error::Elapsed>() {
            return true;
        }
        current = e.source();
    }
    false
}
