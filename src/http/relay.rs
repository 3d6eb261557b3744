//! Body relay from backend to client.
//!
//! # Responsibilities
//! - Stream the backend body to the client chunk by chunk
//! - Count relayed bytes and expose them through [`TransferProgress`]
//! - Log how the transfer ended (completed, backend failed, client aborted)
//!
//! # Design Decisions
//! - Nothing is buffered beyond the chunk in flight
//! - Status and headers are already sent when the body starts, so a failed
//!   copy can only end the stream early; it is logged, never turned into a
//!   different status
//! - Dropping an unfinished stream means the client went away

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, BodyDataStream, Bytes};
use futures_util::Stream;
use tracing::Span;

use crate::observability::metrics;

/// How a body transfer ended.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    InProgress = 0,
    Completed = 1,
    Failed = 2,
    Aborted = 3,
}

impl From<u8> for TransferState {
    fn from(val: u8) -> Self {
        match val {
            1 => TransferState::Completed,
            2 => TransferState::Failed,
            3 => TransferState::Aborted,
            _ => TransferState::InProgress,
        }
    }
}

#[derive(Debug, Default)]
struct ProgressInner {
    bytes: AtomicU64,
    state: AtomicU8,
}

/// Shared view of a relay in progress.
///
/// Attached to the response extensions; clones observe the same transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferProgress {
    inner: Arc<ProgressInner>,
}

impl TransferProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> u64 {
        self.inner.bytes.load(Ordering::Acquire)
    }

    pub fn state(&self) -> TransferState {
        self.inner.state.load(Ordering::Acquire).into()
    }

    fn add(&self, n: u64) {
        self.inner.bytes.fetch_add(n, Ordering::AcqRel);
    }

    fn finish(&self, state: TransferState) {
        self.inner.state.store(state as u8, Ordering::Release);
    }
}

/// Pass-through stream over a backend body.
pub struct RelayStream {
    inner: BodyDataStream,
    progress: TransferProgress,
    span: Span,
    finished: bool,
}

impl RelayStream {
    pub fn new(body: Body, progress: TransferProgress, span: Span) -> Self {
        Self {
            inner: body.into_data_stream(),
            progress,
            span,
            finished: false,
        }
    }

    /// Client-facing body that relays `body` and reports into `progress`.
    pub fn into_body(body: Body, progress: TransferProgress, span: Span) -> Body {
        Body::from_stream(Self::new(body, progress, span))
    }
}

impl Stream for RelayStream {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        let polled = Pin::new(&mut this.inner).poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                this.progress.add(chunk.len() as u64);
                metrics::record_relay_bytes(chunk.len() as u64);
            }
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                this.progress.finish(TransferState::Failed);
                metrics::record_relay_failure("backend");
                let recv = this.progress.bytes();
                this.span.in_scope(|| {
                    tracing::error!(recv, error = %e, "Failed to copy body");
                });
            }
            Poll::Ready(None) => {
                this.finished = true;
                this.progress.finish(TransferState::Completed);
                let recv = this.progress.bytes();
                this.span.in_scope(|| {
                    tracing::debug!(recv, "Success copying body");
                });
            }
            Poll::Pending => {}
        }
        polled
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.progress.finish(TransferState::Aborted);
        metrics::record_relay_failure("client");
        let recv = self.progress.bytes();
        self.span.in_scope(|| {
            tracing::warn!(recv, "Client went away before body was copied");
        });
    }
}
