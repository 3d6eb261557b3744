//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGINT, SIGHUP, SIGTERM)
//! - Report which one arrived so shutdown can be logged
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - All three signals mean the same thing: stop accepting and drain
//! - Handlers are installed before the listener binds, so an early signal
//!   is not lost

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};

/// Installed stop-signal handlers.
pub struct StopSignals {
    interrupt: Signal,
    hangup: Signal,
    terminate: Signal,
}

impl StopSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            hangup: signal(SignalKind::hangup())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next stop signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}
