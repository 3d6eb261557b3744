//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Runtime → Signals → Metrics → Credentials → Forwarder → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain transfers → Exit
//!
//! Signals (signals.rs):
//!     SIGINT/SIGHUP/SIGTERM → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::StartupError;
