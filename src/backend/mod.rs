//! Storage backend subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path + Range
//!     → target.rs (endpoint + bucket + prefix)
//!     → request.rs (BackendRequest: URL, Host, Range)
//!     → signer.rs (SigV4 headers, once per request)
//!     → transport.rs (one attempt per call, deadline-bounded)
//! ```

pub mod request;
pub mod signer;
pub mod target;
pub mod transport;

pub use request::{BackendRequest, BuildError};
pub use signer::{RequestSigner, SigV4Signer, SigningError};
pub use target::BackendTarget;
pub use transport::{HyperTransport, Transport, TransportError};
