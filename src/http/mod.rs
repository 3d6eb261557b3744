//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, Server header)
//!     → request.rs (InboundRequest: method, path, Range)
//!     → forwarder.rs (build, sign, send with retries)
//!     → response.rs (status + allow-listed headers)
//!     → relay.rs (body streamed to client)
//! ```

pub mod forwarder;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;

pub use forwarder::Forwarder;
pub use relay::{TransferProgress, TransferState};
pub use request::{InboundRequest, X_REQUEST_ID};
pub use response::HeaderFilter;
pub use server::HttpServer;
