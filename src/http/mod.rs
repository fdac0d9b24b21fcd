//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID set and propagated)
//!     → [entry balancer picks a child] (load_balancer)
//!     → forward.rs (rewrite URI, send to upstream)
//!     → Send response to client
//! ```

pub mod forward;
pub mod request;
pub mod server;

pub use forward::{Upstream, UpstreamError};
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
