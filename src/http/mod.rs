//! HTTP binding of the admin operations.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, graceful shutdown)
//!     → request.rs (request id set / propagated)
//!     → admin::handlers (extract form / query, pick language)
//!     → admin::service
//! ```

pub mod request;
pub mod server;

pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::AdminServer;
