//! HTTP boundary.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (effective method and URL, forwarded headers)
//!     → context.rs (RequestContext handed to the executor)
//!     → rules::Executor (match rule, run mechanism chains)
//!     → response.rs (decision headers, or error rendering)
//!     → proxy mode only: forward to the rule's upstream
//! ```

pub mod context;
pub mod request;
pub mod response;
pub mod server;

pub use context::RequestContext;
pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState, HttpServer};
