//! Warden: an identity-aware access decision engine.
//!
//! Each request is matched against a rule index; the matched rule runs its
//! mechanism chains (authenticators, authorizers, mutators, error handlers)
//! and the outcome is either a decision (allow + headers) or a rendered
//! error. Rule sets arrive from providers and are reconciled into a new
//! index without blocking in-flight requests.

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod rules;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::WardenConfig;
pub use error::{ErrorKind, PipelineError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
