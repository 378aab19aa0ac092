//! Authenticators.
//!
//! # Data Flow
//! ```text
//! Context → [authenticator #1 → fallback → authenticator #2 → ...] → Subject
//! ```
//!
//! # Design Decisions
//! - First success short-circuits the chain
//! - Only the last member's error is reported; earlier ones are logged
//! - Deadline overrun or cancellation ends the chain without fallback

mod anonymous;
mod basic_auth;
mod composite;
pub mod extractors;
mod generic;
mod noop;
mod unauthorized;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::subject::Subject;

pub use anonymous::AnonymousAuthenticator;
pub use basic_auth::BasicAuthAuthenticator;
pub use composite::CompositeAuthenticator;
pub use generic::GenericAuthenticator;
pub use noop::NoopAuthenticator;
pub use unauthorized::UnauthorizedAuthenticator;

#[async_trait]
pub trait Authenticator: Send + Sync + Debug {
    /// Resolve the subject of the request.
    async fn authenticate(&self, ctx: &dyn Context) -> Result<Subject, PipelineError>;

    /// Derive an instance tuned by `config`.
    ///
    /// An empty override yields `self`; otherwise a new instance is built and
    /// `self` stays untouched.
    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Authenticator>, PipelineError>;
}
