//! Mutators.
//!
//! A mutator turns the authenticated subject into request or response
//! artifacts (upstream headers, cookies, tokens). All output is written
//! through the [`Context`]; nothing is returned but the error.

mod composite;
mod cookie;
mod header;
mod jwt;
mod noop;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::keys::KeyMaterial;
use crate::pipeline::subject::Subject;

pub use composite::CompositeMutator;
pub use cookie::CookieMutator;
pub(crate) use cookie::is_cookie_octet;
pub use header::HeaderMutator;
pub use jwt::JwtMutator;
pub use noop::NoopMutator;

#[async_trait]
pub trait Mutator: Send + Sync + Debug {
    async fn mutate(
        &self,
        ctx: &dyn Context,
        sub: &Subject,
        key: Option<&KeyMaterial>,
    ) -> Result<(), PipelineError>;

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Mutator>, PipelineError>;
}
