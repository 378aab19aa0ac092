//! Authorizers.
//!
//! Every authorizer of a rule must pass, in configured order. The first
//! denial ends evaluation.

mod allow;
mod composite;
mod deny;
mod subject_attributes;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::subject::Subject;

pub use allow::AllowAuthorizer;
pub use composite::CompositeAuthorizer;
pub use deny::DenyAuthorizer;
pub use subject_attributes::SubjectAttributesAuthorizer;

#[async_trait]
pub trait Authorizer: Send + Sync + Debug {
    async fn authorize(&self, ctx: &dyn Context, sub: &Subject) -> Result<(), PipelineError>;

    /// Derive an instance tuned by `config`; empty overrides yield `self`.
    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Authorizer>, PipelineError>;
}
