use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::authorizers::Authorizer;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::subject::Subject;

/// Ordered conjunction of authorizers. An empty chain allows everything.
#[derive(Debug, Clone, Default)]
pub struct CompositeAuthorizer {
    members: Vec<Arc<dyn Authorizer>>,
}

impl CompositeAuthorizer {
    pub fn new(members: Vec<Arc<dyn Authorizer>>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl Authorizer for CompositeAuthorizer {
    async fn authorize(&self, ctx: &dyn Context, sub: &Subject) -> Result<(), PipelineError> {
        for (idx, member) in self.members.iter().enumerate() {
            ctx.app_context().check()?;

            if let Err(err) = member.authorize(ctx, sub).await {
                tracing::debug!(member = idx, error = %err, "Authorizer denied request");
                return Err(err);
            }
        }
        Ok(())
    }

    fn with_config(
        self: Arc<Self>,
        _config: &MechanismConfig,
    ) -> Result<Arc<dyn Authorizer>, PipelineError> {
        Err(PipelineError::Configuration(
            "reconfiguration of a composite authorizer is not supported".into(),
        ))
    }
}
