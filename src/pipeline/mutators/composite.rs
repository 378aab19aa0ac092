use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::keys::KeyMaterial;
use crate::pipeline::mutators::Mutator;
use crate::pipeline::subject::Subject;

/// Runs every member in order; the first failure aborts the chain.
#[derive(Debug, Clone, Default)]
pub struct CompositeMutator {
    members: Vec<Arc<dyn Mutator>>,
}

impl CompositeMutator {
    pub fn new(members: Vec<Arc<dyn Mutator>>) -> Self {
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
impl Mutator for CompositeMutator {
    async fn mutate(
        &self,
        ctx: &dyn Context,
        sub: &Subject,
        key: Option<&KeyMaterial>,
    ) -> Result<(), PipelineError> {
        for (idx, member) in self.members.iter().enumerate() {
            ctx.app_context().check()?;

            if let Err(err) = member.mutate(ctx, sub, key).await {
                tracing::debug!(member = idx, error = %err, "Mutator failed");
                return Err(err);
            }
        }
        Ok(())
    }

    fn with_config(
        self: Arc<Self>,
        _config: &MechanismConfig,
    ) -> Result<Arc<dyn Mutator>, PipelineError> {
        Err(PipelineError::Configuration(
            "reconfiguration of a composite mutator is not supported".into(),
        ))
    }
}
