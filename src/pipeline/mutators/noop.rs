use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::keys::KeyMaterial;
use crate::pipeline::mutators::Mutator;
use crate::pipeline::subject::Subject;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoopConfig {}

#[derive(Debug, Default)]
pub struct NoopMutator;

impl NoopMutator {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let _: NoopConfig = config.decode("noop mutator")?;
        Ok(Self)
    }
}

#[async_trait]
impl Mutator for NoopMutator {
    async fn mutate(
        &self,
        _ctx: &dyn Context,
        _sub: &Subject,
        _key: Option<&KeyMaterial>,
    ) -> Result<(), PipelineError> {
        tracing::debug!("Mutating using noop mutator");
        Ok(())
    }

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Mutator>, PipelineError> {
        if config.is_empty() {
            return Ok(self);
        }
        Ok(Arc::new(Self::new(config)?))
    }
}
