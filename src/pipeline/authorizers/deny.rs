use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::pipeline::authorizers::Authorizer;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::subject::Subject;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DenyConfig {}

#[derive(Debug, Default)]
pub struct DenyAuthorizer;

impl DenyAuthorizer {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let _: DenyConfig = config.decode("deny authorizer")?;
        Ok(Self)
    }
}

#[async_trait]
impl Authorizer for DenyAuthorizer {
    async fn authorize(&self, _ctx: &dyn Context, sub: &Subject) -> Result<(), PipelineError> {
        tracing::debug!("Authorizing using deny authorizer");
        Err(PipelineError::Authorization(format!(
            "subject '{}' denied by deny authorizer",
            sub.id
        )))
    }

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Authorizer>, PipelineError> {
        if config.is_empty() {
            return Ok(self);
        }
        Ok(Arc::new(Self::new(config)?))
    }
}
