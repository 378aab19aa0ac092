use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::errorhandlers::ErrorHandler;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultConfig {}

/// Always applicable; hands the cause to the boundary unchanged.
#[derive(Debug, Default)]
pub struct DefaultErrorHandler;

impl DefaultErrorHandler {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let _: DefaultConfig = config.decode("default error handler")?;
        Ok(Self)
    }
}

#[async_trait]
impl ErrorHandler for DefaultErrorHandler {
    async fn execute(&self, ctx: &dyn Context, cause: &PipelineError) -> Result<bool, PipelineError> {
        tracing::debug!("Handling error using default error handler");
        ctx.set_pipeline_error(cause.clone());
        Ok(true)
    }

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn ErrorHandler>, PipelineError> {
        if config.is_empty() {
            return Ok(self);
        }
        Ok(Arc::new(Self::new(config)?))
    }
}
