use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::pipeline::authenticators::Authenticator;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::subject::Subject;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoopConfig {}

/// Lets every request through with an empty subject.
#[derive(Debug, Default)]
pub struct NoopAuthenticator;

impl NoopAuthenticator {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let _: NoopConfig = config.decode("noop authenticator")?;
        Ok(Self)
    }
}

#[async_trait]
impl Authenticator for NoopAuthenticator {
    async fn authenticate(&self, _ctx: &dyn Context) -> Result<Subject, PipelineError> {
        tracing::debug!("Authenticating using noop authenticator");
        Ok(Subject::default())
    }

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Authenticator>, PipelineError> {
        if config.is_empty() {
            return Ok(self);
        }
        Ok(Arc::new(Self::new(config)?))
    }
}
