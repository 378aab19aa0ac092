use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ErrorKind, PipelineError};
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::errorhandlers::ErrorHandler;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WwwAuthenticateConfig {
    #[serde(default = "default_realm")]
    realm: String,
}

fn default_realm() -> String {
    "Please authenticate".to_string()
}

/// Answers authentication failures with a Basic challenge.
#[derive(Debug)]
pub struct WwwAuthenticateErrorHandler {
    realm: String,
    config: MechanismConfig,
}

impl WwwAuthenticateErrorHandler {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let conf: WwwAuthenticateConfig = config.decode("www_authenticate error handler")?;
        if conf.realm.contains('"') {
            return Err(PipelineError::Configuration(
                "www_authenticate realm must not contain quotes".into(),
            ));
        }
        Ok(Self {
            realm: conf.realm,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ErrorHandler for WwwAuthenticateErrorHandler {
    async fn execute(&self, ctx: &dyn Context, cause: &PipelineError) -> Result<bool, PipelineError> {
        if cause.kind() != ErrorKind::Authentication {
            return Ok(false);
        }

        tracing::debug!("Handling error using www_authenticate error handler");
        ctx.set_pipeline_error(PipelineError::Challenge {
            realm: self.realm.clone(),
        });
        Ok(true)
    }

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn ErrorHandler>, PipelineError> {
        if config.is_empty() {
            return Ok(self);
        }
        Ok(Arc::new(Self::new(&self.config.merged(config))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testsupport::MockContext;
    use serde_json::json;

    #[tokio::test]
    async fn test_challenge_for_authentication_errors() {
        let eh = Arc::new(WwwAuthenticateErrorHandler::new(&MechanismConfig::new()).unwrap());
        let ctx = MockContext::new();

        assert!(!eh
            .execute(&ctx, &PipelineError::Authorization("no".into()))
            .await
            .unwrap());
        assert!(eh
            .execute(&ctx, &PipelineError::Authentication("no".into()))
            .await
            .unwrap());
        assert_eq!(
            ctx.pipeline_error(),
            Some(PipelineError::Challenge {
                realm: "Please authenticate".into()
            })
        );

        let tuned = eh
            .with_config(&MechanismConfig::try_from(json!({"realm": "admin"})).unwrap())
            .unwrap();
        let ctx = MockContext::new();
        tuned
            .execute(&ctx, &PipelineError::Authentication("no".into()))
            .await
            .unwrap();
        assert_eq!(ctx.pipeline_error(), Some(PipelineError::Challenge { realm: "admin".into() }));
    }
}
