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
struct UnauthorizedConfig {}

/// Rejects every request.
#[derive(Debug, Default)]
pub struct UnauthorizedAuthenticator;

impl UnauthorizedAuthenticator {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let _: UnauthorizedConfig = config.decode("unauthorized authenticator")?;
        Ok(Self)
    }
}

#[async_trait]
impl Authenticator for UnauthorizedAuthenticator {
    async fn authenticate(&self, _ctx: &dyn Context) -> Result<Subject, PipelineError> {
        tracing::debug!("Authenticating using unauthorized authenticator");
        Err(PipelineError::Authentication(
            "denied by unauthorized authenticator".into(),
        ))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::testsupport::MockContext;
    use serde_json::json;

    #[tokio::test]
    async fn test_always_rejects() {
        let auth = UnauthorizedAuthenticator::new(&MechanismConfig::new()).unwrap();
        let err = auth.authenticate(&MockContext::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_rejects_any_override() {
        let auth = Arc::new(UnauthorizedAuthenticator);
        let conf = MechanismConfig::try_from(json!({"foo": 1})).unwrap();
        assert!(auth.with_config(&conf).is_err());
    }
}
