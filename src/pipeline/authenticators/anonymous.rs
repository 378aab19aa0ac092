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
struct AnonymousConfig {
    #[serde(default = "default_subject")]
    subject: String,
}

fn default_subject() -> String {
    "anonymous".to_string()
}

/// Accepts every request as a fixed subject.
#[derive(Debug)]
pub struct AnonymousAuthenticator {
    subject: String,
    config: MechanismConfig,
}

impl AnonymousAuthenticator {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let conf: AnonymousConfig = config.decode("anonymous authenticator")?;
        if conf.subject.is_empty() {
            return Err(PipelineError::Configuration(
                "anonymous authenticator requires a non-empty subject".into(),
            ));
        }
        Ok(Self {
            subject: conf.subject,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    async fn authenticate(&self, _ctx: &dyn Context) -> Result<Subject, PipelineError> {
        tracing::debug!("Authenticating using anonymous authenticator");
        Ok(Subject::new(self.subject.clone()))
    }

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Authenticator>, PipelineError> {
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
    async fn test_default_subject() {
        let auth = AnonymousAuthenticator::new(&MechanismConfig::new()).unwrap();
        let sub = auth.authenticate(&MockContext::new()).await.unwrap();
        assert_eq!(sub.id, "anonymous");
    }

    #[tokio::test]
    async fn test_with_config_derives_new_instance() {
        let proto: Arc<dyn Authenticator> =
            Arc::new(AnonymousAuthenticator::new(&MechanismConfig::new()).unwrap());

        let same = proto.clone().with_config(&MechanismConfig::new()).unwrap();
        assert!(Arc::ptr_eq(&proto, &same));

        let derived = proto
            .clone()
            .with_config(&MechanismConfig::try_from(json!({"subject": "guest"})).unwrap())
            .unwrap();
        assert!(!Arc::ptr_eq(&proto, &derived));

        let ctx = MockContext::new();
        assert_eq!(derived.authenticate(&ctx).await.unwrap().id, "guest");
        assert_eq!(proto.authenticate(&ctx).await.unwrap().id, "anonymous");
    }

    #[test]
    fn test_invalid_config() {
        let conf = MechanismConfig::try_from(json!({"subject": ""})).unwrap();
        assert!(AnonymousAuthenticator::new(&conf).is_err());

        let conf = MechanismConfig::try_from(json!({"foo": "bar"})).unwrap();
        assert!(AnonymousAuthenticator::new(&conf).is_err());
    }
}
