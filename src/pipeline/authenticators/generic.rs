use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::PipelineError;
use crate::pipeline::authenticators::extractors::{
    build_strategy, CompositeExtractStrategy, ExtractStrategy, ExtractorConfig,
};
use crate::pipeline::authenticators::Authenticator;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::endpoint::{Endpoint, EndpointConfig};
use crate::pipeline::subject::Subject;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GenericConfig {
    identity_info_endpoint: EndpointConfig,
    authentication_data_source: Vec<ExtractorConfig>,
    #[serde(default)]
    subject: SubjectInfo,
}

/// JSON pointers locating the subject in the endpoint's response.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubjectInfo {
    #[serde(default = "default_id_pointer")]
    id: String,
    /// Empty pointer selects the whole document.
    #[serde(default)]
    attributes: String,
}

impl Default for SubjectInfo {
    fn default() -> Self {
        Self {
            id: default_id_pointer(),
            attributes: String::new(),
        }
    }
}

fn default_id_pointer() -> String {
    "/sub".to_string()
}

/// Forwards the extracted credential to a remote identity endpoint and builds
/// the subject from its JSON answer.
#[derive(Debug)]
pub struct GenericAuthenticator {
    endpoint: Endpoint,
    extractor: CompositeExtractStrategy,
    subject: SubjectInfo,
    config: MechanismConfig,
}

impl GenericAuthenticator {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let conf: GenericConfig = config.decode("generic authenticator")?;

        Ok(Self {
            endpoint: Endpoint::new(&conf.identity_info_endpoint)?,
            extractor: build_strategy(&conf.authentication_data_source)?,
            subject: conf.subject,
            config: config.clone(),
        })
    }

    fn subject_from(&self, body: &[u8]) -> Result<Subject, PipelineError> {
        let doc: Value = serde_json::from_slice(body).map_err(|e| {
            PipelineError::Authentication(format!("failed to parse identity response: {}", e))
        })?;

        let id = match doc.pointer(&self.subject.id) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(PipelineError::Authentication(format!(
                    "identity response has no subject id at '{}'",
                    self.subject.id
                )))
            }
        };

        let attributes = match doc.pointer(&self.subject.attributes) {
            Some(Value::Object(map)) => map.clone(),
            None => Map::new(),
            Some(_) => {
                return Err(PipelineError::Authentication(format!(
                    "subject attributes at '{}' are not an object",
                    self.subject.attributes
                )))
            }
        };

        Ok(Subject { id, attributes })
    }
}

#[async_trait]
impl Authenticator for GenericAuthenticator {
    async fn authenticate(&self, ctx: &dyn Context) -> Result<Subject, PipelineError> {
        tracing::debug!(endpoint = %self.endpoint.url(), "Authenticating using generic authenticator");

        let auth_data = self.extractor.get_auth_data(ctx)?;
        let response = self
            .endpoint
            .send_request(ctx.app_context(), Some(&auth_data))
            .await?;

        if !response.status.is_success() {
            return Err(PipelineError::Authentication(format!(
                "identity endpoint {} responded with {}",
                self.endpoint.url(),
                response.status
            )));
        }

        self.subject_from(&response.body)
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
    use crate::error::ErrorKind;
    use crate::pipeline::testsupport::MockContext;
    use serde_json::json;

    fn authenticator(subject: Value) -> GenericAuthenticator {
        let conf = MechanismConfig::try_from(json!({
            "identity_info_endpoint": {"url": "http://127.0.0.1:9/userinfo"},
            "authentication_data_source": [{"header": "Authorization", "schema": "Bearer"}],
            "subject": subject,
        }))
        .unwrap();
        GenericAuthenticator::new(&conf).unwrap()
    }

    #[test]
    fn test_subject_from_response() {
        let auth = authenticator(json!({"id": "/user/id", "attributes": "/user"}));

        let sub = auth
            .subject_from(br#"{"user": {"id": "alice", "email": "a@x.io"}}"#)
            .unwrap();

        assert_eq!(sub.id, "alice");
        assert_eq!(sub.attribute("email"), Some(&json!("a@x.io")));
    }

    #[test]
    fn test_subject_defaults_and_failures() {
        let auth = authenticator(json!({}));

        let sub = auth.subject_from(br#"{"sub": 42, "scope": "read"}"#).unwrap();
        assert_eq!(sub.id, "42");
        assert_eq!(sub.attribute("scope"), Some(&json!("read")));

        let err = auth.subject_from(br#"{"name": "x"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);

        let err = auth.subject_from(b"not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_missing_credential_is_argument_error() {
        let auth = authenticator(json!({}));
        let err = auth.authenticate(&MockContext::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_requires_data_source() {
        let conf = MechanismConfig::try_from(json!({
            "identity_info_endpoint": {"url": "http://127.0.0.1:9/userinfo"},
            "authentication_data_source": [],
        }))
        .unwrap();
        assert!(GenericAuthenticator::new(&conf).is_err());
    }
}
