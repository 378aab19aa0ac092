use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::PipelineError;
use crate::pipeline::authenticators::extractors::{ExtractStrategy, HeaderValueExtractStrategy};
use crate::pipeline::authenticators::Authenticator;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::subject::Subject;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BasicAuthConfig {
    user_id: String,
    password: String,
}

/// Verifies `Authorization: Basic` credentials against a single configured user.
///
/// Only SHA-256 digests of the credentials are kept; comparison is constant time.
pub struct BasicAuthAuthenticator {
    user_id: String,
    user_id_digest: [u8; 32],
    password_digest: [u8; 32],
    extractor: HeaderValueExtractStrategy,
    config: MechanismConfig,
}

impl std::fmt::Debug for BasicAuthAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthAuthenticator")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl BasicAuthAuthenticator {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let conf: BasicAuthConfig = config.decode("basic_auth authenticator")?;
        if conf.user_id.is_empty() || conf.password.is_empty() {
            return Err(PipelineError::Configuration(
                "basic_auth authenticator requires user_id and password".into(),
            ));
        }

        Ok(Self {
            user_id_digest: digest(&conf.user_id),
            password_digest: digest(&conf.password),
            user_id: conf.user_id,
            extractor: HeaderValueExtractStrategy {
                name: "Authorization".into(),
                schema: Some("Basic".into()),
            },
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Authenticator for BasicAuthAuthenticator {
    async fn authenticate(&self, ctx: &dyn Context) -> Result<Subject, PipelineError> {
        tracing::debug!("Authenticating using basic_auth authenticator");

        let auth_data = self.extractor.get_auth_data(ctx)?;

        let decoded = STANDARD
            .decode(auth_data.value())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| {
                PipelineError::Authentication("failed to decode basic auth credentials".into())
            })?;
        let (user_id, password) = decoded.split_once(':').ok_or_else(|| {
            PipelineError::Authentication("malformed basic auth credentials".into())
        })?;

        let user_ok = digest(user_id)[..].ct_eq(&self.user_id_digest[..]);
        let password_ok = digest(password)[..].ct_eq(&self.password_digest[..]);
        if !bool::from(user_ok & password_ok) {
            return Err(PipelineError::Authentication("invalid user credentials".into()));
        }

        Ok(Subject::new(self.user_id.clone()))
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

    fn authenticator() -> BasicAuthAuthenticator {
        let conf = MechanismConfig::try_from(json!({"user_id": "foo", "password": "bar"})).unwrap();
        BasicAuthAuthenticator::new(&conf).unwrap()
    }

    fn basic(credentials: &str) -> String {
        format!("Basic {}", STANDARD.encode(credentials))
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let ctx = MockContext::new().with_header("Authorization", &basic("foo:bar"));
        let sub = authenticator().authenticate(&ctx).await.unwrap();
        assert_eq!(sub.id, "foo");
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        for value in [basic("foo:baz"), basic("other:bar"), basic("foobar"), "Basic !!!".to_string()] {
            let ctx = MockContext::new().with_header("Authorization", &value);
            let err = authenticator().authenticate(&ctx).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Authentication, "{}", value);
        }
    }

    #[tokio::test]
    async fn test_missing_or_wrong_schema() {
        let err = authenticator().authenticate(&MockContext::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);

        let ctx = MockContext::new().with_header("Authorization", "Bearer abc");
        let err = authenticator().authenticate(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[tokio::test]
    async fn test_override_password_only() {
        let proto: Arc<dyn Authenticator> = Arc::new(authenticator());
        let derived = proto
            .clone()
            .with_config(&MechanismConfig::try_from(json!({"password": "secret"})).unwrap())
            .unwrap();

        let ctx = MockContext::new().with_header("Authorization", &basic("foo:secret"));
        assert!(derived.authenticate(&ctx).await.is_ok());
        assert!(proto.authenticate(&ctx).await.is_err());
    }

    #[test]
    fn test_missing_config() {
        assert!(BasicAuthAuthenticator::new(&MechanismConfig::new()).is_err());
    }
}
