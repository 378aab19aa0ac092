use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::authenticators::Authenticator;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::subject::Subject;

/// Ordered fallback chain of authenticators.
#[derive(Debug, Clone)]
pub struct CompositeAuthenticator {
    members: Vec<Arc<dyn Authenticator>>,
}

impl CompositeAuthenticator {
    /// Fails if `members` is empty.
    pub fn new(members: Vec<Arc<dyn Authenticator>>) -> Result<Self, PipelineError> {
        if members.is_empty() {
            return Err(PipelineError::Configuration(
                "an authenticator chain requires at least one authenticator".into(),
            ));
        }
        Ok(Self { members })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl Authenticator for CompositeAuthenticator {
    async fn authenticate(&self, ctx: &dyn Context) -> Result<Subject, PipelineError> {
        let mut last_err = None;

        for (idx, member) in self.members.iter().enumerate() {
            ctx.app_context().check()?;

            match member.authenticate(ctx).await {
                Ok(sub) => return Ok(sub),
                Err(err) if err.is_abortive() => {
                    tracing::warn!(member = idx, error = %err, "Authenticator aborted, skipping remaining fallbacks");
                    return Err(err);
                }
                Err(err) => {
                    tracing::debug!(member = idx, error = %err, "Authenticator failed, falling back");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            PipelineError::Internal("authenticator chain has no members".into())
        }))
    }

    fn with_config(
        self: Arc<Self>,
        _config: &MechanismConfig,
    ) -> Result<Arc<dyn Authenticator>, PipelineError> {
        Err(PipelineError::Configuration(
            "reconfiguration of a composite authenticator is not supported".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::ErrorKind;
    use crate::pipeline::context::AppContext;
    use crate::pipeline::testsupport::{test_error, MockAuthenticator, MockContext};

    #[tokio::test]
    async fn test_execution_with_fallback() {
        let sub = Subject::new("foo");
        let ctx = MockContext::new();
        let auth1 = MockAuthenticator::failing(test_error());
        let auth2 = MockAuthenticator::succeeding(sub.clone());

        let auth = CompositeAuthenticator::new(vec![auth1.clone(), auth2.clone()]).unwrap();
        let result = auth.authenticate(&ctx).await;

        assert_eq!(result, Ok(sub));
        assert_eq!(auth1.calls(), 1);
        assert_eq!(auth2.calls(), 1);
    }

    #[tokio::test]
    async fn test_execution_without_fallback() {
        let sub = Subject::new("foo");
        let ctx = MockContext::new();
        let auth1 = MockAuthenticator::failing(test_error());
        let auth2 = MockAuthenticator::succeeding(sub.clone());

        let auth = CompositeAuthenticator::new(vec![auth2.clone(), auth1.clone()]).unwrap();
        let result = auth.authenticate(&ctx).await;

        assert_eq!(result, Ok(sub));
        assert_eq!(auth2.calls(), 1);
        assert_eq!(auth1.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_fail_returns_last_error() {
        let ctx = MockContext::new();
        let auth1 = MockAuthenticator::failing(PipelineError::Argument("no header".into()));
        let auth2 = MockAuthenticator::failing(PipelineError::Authentication("bad token".into()));

        let auth = CompositeAuthenticator::new(vec![auth1, auth2]).unwrap();
        let err = auth.authenticate(&ctx).await.unwrap_err();

        assert_eq!(err, PipelineError::Authentication("bad token".into()));
    }

    #[tokio::test]
    async fn test_timeout_aborts_chain() {
        let ctx = MockContext::new();
        let auth1 = MockAuthenticator::failing(PipelineError::CommunicationTimeout("idp".into()));
        let auth2 = MockAuthenticator::succeeding(Subject::new("foo"));

        let auth = CompositeAuthenticator::new(vec![auth1.clone(), auth2.clone()]).unwrap();
        let err = auth.authenticate(&ctx).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommunicationTimeout);
        assert_eq!(auth2.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_stops_before_next_member() {
        let ctx = MockContext::new().with_app_context(AppContext::with_timeout(Duration::from_millis(10)));
        tokio::time::advance(Duration::from_millis(20)).await;
        let auth1 = MockAuthenticator::succeeding(Subject::new("foo"));

        let auth = CompositeAuthenticator::new(vec![auth1.clone()]).unwrap();
        let err = auth.authenticate(&ctx).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommunicationTimeout);
        assert_eq!(auth1.calls(), 0);
    }

    #[test]
    fn test_empty_chain_is_configuration_error() {
        let err = CompositeAuthenticator::new(vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_prototype_is_not_allowed() {
        let auth = Arc::new(
            CompositeAuthenticator::new(vec![MockAuthenticator::succeeding(Subject::new("x"))]).unwrap(),
        );

        let err = auth.with_config(&MechanismConfig::new()).unwrap_err();

        assert!(err.to_string().contains("configuration error"));
    }
}
