//! A compiled rule.

use std::fmt;

use axum::http::Method;
use url::Url;

use crate::error::PipelineError;
use crate::pipeline::authenticators::{Authenticator, CompositeAuthenticator};
use crate::pipeline::authorizers::{Authorizer, CompositeAuthorizer};
use crate::pipeline::errorhandlers::{CompositeErrorHandler, ErrorHandler};
use crate::pipeline::mutators::{CompositeMutator, Mutator};
use crate::pipeline::{Context, KeyMaterial, Subject};
use crate::rules::pattern::{PathPattern, Specificity};

/// Match criteria bound to the rule's mechanism chains.
///
/// Immutable once built; replaced as a whole when its provider's rule set
/// changes.
pub struct Rule {
    pub(crate) id: String,
    pub(crate) provider: String,
    pub(crate) position: usize,
    pub(crate) methods: Vec<Method>,
    pub(crate) pattern: PathPattern,
    pub(crate) authenticator: CompositeAuthenticator,
    pub(crate) authorizer: CompositeAuthorizer,
    pub(crate) mutator: CompositeMutator,
    pub(crate) error_handler: CompositeErrorHandler,
    pub(crate) upstream: Option<Url>,
}

impl Rule {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Position within the provider's rule set.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Empty means any method.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn upstream(&self) -> Option<&Url> {
        self.upstream.as_ref()
    }

    pub fn specificity(&self) -> Specificity {
        self.pattern.specificity()
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        (self.methods.is_empty() || self.methods.contains(method)) && self.pattern.matches(path)
    }

    /// Run the rule's chains for one request.
    ///
    /// On failure the error-handler chain decides the outcome. A handled
    /// error is replaced by whatever the handler recorded on the context
    /// (e.g. a redirect); a failing handler's own error is returned instead.
    pub async fn execute(
        &self,
        ctx: &dyn Context,
        key: Option<&KeyMaterial>,
    ) -> Result<Subject, PipelineError> {
        let err = match self.run_chains(ctx, key).await {
            Ok(sub) => return Ok(sub),
            Err(err) => err.annotate(format!("rule '{}'", self.id)),
        };

        tracing::debug!(rule = %self.id, provider = %self.provider, error = %err, "Pipeline failed");

        match self.error_handler.execute(ctx, &err).await {
            Ok(_) => Err(ctx.pipeline_error().unwrap_or(err)),
            Err(handler_err) => Err(handler_err),
        }
    }

    async fn run_chains(
        &self,
        ctx: &dyn Context,
        key: Option<&KeyMaterial>,
    ) -> Result<Subject, PipelineError> {
        let sub = self.authenticator.authenticate(ctx).await?;
        tracing::debug!(rule = %self.id, subject = %sub.id, "Subject authenticated");

        self.authorizer.authorize(ctx, &sub).await?;
        self.mutator.mutate(ctx, &sub, key).await?;
        Ok(sub)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("methods", &self.methods)
            .field("pattern", &self.pattern.as_str())
            .field("authenticators", &self.authenticator.len())
            .field("authorizers", &self.authorizer.len())
            .field("mutators", &self.mutator.len())
            .field("error_handlers", &self.error_handler.len())
            .field("upstream", &self.upstream.as_ref().map(Url::as_str))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::errorhandlers::DefaultErrorHandler;
    use crate::pipeline::testsupport::{
        test_error, MockAuthenticator, MockAuthorizer, MockContext, MockErrorHandler, MockMutator,
    };
    use std::sync::Arc;

    fn rule(
        authenticator: Arc<MockAuthenticator>,
        authorizer: Arc<MockAuthorizer>,
        mutator: Arc<MockMutator>,
        handlers: Vec<Arc<dyn ErrorHandler>>,
    ) -> Rule {
        Rule {
            id: "r1".into(),
            provider: "test".into(),
            position: 0,
            methods: vec![Method::GET],
            pattern: PathPattern::parse("/api/**").unwrap(),
            authenticator: CompositeAuthenticator::new(vec![authenticator]).unwrap(),
            authorizer: CompositeAuthorizer::new(vec![authorizer]),
            mutator: CompositeMutator::new(vec![mutator]),
            error_handler: CompositeErrorHandler::new(handlers).unwrap(),
            upstream: None,
        }
    }

    #[tokio::test]
    async fn test_successful_pipeline() {
        let authz = MockAuthorizer::allowing();
        let mutator = MockMutator::succeeding();
        let handler = MockErrorHandler::handling();
        let r = rule(
            MockAuthenticator::succeeding(Subject::new("alice")),
            authz.clone(),
            mutator.clone(),
            vec![handler.clone()],
        );

        let sub = r.execute(&MockContext::new(), None).await.unwrap();

        assert_eq!(sub.id, "alice");
        assert_eq!(authz.calls(), 1);
        assert_eq!(mutator.calls(), 1);
        assert_eq!(handler.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_goes_through_error_handlers() {
        let mutator = MockMutator::succeeding();
        let r = rule(
            MockAuthenticator::succeeding(Subject::new("alice")),
            MockAuthorizer::denying(PipelineError::Authorization("denied".into())),
            mutator.clone(),
            vec![Arc::new(DefaultErrorHandler)],
        );

        let err = r.execute(&MockContext::new(), None).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(err.to_string(), "rule 'r1': authorization error: denied");
        assert_eq!(mutator.calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_handler_error_is_returned() {
        let r = rule(
            MockAuthenticator::failing(PipelineError::Authentication("bad".into())),
            MockAuthorizer::allowing(),
            MockMutator::succeeding(),
            vec![MockErrorHandler::failing(test_error())],
        );

        let err = r.execute(&MockContext::new(), None).await.unwrap_err();
        assert_eq!(err, test_error());
    }

    #[test]
    fn test_matches_method_and_path() {
        let r = rule(
            MockAuthenticator::succeeding(Subject::new("a")),
            MockAuthorizer::allowing(),
            MockMutator::succeeding(),
            vec![MockErrorHandler::handling()],
        );

        assert!(r.matches(&Method::GET, "/api/users"));
        assert!(!r.matches(&Method::POST, "/api/users"));
        assert!(!r.matches(&Method::GET, "/other"));
    }
}
