//! Request executor: rule lookup plus rule execution.

use std::sync::Arc;

use url::Url;

use crate::error::PipelineError;
use crate::pipeline::{Context, KeyMaterial, Subject};
use crate::rules::index::RuleRepository;

/// Outcome of an allowed request.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub rule: String,
    pub provider: String,
    pub subject: Subject,
    pub upstream: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct Executor {
    repository: Arc<RuleRepository>,
    key: Option<KeyMaterial>,
}

impl Executor {
    pub fn new(repository: Arc<RuleRepository>, key: Option<KeyMaterial>) -> Self {
        Self { repository, key }
    }

    pub fn repository(&self) -> &Arc<RuleRepository> {
        &self.repository
    }

    /// Find the rule for the request and run it.
    ///
    /// The rule is resolved against the index current at call time and kept
    /// for the whole request, whatever reconciliation does meanwhile.
    pub async fn execute(&self, ctx: &dyn Context) -> Result<Decision, PipelineError> {
        let method = ctx.request_method();
        let path = ctx.request_url().path();

        let rule = self.repository.find_rule(method, path)?;
        tracing::debug!(rule = %rule.id(), provider = %rule.provider(), "Rule matched");

        let subject = rule.execute(ctx, self.key.as_ref()).await?;

        Ok(Decision {
            rule: rule.id().to_string(),
            provider: rule.provider().to_string(),
            subject,
            upstream: rule.upstream().cloned(),
        })
    }
}
