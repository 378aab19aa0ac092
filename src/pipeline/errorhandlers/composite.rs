use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::errorhandlers::ErrorHandler;

/// Ordered error-handler chain.
///
/// Declining members are skipped, the first handling member ends the chain
/// and a failing member aborts it. If every member declines the result is
/// [`PipelineError::NoHandlerApplicable`] wrapping the cause.
#[derive(Debug, Clone)]
pub struct CompositeErrorHandler {
    members: Vec<Arc<dyn ErrorHandler>>,
}

impl CompositeErrorHandler {
    pub fn new(members: Vec<Arc<dyn ErrorHandler>>) -> Result<Self, PipelineError> {
        if members.is_empty() {
            return Err(PipelineError::Configuration(
                "error handler chain requires at least one member".into(),
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
impl ErrorHandler for CompositeErrorHandler {
    async fn execute(&self, ctx: &dyn Context, cause: &PipelineError) -> Result<bool, PipelineError> {
        tracing::debug!(error = %cause, "Handling pipeline error");

        for (idx, member) in self.members.iter().enumerate() {
            match member.execute(ctx, cause).await {
                Ok(true) => return Ok(true),
                Ok(false) => {
                    tracing::debug!(member = idx, "Error handler not applicable, trying next");
                }
                Err(err) => {
                    tracing::debug!(member = idx, error = %err, "Error handler failed");
                    return Err(err);
                }
            }
        }

        Err(PipelineError::NoHandlerApplicable(Box::new(cause.clone())))
    }

    fn with_config(
        self: Arc<Self>,
        _config: &MechanismConfig,
    ) -> Result<Arc<dyn ErrorHandler>, PipelineError> {
        Err(PipelineError::Configuration(
            "reconfiguration of a composite error handler is not supported".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::testsupport::{test_error, MockContext, MockErrorHandler};

    #[tokio::test]
    async fn test_fallback_on_decline() {
        let eh1 = MockErrorHandler::declining();
        let eh2 = MockErrorHandler::handling();
        let handler = CompositeErrorHandler::new(vec![eh1.clone(), eh2.clone()]).unwrap();
        let ctx = MockContext::new();

        let handled = handler.execute(&ctx, &test_error()).await.unwrap();

        assert!(handled);
        assert_eq!(eh1.calls(), 1);
        assert_eq!(eh2.calls(), 1);
        assert_eq!(ctx.pipeline_error(), Some(test_error()));
    }

    #[tokio::test]
    async fn test_first_handler_wins() {
        let eh1 = MockErrorHandler::handling();
        let eh2 = MockErrorHandler::handling();
        let handler = CompositeErrorHandler::new(vec![eh1.clone(), eh2.clone()]).unwrap();

        assert!(handler.execute(&MockContext::new(), &test_error()).await.unwrap());
        assert_eq!(eh2.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_decline() {
        let handler = CompositeErrorHandler::new(vec![
            MockErrorHandler::declining(),
            MockErrorHandler::declining(),
        ])
        .unwrap();

        let err = handler.execute(&MockContext::new(), &test_error()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoHandlerApplicable);
        assert_eq!(err, PipelineError::NoHandlerApplicable(Box::new(test_error())));
    }

    #[tokio::test]
    async fn test_failing_member_aborts_chain() {
        let failure = PipelineError::Internal("handler broke".into());
        let eh1 = MockErrorHandler::failing(failure.clone());
        let eh2 = MockErrorHandler::handling();
        let handler = CompositeErrorHandler::new(vec![eh1, eh2.clone()]).unwrap();

        let err = handler.execute(&MockContext::new(), &test_error()).await.unwrap_err();

        assert_eq!(err, failure);
        assert_eq!(eh2.calls(), 0);
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(CompositeErrorHandler::new(vec![]).is_err());
    }
}
