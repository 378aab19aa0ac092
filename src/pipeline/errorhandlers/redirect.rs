use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::{ErrorKind, PipelineError};
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::errorhandlers::ErrorHandler;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RedirectConfig {
    to: Url,
    #[serde(default = "default_code")]
    code: u16,
    #[serde(default)]
    return_to_query_parameter: Option<String>,
    #[serde(default = "default_when")]
    when: Vec<ErrorKind>,
}

fn default_code() -> u16 {
    302
}

fn default_when() -> Vec<ErrorKind> {
    vec![ErrorKind::Authentication]
}

/// Redirects the client, e.g. to a login page, for the configured error kinds.
///
/// ```toml
/// config = { to = "https://login.local/", return_to_query_parameter = "origin", when = ["authentication"] }
/// ```
#[derive(Debug)]
pub struct RedirectErrorHandler {
    to: Url,
    code: u16,
    return_to: Option<String>,
    when: Vec<ErrorKind>,
    config: MechanismConfig,
}

impl RedirectErrorHandler {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let conf: RedirectConfig = config.decode("redirect error handler")?;
        if !(300..=399).contains(&conf.code) {
            return Err(PipelineError::Configuration(format!(
                "redirect error handler code {} is not a redirect status",
                conf.code
            )));
        }
        if conf.when.is_empty() {
            return Err(PipelineError::Configuration(
                "redirect error handler requires at least one error kind in 'when'".into(),
            ));
        }

        Ok(Self {
            to: conf.to,
            code: conf.code,
            return_to: conf.return_to_query_parameter,
            when: conf.when,
            config: config.clone(),
        })
    }

    fn location(&self, ctx: &dyn Context) -> Url {
        let mut location = self.to.clone();
        if let Some(param) = &self.return_to {
            location
                .query_pairs_mut()
                .append_pair(param, ctx.request_url().as_str());
        }
        location
    }
}

#[async_trait]
impl ErrorHandler for RedirectErrorHandler {
    async fn execute(&self, ctx: &dyn Context, cause: &PipelineError) -> Result<bool, PipelineError> {
        if !self.when.contains(&cause.kind()) {
            return Ok(false);
        }

        tracing::debug!(to = %self.to, "Handling error using redirect error handler");
        ctx.set_pipeline_error(PipelineError::Redirect {
            location: self.location(ctx),
            code: self.code,
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

    fn handler(conf: serde_json::Value) -> RedirectErrorHandler {
        RedirectErrorHandler::new(&MechanismConfig::try_from(conf).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_redirects_with_return_to() {
        let eh = handler(json!({
            "to": "https://login.local/signin?x=1",
            "return_to_query_parameter": "origin",
        }));
        let ctx = MockContext::new().with_url("http://app.local/api?a=b");

        let handled = eh
            .execute(&ctx, &PipelineError::Authentication("expired".into()))
            .await
            .unwrap();

        assert!(handled);
        match ctx.pipeline_error() {
            Some(PipelineError::Redirect { location, code }) => {
                assert_eq!(code, 302);
                assert_eq!(
                    location.as_str(),
                    "https://login.local/signin?x=1&origin=http%3A%2F%2Fapp.local%2Fapi%3Fa%3Db"
                );
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_declines_other_kinds() {
        let eh = handler(json!({"to": "https://login.local/"}));
        let ctx = MockContext::new();

        let handled = eh
            .execute(&ctx, &PipelineError::Authorization("denied".into()))
            .await
            .unwrap();

        assert!(!handled);
        assert!(ctx.pipeline_error().is_none());
    }

    #[tokio::test]
    async fn test_matches_through_annotations() {
        let eh = handler(json!({"to": "https://login.local/", "when": ["authorization"], "code": 303}));
        let cause = PipelineError::Authorization("denied".into()).annotate("rule r1");

        assert!(eh.execute(&MockContext::new(), &cause).await.unwrap());
    }

    #[test]
    fn test_invalid_code() {
        let conf = MechanismConfig::try_from(json!({"to": "https://login.local/", "code": 200})).unwrap();
        assert!(RedirectErrorHandler::new(&conf).is_err());
    }
}
