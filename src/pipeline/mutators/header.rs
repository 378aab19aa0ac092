use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::HeaderName;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::keys::KeyMaterial;
use crate::pipeline::mutators::Mutator;
use crate::pipeline::subject::Subject;
use crate::pipeline::template::Template;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeaderConfig {
    headers: BTreeMap<String, Template>,
}

/// Adds templated headers to the upstream request.
#[derive(Debug)]
pub struct HeaderMutator {
    headers: BTreeMap<String, Template>,
    config: MechanismConfig,
}

impl HeaderMutator {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let conf: HeaderConfig = config.decode("header mutator")?;
        if conf.headers.is_empty() {
            return Err(PipelineError::Configuration(
                "header mutator requires at least one header".into(),
            ));
        }
        for name in conf.headers.keys() {
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                PipelineError::Configuration(format!("invalid header name '{}': {}", name, e))
            })?;
        }

        Ok(Self {
            headers: conf.headers,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Mutator for HeaderMutator {
    async fn mutate(
        &self,
        ctx: &dyn Context,
        sub: &Subject,
        _key: Option<&KeyMaterial>,
    ) -> Result<(), PipelineError> {
        tracing::debug!("Mutating using header mutator");

        for (name, template) in &self.headers {
            let value = template.render(sub)?;
            ctx.add_upstream_header(name, &value);
        }
        Ok(())
    }

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Mutator>, PipelineError> {
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
    async fn test_headers_rendered_in_name_order() {
        let conf = MechanismConfig::try_from(json!({
            "headers": {"X-User": "{{ .ID }}", "X-Email": "{{ .Attributes.email }}"}
        }))
        .unwrap();
        let mutator = HeaderMutator::new(&conf).unwrap();
        let ctx = MockContext::new();
        let sub = Subject::new("alice").with_attribute("email", json!("a@x.io"));

        mutator.mutate(&ctx, &sub, None).await.unwrap();

        assert_eq!(
            ctx.upstream_headers(),
            vec![
                ("X-Email".to_string(), "a@x.io".to_string()),
                ("X-User".to_string(), "alice".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let conf = MechanismConfig::try_from(json!({"headers": {"bad name": "x"}})).unwrap();
        assert!(HeaderMutator::new(&conf).is_err());
    }
}
