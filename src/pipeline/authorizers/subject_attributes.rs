use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::PipelineError;
use crate::pipeline::authorizers::Authorizer;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::subject::Subject;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubjectAttributesConfig {
    require: BTreeMap<String, OneOrMany>,
}

/// Requires subject attributes to hold one of the accepted values.
///
/// ```toml
/// config = { require = { "groups" = ["admin", "ops"], "tenant" = "acme" } }
/// ```
///
/// Array attributes match if any element is accepted.
#[derive(Debug)]
pub struct SubjectAttributesAuthorizer {
    require: BTreeMap<String, Vec<String>>,
    config: MechanismConfig,
}

impl SubjectAttributesAuthorizer {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let conf: SubjectAttributesConfig = config.decode("subject_attributes authorizer")?;
        if conf.require.is_empty() {
            return Err(PipelineError::Configuration(
                "subject_attributes authorizer requires at least one attribute".into(),
            ));
        }

        Ok(Self {
            require: conf
                .require
                .into_iter()
                .map(|(name, values)| (name, values.into_vec()))
                .collect(),
            config: config.clone(),
        })
    }
}

fn accepted(value: &Value, allowed: &[String]) -> bool {
    match value {
        Value::String(s) => allowed.iter().any(|a| a == s),
        Value::Array(items) => items.iter().any(|item| accepted(item, allowed)),
        Value::Number(_) | Value::Bool(_) => {
            let shown = value.to_string();
            allowed.iter().any(|a| *a == shown)
        }
        Value::Null | Value::Object(_) => false,
    }
}

#[async_trait]
impl Authorizer for SubjectAttributesAuthorizer {
    async fn authorize(&self, _ctx: &dyn Context, sub: &Subject) -> Result<(), PipelineError> {
        tracing::debug!("Authorizing using subject_attributes authorizer");

        for (name, allowed) in &self.require {
            let value = sub.attribute(name).ok_or_else(|| {
                PipelineError::Authorization(format!("subject has no '{}' attribute", name))
            })?;
            if !accepted(value, allowed) {
                return Err(PipelineError::Authorization(format!(
                    "subject attribute '{}' has no accepted value",
                    name
                )));
            }
        }
        Ok(())
    }

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Authorizer>, PipelineError> {
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

    fn authorizer() -> SubjectAttributesAuthorizer {
        let conf = MechanismConfig::try_from(json!({
            "require": {"groups": ["admin", "ops"], "tenant": "acme", "level": "3"}
        }))
        .unwrap();
        SubjectAttributesAuthorizer::new(&conf).unwrap()
    }

    #[tokio::test]
    async fn test_matching_subject_allowed() {
        let sub = Subject::new("alice")
            .with_attribute("groups", json!(["dev", "ops"]))
            .with_attribute("tenant", json!("acme"))
            .with_attribute("level", json!(3));

        assert!(authorizer().authorize(&MockContext::new(), &sub).await.is_ok());
    }

    #[tokio::test]
    async fn test_mismatch_and_missing_denied() {
        let ctx = MockContext::new();

        let wrong_group = Subject::new("bob")
            .with_attribute("groups", json!(["dev"]))
            .with_attribute("tenant", json!("acme"))
            .with_attribute("level", json!(3));
        let err = authorizer().authorize(&ctx, &wrong_group).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let missing = Subject::new("carol").with_attribute("groups", json!("admin"));
        let err = authorizer().authorize(&ctx, &missing).await.unwrap_err();
        assert!(err.to_string().contains("no 'level' attribute"));
    }

    #[test]
    fn test_requires_attributes() {
        let conf = MechanismConfig::try_from(json!({"require": {}})).unwrap();
        assert!(SubjectAttributesAuthorizer::new(&conf).is_err());
    }
}
