//! Subject templates.
//!
//! A template is plain text with `{{ ... }}` actions referring to the subject:
//! `{{ .ID }}`, `{{ .Attributes }}` or `{{ .Attributes.<dotted.path> }}`.
//! Templates are parsed on every render; a malformed action, an unknown field
//! or a missing attribute is a render error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;
use crate::pipeline::subject::Subject;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn source(&self) -> &str {
        &self.0
    }

    pub fn render(&self, sub: &Subject) -> Result<String, PipelineError> {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();

        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open.find(CLOSE).ok_or_else(|| {
                render_error(&self.0, "unclosed action")
            })?;
            let action = after_open[..end].trim();
            out.push_str(&self.evaluate(action, sub)?);
            rest = &after_open[end + CLOSE.len()..];
        }
        out.push_str(rest);

        Ok(out)
    }

    fn evaluate(&self, action: &str, sub: &Subject) -> Result<String, PipelineError> {
        let field = action
            .strip_prefix('.')
            .ok_or_else(|| render_error(&self.0, &format!("unsupported action '{}'", action)))?;

        match field.split_once('.') {
            None if field == "ID" => Ok(sub.id.clone()),
            None if field == "Attributes" => {
                Ok(Value::Object(sub.attributes.clone()).to_string())
            }
            Some(("Attributes", path)) => sub
                .attribute(path)
                .map(format_value)
                .ok_or_else(|| render_error(&self.0, &format!("no value for attribute '{}'", path))),
            _ => Err(render_error(&self.0, &format!("unknown field '{}'", field))),
        }
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_error(template: &str, reason: &str) -> PipelineError {
    PipelineError::Internal(format!(
        "failed to render template '{}': {}",
        template, reason
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subject() -> Subject {
        Subject::new("alice")
            .with_attribute("email", json!("alice@example.com"))
            .with_attribute("groups", json!(["dev", "ops"]))
            .with_attribute("profile", json!({"age": 42}))
    }

    #[test]
    fn test_render_fields() {
        let sub = subject();

        assert_eq!(Template::from("{{ .ID }}").render(&sub).unwrap(), "alice");
        assert_eq!(
            Template::from("user={{.ID}};mail={{ .Attributes.email }}")
                .render(&sub)
                .unwrap(),
            "user=alice;mail=alice@example.com"
        );
        assert_eq!(
            Template::from("{{ .Attributes.profile.age }}").render(&sub).unwrap(),
            "42"
        );
        assert_eq!(
            Template::from("{{ .Attributes.groups }}").render(&sub).unwrap(),
            r#"["dev","ops"]"#
        );
        assert_eq!(Template::from("static").render(&sub).unwrap(), "static");
    }

    #[test]
    fn test_render_failures() {
        let sub = subject();

        let err = Template::from("{{ .Attributes.missing }}").render(&sub).unwrap_err();
        assert!(err.to_string().contains("no value for attribute 'missing'"));

        let err = Template::from("{{ .Name }}").render(&sub).unwrap_err();
        assert!(err.to_string().contains("unknown field 'Name'"));

        let err = Template::from("{{ .ID ").render(&sub).unwrap_err();
        assert!(err.to_string().contains("unclosed action"));

        let err = Template::from("{{ ID }}").render(&sub).unwrap_err();
        assert!(err.to_string().contains("unsupported action"));
    }
}
