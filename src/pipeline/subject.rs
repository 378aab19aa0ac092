//! Resolved identity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The identity produced by authentication.
///
/// Handed to authorizers and mutators by shared reference; it is never
/// modified after the authenticator returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Look up an attribute by dotted path, descending into nested objects.
    pub fn attribute(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.attributes.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_attribute_lookup() {
        let sub = Subject::new("alice")
            .with_attribute("email", json!("alice@example.com"))
            .with_attribute("org", json!({"name": "acme", "unit": {"id": 7}}));

        assert_eq!(sub.attribute("email"), Some(&json!("alice@example.com")));
        assert_eq!(sub.attribute("org.unit.id"), Some(&json!(7)));
        assert_eq!(sub.attribute("org.missing"), None);
        assert_eq!(sub.attribute("email.nested"), None);
    }
}
