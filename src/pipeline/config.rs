//! Raw mechanism configuration.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PipelineError;

/// Untyped configuration handed to a mechanism constructor.
///
/// Prototypes are declared with one of these and rules may supply another as
/// an override. Each mechanism decodes it into its own typed config struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MechanismConfig(Map<String, Value>);

impl MechanismConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Decode into a typed configuration.
    pub fn decode<T: DeserializeOwned>(&self, mechanism: &str) -> Result<T, PipelineError> {
        serde_json::from_value(Value::Object(self.0.clone())).map_err(|e| {
            PipelineError::Configuration(format!(
                "failed to decode {} configuration: {}",
                mechanism, e
            ))
        })
    }

    /// Return a copy of `self` with every top-level key of `overrides` replacing
    /// the corresponding key of `self`.
    pub fn merged(&self, overrides: &MechanismConfig) -> MechanismConfig {
        let mut merged = self.0.clone();
        for (key, value) in &overrides.0 {
            merged.insert(key.clone(), value.clone());
        }
        MechanismConfig(merged)
    }
}

impl From<Map<String, Value>> for MechanismConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for MechanismConfig {
    type Error = PipelineError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(PipelineError::Configuration(format!(
                "mechanism configuration must be an object, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        name: String,
        #[serde(default)]
        count: u32,
    }

    #[test]
    fn test_merge_replaces_top_level_keys() {
        let base = MechanismConfig::try_from(json!({"name": "a", "count": 1})).unwrap();
        let overrides = MechanismConfig::try_from(json!({"count": 7})).unwrap();

        let merged = base.merged(&overrides);

        assert_eq!(merged.get("name"), Some(&json!("a")));
        assert_eq!(merged.get("count"), Some(&json!(7)));
        // base untouched
        assert_eq!(base.get("count"), Some(&json!(1)));
    }

    #[test]
    fn test_decode_reports_configuration_error() {
        let conf = MechanismConfig::try_from(json!({"name": "a", "bogus": true})).unwrap();
        let err = conf.decode::<Sample>("sample").unwrap_err();
        assert!(err.to_string().contains("configuration error"));
        assert!(err.to_string().contains("sample"));

        let ok: Sample = MechanismConfig::try_from(json!({"name": "b"}))
            .unwrap()
            .decode("sample")
            .unwrap();
        assert_eq!(ok.name, "b");
        assert_eq!(ok.count, 0);
    }

    #[test]
    fn test_null_is_empty() {
        assert!(MechanismConfig::try_from(Value::Null).unwrap().is_empty());
        assert!(MechanismConfig::try_from(json!("nope")).is_err());
    }
}
