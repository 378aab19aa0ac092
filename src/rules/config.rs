//! Rule configuration as delivered by providers.

use serde::{Deserialize, Serialize};

use crate::pipeline::MechanismConfig;

/// One rule.
///
/// ```json
/// {
///   "id": "users-api",
///   "match": { "methods": ["GET", "POST"], "path": "/api/users/**" },
///   "authenticators": [{ "name": "bearer" }, { "name": "anon" }],
///   "authorizers": [{ "name": "admins", "config": { "require": { "group": "admin" } } }],
///   "mutators": [{ "name": "user_header" }],
///   "on_error": [{ "name": "login_redirect" }],
///   "upstream": "http://users.internal:8080"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub id: String,

    #[serde(rename = "match")]
    pub matcher: MatchConfig,

    #[serde(default)]
    pub authenticators: Vec<MechanismRef>,

    #[serde(default)]
    pub authorizers: Vec<MechanismRef>,

    #[serde(default)]
    pub mutators: Vec<MechanismRef>,

    /// Empty means the built-in default handler.
    #[serde(default)]
    pub on_error: Vec<MechanismRef>,

    #[serde(default)]
    pub upstream: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchConfig {
    /// Empty means any method.
    #[serde(default)]
    pub methods: Vec<String>,

    pub path: String,
}

/// Reference to a named prototype with an optional override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MechanismRef {
    pub name: String,

    #[serde(default)]
    pub config: MechanismConfig,
}

impl MechanismRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: MechanismConfig::new(),
        }
    }
}
