//! Rule-set document parsing.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::config::RuleConfig;

/// A rule-set file.
///
/// ```toml
/// version = "2024-06-01"
///
/// [[rules]]
/// id = "public"
/// match = { path = "/public/**" }
/// authenticators = [{ name = "anon" }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetDocument {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// Format by file extension; `None` for files that are not rule sets.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(Format::Json),
            Some("toml") => Some(Format::Toml),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON rule set: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML rule set: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Parse a document. Blank content is an empty rule set.
pub fn parse(format: Format, content: &str) -> Result<RuleSetDocument, ParseError> {
    if content.trim().is_empty() {
        return Ok(RuleSetDocument::default());
    }

    Ok(match format {
        Format::Json => serde_json::from_str(content)?,
        Format::Toml => toml::from_str(content)?,
    })
}
