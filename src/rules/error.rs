//! Rule-set reconciliation errors.
//!
//! These never reach the request path; a rejected rule set leaves the
//! provider's previous rules active.

use thiserror::Error;

use crate::error::PipelineError;
use crate::rules::pattern::PatternError;

/// Why a single rule is invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleValidationError {
    #[error("rule at position {position} has an empty id")]
    EmptyId { position: usize },

    #[error("rule '{id}' is defined more than once")]
    DuplicateId { id: String },

    #[error("rule '{id}': {source}")]
    Pattern {
        id: String,
        #[source]
        source: PatternError,
    },

    #[error("rule '{id}': invalid method '{method}'")]
    Method { id: String, method: String },

    #[error("rule '{id}': {source}")]
    Mechanism {
        id: String,
        #[source]
        source: PipelineError,
    },

    #[error("rule '{id}': invalid upstream '{upstream}': {reason}")]
    Upstream {
        id: String,
        upstream: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("rule set from provider '{provider}' rejected: {}", join(.errors))]
    Invalid {
        provider: String,
        errors: Vec<RuleValidationError>,
    },

    #[error("{change} event from provider '{provider}' carries no rule set")]
    MissingRuleSet { provider: String, change: String },

    #[error("event has an empty provider name")]
    EmptyProvider,
}

fn join(errors: &[RuleValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
