//! Request-path error taxonomy.
//!
//! Every mechanism reports failures as a [`PipelineError`]. Composites pass
//! member errors through unchanged in kind; the rule layer may wrap them in
//! [`PipelineError::Annotated`] to record where they came from. Use
//! [`PipelineError::kind`] to classify an error regardless of annotations.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Argument,
    Authentication,
    Authorization,
    CommunicationTimeout,
    Communication,
    Configuration,
    NoRuleMatched,
    NoHandlerApplicable,
    Cancelled,
    Redirect,
    Challenge,
    Internal,
}

impl ErrorKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Argument => "argument",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::CommunicationTimeout => "communication_timeout",
            ErrorKind::Communication => "communication",
            ErrorKind::Configuration => "configuration",
            ErrorKind::NoRuleMatched => "no_rule_matched",
            ErrorKind::NoHandlerApplicable => "no_handler_applicable",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Redirect => "redirect",
            ErrorKind::Challenge => "challenge",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors produced while evaluating a request against a rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Malformed or missing input, e.g. an absent credential header.
    #[error("argument error: {0}")]
    Argument(String),

    /// The credential was rejected.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// The authenticated subject was denied.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// A remote verification call exceeded its deadline.
    #[error("communication timeout error: {0}")]
    CommunicationTimeout(String),

    /// A remote verification call failed at the transport level.
    #[error("communication error: {0}")]
    Communication(String),

    /// Invalid rule or mechanism configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no rule matched {method} {path}")]
    NoRuleMatched { method: String, path: String },

    /// Every member of an error-handler chain declined.
    #[error("no applicable error handler for: {0}")]
    NoHandlerApplicable(Box<PipelineError>),

    /// The request was cancelled by its caller.
    #[error("request cancelled")]
    Cancelled,

    /// Terminal action: the boundary must redirect the client.
    #[error("redirect to {location} ({code})")]
    Redirect { location: Url, code: u16 },

    /// Terminal action: the boundary must answer with an authentication challenge.
    #[error("authentication required (realm \"{realm}\")")]
    Challenge { realm: String },

    #[error("internal error: {0}")]
    Internal(String),

    /// An error annotated with the rule or chain member that produced it.
    #[error("{context}: {source}")]
    Annotated {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// The kind of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Argument(_) => ErrorKind::Argument,
            PipelineError::Authentication(_) => ErrorKind::Authentication,
            PipelineError::Authorization(_) => ErrorKind::Authorization,
            PipelineError::CommunicationTimeout(_) => ErrorKind::CommunicationTimeout,
            PipelineError::Communication(_) => ErrorKind::Communication,
            PipelineError::Configuration(_) => ErrorKind::Configuration,
            PipelineError::NoRuleMatched { .. } => ErrorKind::NoRuleMatched,
            PipelineError::NoHandlerApplicable(_) => ErrorKind::NoHandlerApplicable,
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::Redirect { .. } => ErrorKind::Redirect,
            PipelineError::Challenge { .. } => ErrorKind::Challenge,
            PipelineError::Internal(_) => ErrorKind::Internal,
            PipelineError::Annotated { source, .. } => source.kind(),
        }
    }

    /// The innermost error, with all annotations stripped.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Annotated { source, .. } => source.root(),
            other => other,
        }
    }

    /// Wrap this error with a context label.
    pub fn annotate(self, context: impl Into<String>) -> Self {
        PipelineError::Annotated {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Errors that end a chain immediately instead of falling back.
    ///
    /// A deadline overrun or a cancellation bounds the request's latency, so
    /// no further chain member may be attempted.
    pub fn is_abortive(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::CommunicationTimeout | ErrorKind::Cancelled
        )
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_survives_annotation() {
        let err = PipelineError::Authentication("bad token".into())
            .annotate("authenticator #1")
            .annotate("rule 'r1'");

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(
            err.root(),
            &PipelineError::Authentication("bad token".into())
        );
        assert_eq!(
            err.to_string(),
            "rule 'r1': authenticator #1: authentication error: bad token"
        );
    }

    #[test]
    fn test_abortive_kinds() {
        assert!(PipelineError::Cancelled.is_abortive());
        assert!(PipelineError::CommunicationTimeout("slow".into())
            .annotate("x")
            .is_abortive());
        assert!(!PipelineError::Communication("refused".into()).is_abortive());
        assert!(!PipelineError::Argument("missing".into()).is_abortive());
    }

    #[test]
    fn test_error_kind_deserializes_snake_case() {
        let kinds: Vec<ErrorKind> =
            serde_json::from_str(r#"["authentication", "communication_timeout"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![ErrorKind::Authentication, ErrorKind::CommunicationTimeout]
        );
    }
}
