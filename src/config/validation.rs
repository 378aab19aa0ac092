//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect duplicate prototype ids per mechanism kind
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Mechanism type tags and their configurations are checked when the
//!   prototypes are built, against the registry in use

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{PrototypeConfig, WardenConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &WardenConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "serve.bind_address", &config.serve.bind_address);
    if config.serve.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "serve.request_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.len() < 16 {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be at least 16 characters when the admin API is enabled",
            ));
        }
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if let Some(signer) = &config.signer {
        if signer.secret.len() < 32 {
            errors.push(ValidationError::new("signer.secret", "must be at least 32 bytes"));
        }
    }

    let mechanisms = &config.mechanisms;
    check_prototypes(&mut errors, "mechanisms.authenticators", &mechanisms.authenticators);
    check_prototypes(&mut errors, "mechanisms.authorizers", &mechanisms.authorizers);
    check_prototypes(&mut errors, "mechanisms.mutators", &mechanisms.mutators);
    check_prototypes(&mut errors, "mechanisms.error_handlers", &mechanisms.error_handlers);

    if config.rules.queue_capacity == 0 {
        errors.push(ValidationError::new(
            "rules.queue_capacity",
            "must be greater than zero",
        ));
    }
    if let Some(file) = &config.rules.providers.file {
        if file.paths.is_empty() {
            errors.push(ValidationError::new(
                "rules.providers.file.paths",
                "at least one path is required",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, address: &str) {
    if address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            field,
            format!("'{}' is not a valid socket address", address),
        ));
    }
}

fn check_prototypes(errors: &mut Vec<ValidationError>, field: &str, prototypes: &[PrototypeConfig]) {
    let mut seen = HashSet::new();
    for (idx, prototype) in prototypes.iter().enumerate() {
        if prototype.id.is_empty() {
            errors.push(ValidationError::new(format!("{}[{}].id", field, idx), "must not be empty"));
        } else if !seen.insert(prototype.id.as_str()) {
            errors.push(ValidationError::new(
                format!("{}[{}].id", field, idx),
                format!("duplicate prototype id '{}'", prototype.id),
            ));
        }
        if prototype.kind.is_empty() {
            errors.push(ValidationError::new(format!("{}[{}].type", field, idx), "must not be empty"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SignerConfig;
    use crate::pipeline::MechanismConfig;

    fn prototype(id: &str, kind: &str) -> PrototypeConfig {
        PrototypeConfig {
            id: id.into(),
            kind: kind.into(),
            config: MechanismConfig::new(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&WardenConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = WardenConfig::default();
        config.serve.bind_address = "localhost".into();
        config.admin.enabled = true;
        config.admin.api_key = "short".into();
        config.signer = Some(SignerConfig {
            key_id: "k".into(),
            secret: "too short".into(),
        });
        config.mechanisms.authenticators = vec![prototype("a", "anonymous"), prototype("a", "noop")];
        config.mechanisms.mutators = vec![prototype("", "noop")];

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert_eq!(
            fields,
            vec![
                "serve.bind_address",
                "admin.api_key",
                "signer.secret",
                "mechanisms.authenticators[1].id",
                "mechanisms.mutators[0].id",
            ]
        );
    }
}
