//! Named, shared mechanism prototypes.
//!
//! Built once at startup from the `[mechanisms]` configuration. Rules refer
//! to prototypes by id and may derive a tuned instance with
//! `with_config`; the prototype itself never changes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::{MechanismsConfig, PrototypeConfig};
use crate::error::PipelineError;
use crate::pipeline::authenticators::Authenticator;
use crate::pipeline::authorizers::Authorizer;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::errorhandlers::ErrorHandler;
use crate::pipeline::mutators::Mutator;
use crate::pipeline::registry::MechanismRegistry;

#[derive(Debug, Clone, Default)]
pub struct PrototypeRepository {
    authenticators: HashMap<String, Arc<dyn Authenticator>>,
    authorizers: HashMap<String, Arc<dyn Authorizer>>,
    mutators: HashMap<String, Arc<dyn Mutator>>,
    error_handlers: HashMap<String, Arc<dyn ErrorHandler>>,
}

impl PrototypeRepository {
    pub fn build(
        registry: &MechanismRegistry,
        config: &MechanismsConfig,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            authenticators: build_kind("authenticator", &config.authenticators, |kind, conf| {
                registry.new_authenticator(kind, conf)
            })?,
            authorizers: build_kind("authorizer", &config.authorizers, |kind, conf| {
                registry.new_authorizer(kind, conf)
            })?,
            mutators: build_kind("mutator", &config.mutators, |kind, conf| {
                registry.new_mutator(kind, conf)
            })?,
            error_handlers: build_kind("error handler", &config.error_handlers, |kind, conf| {
                registry.new_error_handler(kind, conf)
            })?,
        })
    }

    pub fn authenticator(&self, id: &str) -> Result<Arc<dyn Authenticator>, PipelineError> {
        lookup(&self.authenticators, "authenticator", id)
    }

    pub fn authorizer(&self, id: &str) -> Result<Arc<dyn Authorizer>, PipelineError> {
        lookup(&self.authorizers, "authorizer", id)
    }

    pub fn mutator(&self, id: &str) -> Result<Arc<dyn Mutator>, PipelineError> {
        lookup(&self.mutators, "mutator", id)
    }

    pub fn error_handler(&self, id: &str) -> Result<Arc<dyn ErrorHandler>, PipelineError> {
        lookup(&self.error_handlers, "error handler", id)
    }

    /// Total number of prototypes across all kinds.
    pub fn len(&self) -> usize {
        self.authenticators.len() + self.authorizers.len() + self.mutators.len() + self.error_handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn build_kind<T: ?Sized, F>(
    mechanism: &str,
    prototypes: &[PrototypeConfig],
    build: F,
) -> Result<HashMap<String, Arc<T>>, PipelineError>
where
    F: Fn(&str, &MechanismConfig) -> Result<Arc<T>, PipelineError>,
{
    let mut built = HashMap::with_capacity(prototypes.len());
    for prototype in prototypes {
        if built.contains_key(&prototype.id) {
            return Err(PipelineError::Configuration(format!(
                "duplicate {} prototype '{}'",
                mechanism, prototype.id
            )));
        }
        let instance = build(&prototype.kind, &prototype.config)
            .map_err(|e| e.annotate(format!("{} prototype '{}'", mechanism, prototype.id)))?;
        tracing::debug!(id = %prototype.id, kind = %prototype.kind, "Created {} prototype", mechanism);
        built.insert(prototype.id.clone(), instance);
    }
    Ok(built)
}

fn lookup<T: ?Sized>(
    prototypes: &HashMap<String, Arc<T>>,
    mechanism: &str,
    id: &str,
) -> Result<Arc<T>, PipelineError> {
    prototypes.get(id).cloned().ok_or_else(|| {
        PipelineError::Configuration(format!("no {} prototype named '{}'", mechanism, id))
    })
}
