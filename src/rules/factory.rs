//! Builds rules from their configuration against the known prototypes.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::Method;
use url::Url;

use crate::error::PipelineError;
use crate::pipeline::authenticators::CompositeAuthenticator;
use crate::pipeline::authorizers::CompositeAuthorizer;
use crate::pipeline::errorhandlers::{CompositeErrorHandler, DefaultErrorHandler, ErrorHandler};
use crate::pipeline::mutators::CompositeMutator;
use crate::pipeline::PrototypeRepository;
use crate::rules::config::{MechanismRef, RuleConfig};
use crate::rules::error::RuleValidationError;
use crate::rules::index::RuleSet;
use crate::rules::pattern::PathPattern;
use crate::rules::rule::Rule;

#[derive(Debug, Clone)]
pub struct RuleFactory {
    prototypes: Arc<PrototypeRepository>,
    default_error_handler: Arc<dyn ErrorHandler>,
}

impl RuleFactory {
    pub fn new(prototypes: Arc<PrototypeRepository>) -> Self {
        Self {
            prototypes,
            default_error_handler: Arc::new(DefaultErrorHandler),
        }
    }

    /// Validate and build a whole rule set.
    ///
    /// All-or-nothing: every problem in every rule is reported and no rule
    /// set is produced unless all rules are valid.
    pub fn create_rule_set(
        &self,
        provider: &str,
        version: &str,
        configs: &[RuleConfig],
    ) -> Result<RuleSet, Vec<RuleValidationError>> {
        let mut errors = Vec::new();
        let mut rules = Vec::with_capacity(configs.len());
        let mut seen = HashSet::new();

        for (position, config) in configs.iter().enumerate() {
            if config.id.is_empty() {
                errors.push(RuleValidationError::EmptyId { position });
                continue;
            }
            if !seen.insert(config.id.as_str()) {
                errors.push(RuleValidationError::DuplicateId {
                    id: config.id.clone(),
                });
                continue;
            }
            match self.create_rule(provider, position, config) {
                Ok(rule) => rules.push(Arc::new(rule)),
                Err(mut rule_errors) => errors.append(&mut rule_errors),
            }
        }

        if errors.is_empty() {
            Ok(RuleSet::new(provider, version, rules))
        } else {
            Err(errors)
        }
    }

    /// Build one rule, reporting every problem found in it.
    pub fn create_rule(
        &self,
        provider: &str,
        position: usize,
        config: &RuleConfig,
    ) -> Result<Rule, Vec<RuleValidationError>> {
        let id = &config.id;
        let mut errors = Vec::new();

        let pattern = PathPattern::parse(&config.matcher.path)
            .map_err(|source| errors.push(RuleValidationError::Pattern { id: id.clone(), source }))
            .ok();

        let mut methods = Vec::with_capacity(config.matcher.methods.len());
        for method in &config.matcher.methods {
            match Method::from_bytes(method.to_ascii_uppercase().as_bytes()) {
                Ok(m) if !methods.contains(&m) => methods.push(m),
                Ok(_) => {}
                Err(_) => errors.push(RuleValidationError::Method {
                    id: id.clone(),
                    method: method.clone(),
                }),
            }
        }

        let upstream = match &config.upstream {
            None => None,
            Some(raw) => match Url::parse(raw) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(url),
                Ok(url) => {
                    errors.push(RuleValidationError::Upstream {
                        id: id.clone(),
                        upstream: raw.clone(),
                        reason: format!("unsupported scheme '{}'", url.scheme()),
                    });
                    None
                }
                Err(e) => {
                    errors.push(RuleValidationError::Upstream {
                        id: id.clone(),
                        upstream: raw.clone(),
                        reason: e.to_string(),
                    });
                    None
                }
            },
        };

        let mechanism_error =
            |source: PipelineError| RuleValidationError::Mechanism { id: id.clone(), source };

        let authenticator = self
            .resolve(&config.authenticators, "authenticator", |r| {
                self.prototypes.authenticator(&r.name)?.with_config(&r.config)
            })
            .and_then(CompositeAuthenticator::new)
            .map_err(|e| errors.push(mechanism_error(e)))
            .ok();

        let authorizer = self
            .resolve(&config.authorizers, "authorizer", |r| {
                self.prototypes.authorizer(&r.name)?.with_config(&r.config)
            })
            .map(CompositeAuthorizer::new)
            .map_err(|e| errors.push(mechanism_error(e)))
            .ok();

        let mutator = self
            .resolve(&config.mutators, "mutator", |r| {
                self.prototypes.mutator(&r.name)?.with_config(&r.config)
            })
            .map(CompositeMutator::new)
            .map_err(|e| errors.push(mechanism_error(e)))
            .ok();

        let error_handler = if config.on_error.is_empty() {
            CompositeErrorHandler::new(vec![self.default_error_handler.clone()])
        } else {
            self.resolve(&config.on_error, "error handler", |r| {
                self.prototypes.error_handler(&r.name)?.with_config(&r.config)
            })
            .and_then(CompositeErrorHandler::new)
        };
        let error_handler = error_handler.map_err(|e| errors.push(mechanism_error(e))).ok();

        match (pattern, authenticator, authorizer, mutator, error_handler) {
            (Some(pattern), Some(authenticator), Some(authorizer), Some(mutator), Some(error_handler))
                if errors.is_empty() =>
            {
                Ok(Rule {
                    id: id.clone(),
                    provider: provider.to_string(),
                    position,
                    methods,
                    pattern,
                    authenticator,
                    authorizer,
                    mutator,
                    error_handler,
                    upstream,
                })
            }
            _ => Err(errors),
        }
    }

    fn resolve<T: ?Sized, F>(
        &self,
        refs: &[MechanismRef],
        mechanism: &str,
        build: F,
    ) -> Result<Vec<Arc<T>>, PipelineError>
    where
        F: Fn(&MechanismRef) -> Result<Arc<T>, PipelineError>,
    {
        refs.iter()
            .enumerate()
            .map(|(idx, r)| {
                build(r).map_err(|e| e.annotate(format!("{} #{} '{}'", mechanism, idx, r.name)))
            })
            .collect()
    }
}
