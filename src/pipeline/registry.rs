//! Explicit registry of mechanism constructors, keyed by type tag.
//!
//! Startup builds one registry (usually [`MechanismRegistry::with_defaults`])
//! and hands it to the prototype repository. Nothing registers itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::pipeline::authenticators::{
    AnonymousAuthenticator, Authenticator, BasicAuthAuthenticator, GenericAuthenticator,
    NoopAuthenticator, UnauthorizedAuthenticator,
};
use crate::pipeline::authorizers::{
    AllowAuthorizer, Authorizer, DenyAuthorizer, SubjectAttributesAuthorizer,
};
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::errorhandlers::{
    DefaultErrorHandler, ErrorHandler, RedirectErrorHandler, WwwAuthenticateErrorHandler,
};
use crate::pipeline::mutators::{CookieMutator, HeaderMutator, JwtMutator, Mutator, NoopMutator};

pub type AuthenticatorFactory =
    fn(&MechanismConfig) -> Result<Arc<dyn Authenticator>, PipelineError>;
pub type AuthorizerFactory = fn(&MechanismConfig) -> Result<Arc<dyn Authorizer>, PipelineError>;
pub type MutatorFactory = fn(&MechanismConfig) -> Result<Arc<dyn Mutator>, PipelineError>;
pub type ErrorHandlerFactory =
    fn(&MechanismConfig) -> Result<Arc<dyn ErrorHandler>, PipelineError>;

#[derive(Debug, Clone, Default)]
pub struct MechanismRegistry {
    authenticators: BTreeMap<String, AuthenticatorFactory>,
    authorizers: BTreeMap<String, AuthorizerFactory>,
    mutators: BTreeMap<String, MutatorFactory>,
    error_handlers: BTreeMap<String, ErrorHandlerFactory>,
}

impl MechanismRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in mechanism type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register_authenticator("anonymous", |c| Ok(Arc::new(AnonymousAuthenticator::new(c)?)));
        registry.register_authenticator("noop", |c| Ok(Arc::new(NoopAuthenticator::new(c)?)));
        registry.register_authenticator("unauthorized", |c| {
            Ok(Arc::new(UnauthorizedAuthenticator::new(c)?))
        });
        registry.register_authenticator("basic_auth", |c| Ok(Arc::new(BasicAuthAuthenticator::new(c)?)));
        registry.register_authenticator("generic", |c| Ok(Arc::new(GenericAuthenticator::new(c)?)));

        registry.register_authorizer("allow", |c| Ok(Arc::new(AllowAuthorizer::new(c)?)));
        registry.register_authorizer("deny", |c| Ok(Arc::new(DenyAuthorizer::new(c)?)));
        registry.register_authorizer("subject_attributes", |c| {
            Ok(Arc::new(SubjectAttributesAuthorizer::new(c)?))
        });

        registry.register_mutator("noop", |c| Ok(Arc::new(NoopMutator::new(c)?)));
        registry.register_mutator("header", |c| Ok(Arc::new(HeaderMutator::new(c)?)));
        registry.register_mutator("cookie", |c| Ok(Arc::new(CookieMutator::new(c)?)));
        registry.register_mutator("jwt", |c| Ok(Arc::new(JwtMutator::new(c)?)));

        registry.register_error_handler("default", |c| Ok(Arc::new(DefaultErrorHandler::new(c)?)));
        registry.register_error_handler("redirect", |c| Ok(Arc::new(RedirectErrorHandler::new(c)?)));
        registry.register_error_handler("www_authenticate", |c| {
            Ok(Arc::new(WwwAuthenticateErrorHandler::new(c)?))
        });

        registry
    }

    /// Register (or replace) an authenticator type.
    pub fn register_authenticator(&mut self, kind: &str, factory: AuthenticatorFactory) {
        self.authenticators.insert(kind.to_string(), factory);
    }

    pub fn register_authorizer(&mut self, kind: &str, factory: AuthorizerFactory) {
        self.authorizers.insert(kind.to_string(), factory);
    }

    pub fn register_mutator(&mut self, kind: &str, factory: MutatorFactory) {
        self.mutators.insert(kind.to_string(), factory);
    }

    pub fn register_error_handler(&mut self, kind: &str, factory: ErrorHandlerFactory) {
        self.error_handlers.insert(kind.to_string(), factory);
    }

    pub fn new_authenticator(
        &self,
        kind: &str,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Authenticator>, PipelineError> {
        let factory = self.authenticators.get(kind).ok_or_else(|| unknown("authenticator", kind))?;
        factory(config)
    }

    pub fn new_authorizer(
        &self,
        kind: &str,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Authorizer>, PipelineError> {
        let factory = self.authorizers.get(kind).ok_or_else(|| unknown("authorizer", kind))?;
        factory(config)
    }

    pub fn new_mutator(
        &self,
        kind: &str,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Mutator>, PipelineError> {
        let factory = self.mutators.get(kind).ok_or_else(|| unknown("mutator", kind))?;
        factory(config)
    }

    pub fn new_error_handler(
        &self,
        kind: &str,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn ErrorHandler>, PipelineError> {
        let factory = self.error_handlers.get(kind).ok_or_else(|| unknown("error handler", kind))?;
        factory(config)
    }

    /// Registered authenticator type tags, sorted.
    pub fn authenticator_types(&self) -> Vec<&str> {
        self.authenticators.keys().map(String::as_str).collect()
    }
}

fn unknown(mechanism: &str, kind: &str) -> PipelineError {
    PipelineError::Configuration(format!("unsupported {} type '{}'", mechanism, kind))
}
