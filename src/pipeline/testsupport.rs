//! Test doubles shared by the pipeline and rules unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::Method;
use url::Url;

use crate::error::PipelineError;
use crate::pipeline::authenticators::Authenticator;
use crate::pipeline::authorizers::Authorizer;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::{AppContext, Context};
use crate::pipeline::errorhandlers::ErrorHandler;
use crate::pipeline::keys::KeyMaterial;
use crate::pipeline::mutators::Mutator;
use crate::pipeline::subject::Subject;

pub fn test_error() -> PipelineError {
    PipelineError::Internal("test purpose".into())
}

/// In-memory [`Context`] that records every write.
#[derive(Debug)]
pub struct MockContext {
    app: AppContext,
    method: Method,
    url: Url,
    headers: HashMap<String, String>,
    upstream_headers: Mutex<Vec<(String, String)>>,
    response_cookies: Mutex<Vec<(String, String)>>,
    error: Mutex<Option<PipelineError>>,
}

impl MockContext {
    pub fn new() -> Self {
        Self {
            app: AppContext::background(),
            method: Method::GET,
            url: Url::parse("http://app.local/").expect("static url"),
            headers: HashMap::new(),
            upstream_headers: Mutex::new(Vec::new()),
            response_cookies: Mutex::new(Vec::new()),
            error: Mutex::new(None),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Url::parse(url).expect("valid test url");
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_app_context(mut self, app: AppContext) -> Self {
        self.app = app;
        self
    }

    pub fn upstream_headers(&self) -> Vec<(String, String)> {
        self.upstream_headers.lock().unwrap().clone()
    }

    pub fn response_cookies(&self) -> Vec<(String, String)> {
        self.response_cookies.lock().unwrap().clone()
    }
}

impl Context for MockContext {
    fn app_context(&self) -> &AppContext {
        &self.app
    }

    fn request_method(&self) -> &Method {
        &self.method
    }

    fn request_url(&self) -> &Url {
        &self.url
    }

    fn request_header(&self, name: &str) -> Option<String> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn add_upstream_header(&self, name: &str, value: &str) {
        self.upstream_headers
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
    }

    fn add_response_cookie(&self, name: &str, value: &str) {
        self.response_cookies
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
    }

    fn set_pipeline_error(&self, err: PipelineError) {
        *self.error.lock().unwrap() = Some(err);
    }

    fn pipeline_error(&self) -> Option<PipelineError> {
        self.error.lock().unwrap().clone()
    }
}

/// Authenticator returning a canned result and counting its invocations.
#[derive(Debug)]
pub struct MockAuthenticator {
    result: Result<Subject, PipelineError>,
    calls: AtomicUsize,
}

impl MockAuthenticator {
    pub fn succeeding(sub: Subject) -> Arc<Self> {
        Arc::new(Self { result: Ok(sub), calls: AtomicUsize::new(0) })
    }

    pub fn failing(err: PipelineError) -> Arc<Self> {
        Arc::new(Self { result: Err(err), calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(&self, _ctx: &dyn Context) -> Result<Subject, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Authenticator>, PipelineError> {
        if config.is_empty() {
            return Ok(self);
        }
        Ok(Arc::new(Self {
            result: self.result.clone(),
            calls: AtomicUsize::new(0),
        }))
    }
}

#[derive(Debug)]
pub struct MockAuthorizer {
    result: Result<(), PipelineError>,
    calls: AtomicUsize,
}

impl MockAuthorizer {
    pub fn allowing() -> Arc<Self> {
        Arc::new(Self { result: Ok(()), calls: AtomicUsize::new(0) })
    }

    pub fn denying(err: PipelineError) -> Arc<Self> {
        Arc::new(Self { result: Err(err), calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authorizer for MockAuthorizer {
    async fn authorize(&self, _ctx: &dyn Context, _sub: &Subject) -> Result<(), PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn with_config(
        self: Arc<Self>,
        _config: &MechanismConfig,
    ) -> Result<Arc<dyn Authorizer>, PipelineError> {
        Ok(self)
    }
}

#[derive(Debug)]
pub struct MockMutator {
    result: Result<(), PipelineError>,
    calls: AtomicUsize,
}

impl MockMutator {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self { result: Ok(()), calls: AtomicUsize::new(0) })
    }

    pub fn failing(err: PipelineError) -> Arc<Self> {
        Arc::new(Self { result: Err(err), calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mutator for MockMutator {
    async fn mutate(
        &self,
        _ctx: &dyn Context,
        _sub: &Subject,
        _key: Option<&KeyMaterial>,
    ) -> Result<(), PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn with_config(
        self: Arc<Self>,
        _config: &MechanismConfig,
    ) -> Result<Arc<dyn Mutator>, PipelineError> {
        Ok(self)
    }
}

/// Error handler with a canned `(handled, error)` outcome.
#[derive(Debug)]
pub struct MockErrorHandler {
    result: Result<bool, PipelineError>,
    calls: AtomicUsize,
}

impl MockErrorHandler {
    pub fn declining() -> Arc<Self> {
        Arc::new(Self { result: Ok(false), calls: AtomicUsize::new(0) })
    }

    pub fn handling() -> Arc<Self> {
        Arc::new(Self { result: Ok(true), calls: AtomicUsize::new(0) })
    }

    pub fn failing(err: PipelineError) -> Arc<Self> {
        Arc::new(Self { result: Err(err), calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ErrorHandler for MockErrorHandler {
    async fn execute(&self, ctx: &dyn Context, cause: &PipelineError) -> Result<bool, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(true) = self.result {
            ctx.set_pipeline_error(cause.clone());
        }
        self.result.clone()
    }

    fn with_config(
        self: Arc<Self>,
        _config: &MechanismConfig,
    ) -> Result<Arc<dyn ErrorHandler>, PipelineError> {
        Ok(self)
    }
}
