//! [`Context`] implementation backed by an incoming HTTP request.

use std::sync::{Mutex, PoisonError};

use axum::http::request::Parts;
use axum::http::{HeaderMap, Method};
use url::Url;

use crate::error::PipelineError;
use crate::http::request::effective_target;
use crate::pipeline::{AppContext, Context};

/// Request view handed to the mechanisms, plus the outputs they produced.
#[derive(Debug)]
pub struct RequestContext {
    app: AppContext,
    method: Method,
    url: Url,
    headers: HeaderMap,
    upstream_headers: Mutex<Vec<(String, String)>>,
    response_cookies: Mutex<Vec<(String, String)>>,
    error: Mutex<Option<PipelineError>>,
}

impl RequestContext {
    pub fn new(app: AppContext, method: Method, url: Url, headers: HeaderMap) -> Self {
        Self {
            app,
            method,
            url,
            headers,
            upstream_headers: Mutex::new(Vec::new()),
            response_cookies: Mutex::new(Vec::new()),
            error: Mutex::new(None),
        }
    }

    pub fn from_parts(parts: &Parts, app: AppContext, trust_forwarded: bool) -> Result<Self, PipelineError> {
        let (method, url) = effective_target(parts, trust_forwarded)?;
        Ok(Self::new(app, method, url, parts.headers.clone()))
    }

    /// Headers the mutators want on the upstream request, in write order.
    pub fn upstream_headers(&self) -> Vec<(String, String)> {
        self.upstream_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cookies the mutators want on the client response, in write order.
    pub fn response_cookies(&self) -> Vec<(String, String)> {
        self.response_cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Context for RequestContext {
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
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn add_upstream_header(&self, name: &str, value: &str) {
        self.upstream_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), value.to_string()));
    }

    fn add_response_cookie(&self, name: &str, value: &str) {
        self.response_cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), value.to_string()));
    }

    fn set_pipeline_error(&self, err: PipelineError) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    fn pipeline_error(&self) -> Option<PipelineError> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{COOKIE, HOST};
    use axum::http::Request;

    fn context() -> RequestContext {
        let (parts, _) = Request::builder()
            .uri("/profile?token=abc&empty=")
            .header(HOST, "app.local")
            .header("X-Api-Key", "k1")
            .header(COOKIE, "theme=dark; session=s3cr3t")
            .body(())
            .unwrap()
            .into_parts();
        RequestContext::from_parts(&parts, AppContext::background(), false).unwrap()
    }

    #[test]
    fn test_request_accessors() {
        let ctx = context();

        assert_eq!(ctx.request_method(), Method::GET);
        assert_eq!(ctx.request_url().as_str(), "http://app.local/profile?token=abc&empty=");
        assert_eq!(ctx.request_header("x-api-key").as_deref(), Some("k1"));
        assert_eq!(ctx.request_header("X-API-KEY").as_deref(), Some("k1"));
        assert_eq!(ctx.request_cookie("session").as_deref(), Some("s3cr3t"));
        assert_eq!(ctx.request_query_parameter("token").as_deref(), Some("abc"));
        assert_eq!(ctx.request_query_parameter("empty"), None);
        assert_eq!(ctx.request_header("missing"), None);
    }

    #[test]
    fn test_outputs_are_recorded() {
        let ctx = context();

        ctx.add_upstream_header("X-User", "alice");
        ctx.add_upstream_header("X-User", "bob");
        ctx.add_response_cookie("sid", "1");
        ctx.set_pipeline_error(PipelineError::Authorization("no".into()));

        assert_eq!(
            ctx.upstream_headers(),
            vec![
                ("X-User".to_string(), "alice".to_string()),
                ("X-User".to_string(), "bob".to_string())
            ]
        );
        assert_eq!(ctx.response_cookies(), vec![("sid".to_string(), "1".to_string())]);
        assert_eq!(
            ctx.pipeline_error(),
            Some(PipelineError::Authorization("no".into()))
        );
    }
}
