//! Remote endpoints called by mechanisms.
//!
//! # Responsibilities
//! - Build the outbound request (method, URL, static headers, credential)
//! - Send it with an optional per-endpoint timeout
//! - Abort when the request's `AppContext` is cancelled or expires
//!
//! # Design Decisions
//! - No retries; retry policy belongs to the caller
//! - Transport timeouts map to `CommunicationTimeout`, other transport
//!   failures to `Communication`; status handling is left to the caller

use std::collections::BTreeMap;
use std::time::Duration;

use axum::http::header::{HeaderName, HeaderValue, ACCEPT};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::PipelineError;
use crate::pipeline::authenticators::extractors::AuthData;
use crate::pipeline::context::AppContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub url: Url,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Upper bound for a single call, in addition to the request deadline.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Response of an endpoint call.
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Endpoint {
    url: Url,
    method: Method,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl Endpoint {
    pub fn new(config: &EndpointConfig) -> Result<Self, PipelineError> {
        let method = Method::from_bytes(config.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| {
                PipelineError::Configuration(format!("invalid endpoint method '{}': {}", config.method, e))
            })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                PipelineError::Configuration(format!("invalid endpoint header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                PipelineError::Configuration(format!("invalid endpoint header value: {}", e))
            })?;
            headers.append(name, value);
        }
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PipelineError::Configuration(format!("failed to create http client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            method,
            headers,
            timeout: config.timeout_ms.map(Duration::from_millis),
            client,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Build the request without sending it.
    pub fn create_request(&self, auth_data: Option<&AuthData>) -> Result<Request<Vec<u8>>, PipelineError> {
        let mut req = Request::builder()
            .method(self.method.clone())
            .uri(self.url.as_str())
            .body(Vec::new())
            .map_err(|e| PipelineError::Internal(format!("failed to create endpoint request: {}", e)))?;

        req.headers_mut().extend(self.headers.clone());
        if let Some(auth_data) = auth_data {
            auth_data.apply_to(&mut req)?;
        }

        Ok(req)
    }

    /// Send the request under the given scope.
    pub async fn send_request(
        &self,
        app: &AppContext,
        auth_data: Option<&AuthData>,
    ) -> Result<EndpointResponse, PipelineError> {
        let req = self.create_request(auth_data)?;
        let mut req = reqwest::Request::try_from(req)
            .map_err(|e| PipelineError::Internal(format!("failed to create endpoint request: {}", e)))?;
        *req.timeout_mut() = self.timeout;

        tracing::debug!(method = %self.method, url = %self.url, "Calling endpoint");

        app.run(&format!("call to {}", self.url), async {
            let response = self.client.execute(req).await.map_err(|e| self.transport_error(e))?;
            let status = response.status();
            let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
            Ok(EndpointResponse {
                status,
                body: body.to_vec(),
            })
        })
        .await
    }

    fn transport_error(&self, err: reqwest::Error) -> PipelineError {
        if err.is_timeout() {
            PipelineError::CommunicationTimeout(format!("call to {} timed out", self.url))
        } else {
            PipelineError::Communication(format!("call to {} failed: {}", self.url, err))
        }
    }
}
