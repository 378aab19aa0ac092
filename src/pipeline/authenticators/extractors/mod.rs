//! Credential extraction.
//!
//! # Data Flow
//! ```text
//! Context (header / cookie / query parameter)
//!     → ExtractStrategy::get_auth_data
//!     → AuthData { value (normalized), raw_value (verbatim) }
//!     → AuthData::apply_to(outbound request) re-emits the raw value
//! ```

mod composite;
mod cookie;
mod header;
mod query;

use std::fmt::Debug;

use axum::http::header::{HeaderName, HeaderValue, COOKIE};
use axum::http::{Request, Uri};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::pipeline::context::Context;

pub use composite::CompositeExtractStrategy;
pub use cookie::CookieValueExtractStrategy;
pub use header::HeaderValueExtractStrategy;
pub use query::QueryParameterExtractStrategy;

/// Pulls credential material out of a request.
pub trait ExtractStrategy: Send + Sync + Debug {
    fn get_auth_data(&self, ctx: &dyn Context) -> Result<AuthData, PipelineError>;
}

/// Where a credential was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDataSource {
    Header(String),
    Cookie(String),
    QueryParameter(String),
}

/// Extracted credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthData {
    source: AuthDataSource,
    raw_value: String,
    value: String,
}

impl AuthData {
    pub fn new(source: AuthDataSource, raw_value: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            source,
            raw_value: raw_value.into(),
            value: value.into(),
        }
    }

    /// Normalized credential used for verification.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The credential exactly as it appeared on the wire.
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    pub fn source(&self) -> &AuthDataSource {
        &self.source
    }

    /// Re-emit the credential onto an outbound request, in the place it was
    /// extracted from and with its original raw value.
    pub fn apply_to<B>(&self, req: &mut Request<B>) -> Result<(), PipelineError> {
        match &self.source {
            AuthDataSource::Header(name) => {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| PipelineError::Internal(format!("invalid header name '{}': {}", name, e)))?;
                req.headers_mut().append(name, header_value(&self.raw_value)?);
            }
            AuthDataSource::Cookie(name) => {
                let cookie = format!("{}={}", name, self.raw_value);
                req.headers_mut().append(COOKIE, header_value(&cookie)?);
            }
            AuthDataSource::QueryParameter(name) => {
                let pair = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair(name, &self.raw_value)
                    .finish();
                let uri = req.uri().clone();
                let path_and_query = match uri.query() {
                    Some(query) if !query.is_empty() => {
                        format!("{}?{}&{}", uri.path(), query, pair)
                    }
                    _ => format!("{}?{}", uri.path(), pair),
                };
                let mut parts = uri.into_parts();
                parts.path_and_query = Some(path_and_query.parse().map_err(|e| {
                    PipelineError::Internal(format!("failed to append query parameter: {}", e))
                })?);
                *req.uri_mut() = Uri::from_parts(parts).map_err(|e| {
                    PipelineError::Internal(format!("failed to append query parameter: {}", e))
                })?;
            }
        }
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, PipelineError> {
    HeaderValue::from_str(value)
        .map_err(|e| PipelineError::Internal(format!("invalid header value: {}", e)))
}

/// Declarative description of one extraction strategy.
///
/// ```toml
/// authentication_data_source = [
///   { header = "Authorization", schema = "Bearer" },
///   { cookie = "session" },
///   { query_parameter = "access_token" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractorConfig {
    Header {
        header: String,
        #[serde(default)]
        schema: Option<String>,
    },
    Cookie {
        cookie: String,
    },
    QueryParameter {
        query_parameter: String,
    },
}

impl ExtractorConfig {
    fn build(&self) -> Box<dyn ExtractStrategy> {
        match self {
            ExtractorConfig::Header { header, schema } => Box::new(HeaderValueExtractStrategy {
                name: header.clone(),
                schema: schema.clone(),
            }),
            ExtractorConfig::Cookie { cookie } => Box::new(CookieValueExtractStrategy {
                name: cookie.clone(),
            }),
            ExtractorConfig::QueryParameter { query_parameter } => {
                Box::new(QueryParameterExtractStrategy {
                    name: query_parameter.clone(),
                })
            }
        }
    }
}

/// Build the strategy chain described by `configs`.
pub fn build_strategy(configs: &[ExtractorConfig]) -> Result<CompositeExtractStrategy, PipelineError> {
    CompositeExtractStrategy::new(configs.iter().map(ExtractorConfig::build).collect())
}
