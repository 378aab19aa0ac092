//! Request identification and target reconstruction.
//!
//! # Responsibilities
//! - Read the request ID assigned by the request-id layer
//! - Reconstruct the method and URL the client actually used, either from
//!   the request line and `Host`, or from `X-Forwarded-*` headers set by a
//!   trusted front proxy
//!
//! # Design Decisions
//! - Forwarded headers are ignored unless explicitly trusted
//! - A target that cannot be rebuilt is an `Argument` error, rendered as 400

use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, Method};
use url::Url;

use crate::error::PipelineError;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_FORWARDED_METHOD: HeaderName = HeaderName::from_static("x-forwarded-method");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_URI: HeaderName = HeaderName::from_static("x-forwarded-uri");

/// Request ID set by `SetRequestIdLayer`, `"unknown"` if absent.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

fn header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Method and absolute URL of the request as seen by the client.
pub fn effective_target(parts: &Parts, trust_forwarded: bool) -> Result<(Method, Url), PipelineError> {
    let forwarded = |name: &HeaderName| {
        if trust_forwarded {
            header(&parts.headers, name)
        } else {
            None
        }
    };

    let method = match forwarded(&X_FORWARDED_METHOD) {
        Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
            PipelineError::Argument(format!("invalid forwarded method '{}'", method))
        })?,
        None => parts.method.clone(),
    };

    let scheme = forwarded(&X_FORWARDED_PROTO)
        .or_else(|| parts.uri.scheme_str())
        .unwrap_or("http");

    let host = forwarded(&X_FORWARDED_HOST)
        .or_else(|| header(&parts.headers, &HOST))
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
        .ok_or_else(|| PipelineError::Argument("request has no host".into()))?;

    let path = match forwarded(&X_FORWARDED_URI) {
        Some(uri) => uri.to_string(),
        None => parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string()),
    };
    if !path.starts_with('/') {
        return Err(PipelineError::Argument(format!("invalid request path '{}'", path)));
    }

    let url = Url::parse(&format!("{}://{}{}", scheme, host, path))
        .map_err(|e| PipelineError::Argument(format!("invalid request url: {}", e)))?;

    Ok((method, url))
}
