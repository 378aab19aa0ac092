//! Rendering decisions and pipeline errors as HTTP responses.
//!
//! # Responsibilities
//! - Map an error kind to its status code
//! - Render terminal actions (redirects, authentication challenges)
//! - Copy mutator output onto the response (headers, cookies)
//!
//! # Design Decisions
//! - Bodies are empty unless verbose errors are enabled; verbose bodies
//!   carry the error kind and message as JSON
//! - Annotations never change the status, only the verbose message

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue, LOCATION, SET_COOKIE, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::{ErrorKind, PipelineError};
use crate::pipeline::mutators::is_cookie_octet;

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// Status code for an error that is not a terminal action.
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err.root() {
        PipelineError::NoHandlerApplicable(cause) => return status_for(cause),
        PipelineError::Redirect { code, .. } => {
            return StatusCode::from_u16(*code).unwrap_or(StatusCode::FOUND)
        }
        _ => {}
    }

    match err.kind() {
        ErrorKind::Argument => StatusCode::BAD_REQUEST,
        ErrorKind::Authentication | ErrorKind::Challenge => StatusCode::UNAUTHORIZED,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NoRuleMatched => StatusCode::NOT_FOUND,
        ErrorKind::CommunicationTimeout | ErrorKind::Communication => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render the error the pipeline ended with.
pub fn error_response(err: &PipelineError, verbose: bool) -> Response {
    let status = status_for(err);

    let mut response = if verbose {
        let body = ErrorBody {
            code: err.kind().as_str(),
            message: err.to_string(),
        };
        (status, Json(body)).into_response()
    } else {
        (status, Body::empty()).into_response()
    };

    match err.root() {
        PipelineError::Redirect { location, .. } => {
            if let Ok(value) = HeaderValue::from_str(location.as_str()) {
                response.headers_mut().insert(LOCATION, value);
            }
        }
        PipelineError::Challenge { realm } => {
            if let Ok(value) = HeaderValue::from_str(&format!("Basic realm=\"{}\"", realm)) {
                response.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
        }
        _ => {}
    }

    response
}

/// Set the given headers, replacing any value already present under the
/// same name. Repeated names keep every value written by the mutators.
pub fn apply_headers(target: &mut HeaderMap, headers: &[(String, String)]) -> Result<(), PipelineError> {
    let mut replaced: Vec<HeaderName> = Vec::new();

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| PipelineError::Internal(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            PipelineError::Internal(format!("invalid value for header '{}': {}", name, e))
        })?;

        if !replaced.contains(&name) {
            target.remove(&name);
            replaced.push(name.clone());
        }
        target.append(name, value);
    }

    Ok(())
}

/// Append one `Set-Cookie` header per cookie. Values must already be
/// encoded; anything that could end the value is rejected.
pub fn apply_cookies(target: &mut HeaderMap, cookies: &[(String, String)]) -> Result<(), PipelineError> {
    for (name, value) in cookies {
        if !value.bytes().all(is_cookie_octet) {
            return Err(PipelineError::Internal(format!(
                "invalid value for cookie '{}'",
                name
            )));
        }
        let cookie = HeaderValue::from_str(&format!("{}={}", name, value))
            .map_err(|e| PipelineError::Internal(format!("invalid value for cookie '{}': {}", name, e)))?;
        target.append(SET_COOKIE, cookie);
    }
    Ok(())
}
