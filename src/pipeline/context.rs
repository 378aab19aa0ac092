//! The request abstraction mechanisms operate on.
//!
//! # Responsibilities
//! - Expose request data (method, URL, headers, cookies, query)
//! - Collect side effects (upstream headers, response cookies, terminal error)
//! - Carry the request's deadline and cancellation signal
//!
//! # Design Decisions
//! - Mechanisms never see transport objects, only `&dyn Context`
//! - Writes go through `&self`; implementations use interior mutability
//!   because a context is shared by every member of every chain of a request

use std::future::Future;
use std::time::Duration;

use axum::http::Method;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::PipelineError;

/// Request accessors and output sinks supplied by the transport boundary.
pub trait Context: Send + Sync {
    /// Deadline and cancellation scope of the request.
    fn app_context(&self) -> &AppContext;

    fn request_method(&self) -> &Method;

    /// Full URL of the request as seen by the boundary.
    fn request_url(&self) -> &Url;

    /// Value of a request header. Absent and empty headers both yield `None`.
    fn request_header(&self, name: &str) -> Option<String>;

    fn request_cookie(&self, name: &str) -> Option<String> {
        let header = self.request_header("cookie")?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
    }

    fn request_query_parameter(&self, name: &str) -> Option<String> {
        self.request_url()
            .query_pairs()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    }

    /// Add a header to the request forwarded upstream.
    fn add_upstream_header(&self, name: &str, value: &str);

    /// Add a cookie to the response sent to the client.
    fn add_response_cookie(&self, name: &str, value: &str);

    /// Record the error the boundary must render.
    fn set_pipeline_error(&self, err: PipelineError);

    fn pipeline_error(&self) -> Option<PipelineError>;
}

/// Deadline and cancellation scope of a single request.
#[derive(Debug, Clone)]
pub struct AppContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl AppContext {
    pub fn new(cancellation: CancellationToken, deadline: Option<Instant>) -> Self {
        Self {
            cancellation,
            deadline,
        }
    }

    /// A scope without deadline that is never cancelled.
    pub fn background() -> Self {
        Self::new(CancellationToken::new(), None)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(CancellationToken::new(), Some(Instant::now() + timeout))
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, `None` if there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails if the scope was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(
                PipelineError::CommunicationTimeout("request deadline exceeded".into()),
            ),
            _ => Ok(()),
        }
    }

    /// Run `operation` unless the scope is cancelled or its deadline passes
    /// first, in which case the operation is dropped.
    pub async fn run<T, F>(&self, name: &str, operation: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, PipelineError>>,
    {
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(PipelineError::Cancelled),
            _ = expired => Err(PipelineError::CommunicationTimeout(format!(
                "{} exceeded the request deadline",
                name
            ))),
            result = operation => result,
        }
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::background()
    }
}
