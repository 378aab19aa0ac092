//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all decision handler
//! - Wire up middleware (tracing, request ID)
//! - Turn each request into a [`RequestContext`] and run the executor
//! - Decision mode: answer 200 with the mutator output as headers
//! - Proxy mode: forward the mutated request to the rule's upstream
//! - Render pipeline errors and record decision metrics

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, request::Parts, HeaderMap, HeaderName, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::{ServeConfig, ServeMode};
use crate::error::PipelineError;
use crate::http::context::RequestContext;
use crate::http::request::{request_id, X_REQUEST_ID};
use crate::http::response::{apply_cookies, apply_headers, error_response};
use crate::observability::metrics;
use crate::pipeline::{AppContext, Context};
use crate::rules::{Decision, Executor};

/// Headers that apply to a single connection and are never forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<Executor>,
    pub client: Client<HttpConnector, Body>,
    pub mode: ServeMode,
    pub request_timeout: Duration,
    pub verbose_errors: bool,
    pub trust_forwarded_headers: bool,
}

impl AppState {
    pub fn new(config: &ServeConfig, executor: Arc<Executor>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            executor,
            client,
            mode: config.mode,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            verbose_errors: config.verbose_errors,
            trust_forwarded_headers: config.trust_forwarded_headers,
        }
    }
}

/// HTTP server answering access decisions.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServeConfig, executor: Arc<Executor>) -> Self {
        Self {
            router: build_router(AppState::new(config, executor)),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until shutdown is signalled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr: SocketAddr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/{*path}", any(decision_handler))
        .route("/", any(decision_handler))
        .with_state(state)
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
}

/// Evaluate the request against the rule index.
async fn decision_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers());
    let (parts, body) = request.into_parts();

    let app = AppContext::with_timeout(state.request_timeout);
    let result = match RequestContext::from_parts(&parts, app, state.trust_forwarded_headers) {
        Ok(ctx) => handle(&state, &ctx, parts, body).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(response) => {
            metrics::record_decision("allowed", start);
            response
        }
        Err(err) => {
            let kind = err.kind();
            tracing::info!(
                request_id = %request_id,
                kind = kind.as_str(),
                error = %err,
                "Request not allowed"
            );
            metrics::record_decision(kind.as_str(), start);
            error_response(&err, state.verbose_errors)
        }
    }
}

async fn handle(
    state: &AppState,
    ctx: &RequestContext,
    parts: Parts,
    body: Body,
) -> Result<Response, PipelineError> {
    let decision = state.executor.execute(ctx).await?;

    tracing::debug!(
        rule = %decision.rule,
        provider = %decision.provider,
        subject = %decision.subject.id,
        "Request allowed"
    );

    match state.mode {
        ServeMode::Decision => {
            let mut response = StatusCode::OK.into_response();
            apply_headers(response.headers_mut(), &ctx.upstream_headers())?;
            apply_cookies(response.headers_mut(), &ctx.response_cookies())?;
            Ok(response)
        }
        ServeMode::Proxy => forward(state, ctx, &decision, parts, body).await,
    }
}

/// Forward the mutated request to the upstream of the matched rule.
async fn forward(
    state: &AppState,
    ctx: &RequestContext,
    decision: &Decision,
    mut parts: Parts,
    body: Body,
) -> Result<Response, PipelineError> {
    let upstream = decision.upstream.as_ref().ok_or_else(|| {
        PipelineError::Configuration(format!("rule '{}' has no upstream", decision.rule))
    })?;

    parts.uri = upstream_uri(upstream, ctx.request_url())?;
    parts.method = ctx.request_method().clone();
    strip_hop_by_hop(&mut parts.headers);
    parts.headers.remove(header::HOST);
    apply_headers(&mut parts.headers, &ctx.upstream_headers())?;

    let request = Request::from_parts(parts, body);
    let target = upstream.to_string();

    let response = ctx
        .app_context()
        .run(&format!("call to {}", target), async {
            state.client.request(request).await.map_err(|e| {
                PipelineError::Communication(format!("call to {} failed: {}", target, e))
            })
        })
        .await?;

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    apply_cookies(&mut parts.headers, &ctx.response_cookies())?;

    Ok(Response::from_parts(parts, Body::new(body)))
}

/// Upstream base URL joined with the path and query of the request.
fn upstream_uri(upstream: &Url, request: &Url) -> Result<Uri, PipelineError> {
    let mut target = upstream.clone();
    target.set_path(&format!(
        "{}{}",
        upstream.path().trim_end_matches('/'),
        request.path()
    ));
    target.set_query(request.query());

    target
        .as_str()
        .parse::<Uri>()
        .map_err(|e| PipelineError::Internal(format!("invalid upstream uri '{}': {}", target, e)))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}
