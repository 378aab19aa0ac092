//! Startup orchestration.
//!
//! # Responsibilities
//! - Build mechanism prototypes, the rule repository and the reconciler
//! - Start the reconciler and the rule providers
//! - Bind listeners and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: configuration, prototype and listener errors are fatal
//! - Unreadable or unparsable rule files are logged and skipped; the
//!   provider loads once here, then only watches
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when rule sets are queued)

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::admin::{admin_router, AdminState};
use crate::config::WardenConfig;
use crate::error::PipelineError;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::pipeline::{KeyMaterial, MechanismRegistry, PrototypeRepository};
use crate::rules::provider::{FileProvider, ProviderError};
use crate::rules::{event_queue, Executor, ProviderStatusTable, Reconciler, RuleFactory, RuleRepository};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid {name} address '{value}': {source}")]
    Address {
        name: &'static str,
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to build mechanism prototypes: {0}")]
    Mechanisms(#[source] PipelineError),

    #[error("invalid signer: {0}")]
    Signer(#[source] PipelineError),

    #[error("failed to load rule sets: {0}")]
    Provider(#[from] ProviderError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Request-path components built from a configuration.
pub struct Core {
    pub prototypes: Arc<PrototypeRepository>,
    pub repository: Arc<RuleRepository>,
    pub status: Arc<ProviderStatusTable>,
    pub executor: Arc<Executor>,
    pub reconciler: Reconciler,
}

/// Build prototypes, repository, executor and reconciler.
pub fn build_core(config: &WardenConfig) -> Result<Core, StartupError> {
    let registry = MechanismRegistry::with_defaults();
    let prototypes = Arc::new(
        PrototypeRepository::build(&registry, &config.mechanisms).map_err(StartupError::Mechanisms)?,
    );
    tracing::info!(prototypes = prototypes.len(), "Mechanism prototypes built");

    let key = config
        .signer
        .as_ref()
        .map(|signer| KeyMaterial::new(signer.key_id.clone(), signer.secret.as_bytes().to_vec()))
        .transpose()
        .map_err(StartupError::Signer)?;

    let repository = Arc::new(RuleRepository::new());
    let status = Arc::new(ProviderStatusTable::new());
    let reconciler = Reconciler::new(
        RuleFactory::new(prototypes.clone()),
        repository.clone(),
        status.clone(),
    );
    let executor = Arc::new(Executor::new(repository.clone(), key));

    Ok(Core {
        prototypes,
        repository,
        status,
        executor,
        reconciler,
    })
}

fn parse_address(name: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|source| StartupError::Address {
        name,
        value: value.to_string(),
        source,
    })
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address).await.map_err(|source| StartupError::Bind {
        address: address.to_string(),
        source,
    })
}

/// Start every subsystem and serve until `shutdown` is triggered.
pub async fn run(config: WardenConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    // Subscribe before anything can trigger.
    let server_shutdown = shutdown.subscribe();
    let reconciler_shutdown = shutdown.subscribe();
    let provider_shutdown = shutdown.subscribe();
    let admin_shutdown = shutdown.subscribe();

    if config.observability.metrics_enabled {
        let addr = parse_address("metrics", &config.observability.metrics_address)?;
        metrics::init_metrics(addr)?;
    }

    let core = build_core(&config)?;
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    let (events, queue) = event_queue(config.rules.queue_capacity);
    tasks.push(tokio::spawn(core.reconciler.run(queue, reconciler_shutdown)));

    if let Some(file) = &config.rules.providers.file {
        let mut provider = FileProvider::new(file, events.clone());
        provider.load_all().await?;
        tasks.push(tokio::spawn(async move {
            if let Err(e) = provider.run(provider_shutdown).await {
                tracing::error!(error = %e, "File rule provider stopped");
            }
        }));
    }
    drop(events);

    if config.admin.enabled {
        let listener = bind(&config.admin.bind_address).await?;
        let router = admin_router(AdminState {
            repository: core.repository.clone(),
            status: core.status.clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
        });
        tracing::info!(address = %config.admin.bind_address, "Admin API starting");

        let mut admin_shutdown = admin_shutdown;
        tasks.push(tokio::spawn(async move {
            let served = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API stopped");
            }
        }));
    }

    let listener = bind(&config.serve.bind_address).await?;
    tracing::info!(
        mode = ?config.serve.mode,
        request_timeout_secs = config.serve.request_timeout_secs,
        "Decision server configured"
    );
    let served = HttpServer::new(&config.serve, core.executor.clone())
        .run(listener, server_shutdown)
        .await;

    shutdown.trigger();
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Background task failed");
        }
    }

    served?;
    Ok(())
}
