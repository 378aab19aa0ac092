//! Rule-set reconciliation.
//!
//! # Data Flow
//! ```text
//! providers → event queue (bounded, ordered)
//!     → Reconciler::run (single consumer)
//!     → RuleFactory::create_rule_set (validate everything first)
//!     → RuleIndex::with_rule_set / without_provider (new snapshot)
//!     → RuleRepository::publish (atomic swap)
//! ```
//!
//! # Design Decisions
//! - The reconciler is the only writer of the index
//! - A rejected rule set keeps the provider's previous rules active; the
//!   rejection is logged, counted and recorded in the status table
//! - `created` for a known provider is treated as `updated`; `removed` for an
//!   unknown provider is a no-op

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::observability::metrics;
use crate::rules::error::ReconcileError;
use crate::rules::event::{ChangeKind, EventReceiver, RuleSetChangedEvent};
use crate::rules::factory::RuleFactory;
use crate::rules::index::RuleRepository;

/// Reconciliation state of one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatus {
    /// Version of the active rule set, if any.
    pub version: Option<String>,
    pub rule_count: usize,
    /// Why the most recent event was rejected; cleared on success.
    pub last_error: Option<String>,
    pub last_change: ChangeKind,
    /// Unix seconds of the last processed event.
    pub updated_at: u64,
}

/// Concurrent provider → status table shared with the admin API.
#[derive(Debug, Default)]
pub struct ProviderStatusTable {
    entries: DashMap<String, ProviderStatus>,
}

impl ProviderStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, provider: &str) -> Option<ProviderStatus> {
        self.entries.get(provider).map(|entry| entry.value().clone())
    }

    /// All entries, sorted by provider name.
    pub fn snapshot(&self) -> Vec<(String, ProviderStatus)> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    fn record_success(&self, provider: &str, change: ChangeKind, version: Option<String>, rule_count: usize) {
        self.entries.insert(
            provider.to_string(),
            ProviderStatus {
                version,
                rule_count,
                last_error: None,
                last_change: change,
                updated_at: unix_now(),
            },
        );
    }

    fn record_failure(&self, provider: &str, change: ChangeKind, error: &ReconcileError) {
        let mut entry = self
            .entries
            .entry(provider.to_string())
            .or_insert_with(|| ProviderStatus {
                version: None,
                rule_count: 0,
                last_error: None,
                last_change: change,
                updated_at: 0,
            });
        entry.last_error = Some(error.to_string());
        entry.last_change = change;
        entry.updated_at = unix_now();
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied { provider: String, version: String, rules: usize },
    Removed { provider: String },
    /// Removal of a provider without rules.
    Ignored { provider: String },
}

pub struct Reconciler {
    factory: RuleFactory,
    repository: Arc<RuleRepository>,
    status: Arc<ProviderStatusTable>,
    generation: u64,
}

impl Reconciler {
    pub fn new(
        factory: RuleFactory,
        repository: Arc<RuleRepository>,
        status: Arc<ProviderStatusTable>,
    ) -> Self {
        Self {
            factory,
            repository,
            status,
            generation: 0,
        }
    }

    /// Process one event.
    pub fn apply(&mut self, event: RuleSetChangedEvent) -> Result<ReconcileOutcome, ReconcileError> {
        if event.provider.is_empty() {
            return Err(ReconcileError::EmptyProvider);
        }

        let provider = event.provider.clone();
        let change = event.change;
        let result = match change {
            ChangeKind::Created | ChangeKind::Updated => self.apply_rule_set(event),
            ChangeKind::Removed => Ok(self.remove(&provider)),
        };

        match &result {
            Ok(outcome) => {
                metrics::record_rule_set_event(&provider, change.as_str(), "applied");
                tracing::info!(provider = %provider, change = %change, outcome = ?outcome, "Rule set reconciled");
            }
            Err(err) => {
                self.status.record_failure(&provider, change, err);
                metrics::record_rule_set_event(&provider, change.as_str(), "rejected");
                tracing::warn!(provider = %provider, change = %change, error = %err, "Rule set rejected, keeping previous rules");
            }
        }

        result
    }

    fn apply_rule_set(&mut self, event: RuleSetChangedEvent) -> Result<ReconcileOutcome, ReconcileError> {
        let provider = event.provider;
        let rules = event.rules.ok_or_else(|| ReconcileError::MissingRuleSet {
            provider: provider.clone(),
            change: event.change.to_string(),
        })?;

        let current = self.repository.snapshot();
        if event.change == ChangeKind::Created && current.rule_set(&provider).is_some() {
            tracing::debug!(provider = %provider, "Created event for known provider, treating as update");
        }

        self.generation += 1;
        let version = event.version.unwrap_or_else(|| self.generation.to_string());

        let set = self
            .factory
            .create_rule_set(&provider, &version, &rules)
            .map_err(|errors| ReconcileError::Invalid {
                provider: provider.clone(),
                errors,
            })?;

        let count = set.len();
        let next = current.with_rule_set(set);
        metrics::set_active_rules(next.rule_count());
        self.repository.publish(next);
        self.status
            .record_success(&provider, event.change, Some(version.clone()), count);

        Ok(ReconcileOutcome::Applied {
            provider,
            version,
            rules: count,
        })
    }

    fn remove(&mut self, provider: &str) -> ReconcileOutcome {
        let current = self.repository.snapshot();
        if current.rule_set(provider).is_none() {
            return ReconcileOutcome::Ignored {
                provider: provider.to_string(),
            };
        }

        let next = current.without_provider(provider);
        metrics::set_active_rules(next.rule_count());
        self.repository.publish(next);
        self.status
            .record_success(provider, ChangeKind::Removed, None, 0);

        ReconcileOutcome::Removed {
            provider: provider.to_string(),
        }
    }

    /// Consume events until every sender is gone or shutdown is signalled.
    pub async fn run(mut self, mut events: EventReceiver, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Rule set reconciler started");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        // Failures are already logged and recorded.
                        let _ = self.apply(event);
                    }
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Rule set reconciler stopped");
    }
}
