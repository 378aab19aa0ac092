//! Rule-set change events and the queue carrying them.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::rules::config::RuleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Removed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider's rule set was created, updated or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetChangedEvent {
    pub provider: String,

    pub change: ChangeKind,

    /// Content marker; the reconciler assigns a generation when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Absent for `removed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RuleConfig>>,
}

impl RuleSetChangedEvent {
    pub fn created(provider: impl Into<String>, rules: Vec<RuleConfig>) -> Self {
        Self {
            provider: provider.into(),
            change: ChangeKind::Created,
            version: None,
            rules: Some(rules),
        }
    }

    pub fn updated(provider: impl Into<String>, rules: Vec<RuleConfig>) -> Self {
        Self {
            provider: provider.into(),
            change: ChangeKind::Updated,
            version: None,
            rules: Some(rules),
        }
    }

    pub fn removed(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            change: ChangeKind::Removed,
            version: None,
            rules: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

pub type EventSender = mpsc::Sender<RuleSetChangedEvent>;
pub type EventReceiver = mpsc::Receiver<RuleSetChangedEvent>;

/// The shared, ordered, bounded event queue.
///
/// Providers hold clones of the sender; sending waits while the queue is
/// full.
pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity.max(1))
}
