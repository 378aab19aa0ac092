//! File-system rule-set provider.
//!
//! # Responsibilities
//! - Load every configured rule file (or every `.json`/`.toml` file of a
//!   configured directory) at startup and emit `created`
//! - Optionally watch them, emitting `updated` on change and `removed` on
//!   deletion
//!
//! # Design Decisions
//! - One provider name per file (`file:<path>`), so files reconcile
//!   independently
//! - Without an explicit `version`, the content digest is the version;
//!   unchanged content is not re-sent

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, mpsc};

use crate::config::FileProviderConfig;
use crate::observability::metrics;
use crate::rules::event::{ChangeKind, EventSender, RuleSetChangedEvent};
use crate::rules::provider::parser::{parse, Format};
use crate::rules::provider::ProviderError;

pub struct FileProvider {
    paths: Vec<PathBuf>,
    watch: bool,
    events: EventSender,
    versions: HashMap<PathBuf, String>,
}

impl FileProvider {
    pub fn new(config: &FileProviderConfig, events: EventSender) -> Self {
        Self {
            paths: config.paths.clone(),
            watch: config.watch,
            events,
            versions: HashMap::new(),
        }
    }

    pub fn provider_name(path: &Path) -> String {
        format!("file:{}", path.display())
    }

    /// Configured files plus the rule files inside configured directories.
    fn rule_files(&self) -> Result<Vec<PathBuf>, ProviderError> {
        let mut files = Vec::new();
        for path in &self.paths {
            if path.is_dir() {
                let entries = fs::read_dir(path).map_err(|source| ProviderError::Io {
                    path: path.clone(),
                    source,
                })?;
                let mut found: Vec<PathBuf> = entries
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|p| p.is_file() && Format::from_path(p).is_some())
                    .collect();
                found.sort();
                files.extend(found);
            } else if Format::from_path(path).is_some() {
                files.push(path.clone());
            } else {
                return Err(ProviderError::UnsupportedFormat(path.clone()));
            }
        }
        Ok(files)
    }

    fn read(path: &Path) -> Result<RuleSetChangedEvent, ProviderError> {
        let format =
            Format::from_path(path).ok_or_else(|| ProviderError::UnsupportedFormat(path.to_path_buf()))?;
        let content = fs::read_to_string(path).map_err(|source| ProviderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = parse(format, &content).map_err(|source| ProviderError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let version = document.version.unwrap_or_else(|| digest(&content));
        Ok(RuleSetChangedEvent::created(Self::provider_name(path), document.rules).with_version(version))
    }

    /// Read `path` and emit `change` unless its version is unchanged.
    async fn publish(&mut self, path: &Path, change: ChangeKind) -> Result<(), ProviderError> {
        let mut event = match Self::read(path) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "Ignoring unreadable rule set");
                metrics::record_rule_set_event(&Self::provider_name(path), change.as_str(), "unparsable");
                return Ok(());
            }
        };

        let version = event.version.clone().unwrap_or_default();
        if self.versions.get(path) == Some(&version) {
            tracing::debug!(path = %path.display(), "Rule set unchanged");
            return Ok(());
        }

        event.change = change;
        self.send(event).await?;
        self.versions.insert(path.to_path_buf(), version);
        Ok(())
    }

    async fn send(&self, event: RuleSetChangedEvent) -> Result<(), ProviderError> {
        self.events.send(event).await.map_err(|_| ProviderError::QueueClosed)
    }

    /// Emit `created` for every rule file. Returns the number of files sent.
    pub async fn load_all(&mut self) -> Result<usize, ProviderError> {
        let files = self.rule_files()?;
        for file in &files {
            self.publish(file, ChangeKind::Created).await?;
        }
        tracing::info!(files = self.versions.len(), "Rule files loaded");
        Ok(self.versions.len())
    }

    async fn on_change(&mut self, path: &Path) -> Result<(), ProviderError> {
        if Format::from_path(path).is_none() || !self.is_watched(path) {
            return Ok(());
        }

        if path.exists() {
            let change = if self.versions.contains_key(path) {
                ChangeKind::Updated
            } else {
                ChangeKind::Created
            };
            self.publish(path, change).await
        } else if self.versions.remove(path).is_some() {
            tracing::info!(path = %path.display(), "Rule file removed");
            self.send(RuleSetChangedEvent::removed(Self::provider_name(path))).await
        } else {
            Ok(())
        }
    }

    fn is_watched(&self, path: &Path) -> bool {
        self.paths
            .iter()
            .any(|p| p == path || (p.is_dir() && path.parent() == Some(p.as_path())))
    }

    fn start_watcher(&self) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>), ProviderError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove() {
                        for path in event.paths {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Rule file watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        for path in &self.paths {
            // Directories are watched so files appearing later are picked up.
            let target = if path.is_dir() {
                path.as_path()
            } else {
                path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."))
            };
            watcher.watch(target, RecursiveMode::NonRecursive)?;
        }

        tracing::info!(paths = ?self.paths, "Rule file watcher started");
        Ok((watcher, rx))
    }

    /// Follow changes until shutdown. Call [`FileProvider::load_all`] first.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ProviderError> {
        if !self.watch {
            return Ok(());
        }

        let (_watcher, mut changes) = self.start_watcher()?;
        loop {
            tokio::select! {
                Some(path) = changes.recv() => self.on_change(&path).await?,
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Rule file watcher stopped");
        Ok(())
    }
}

fn digest(content: &str) -> String {
    Sha256::digest(content.as_bytes())
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}
