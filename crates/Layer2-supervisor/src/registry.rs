//! Supervisor Registry - one supervisor per enabled tool, plus the merged feed
//!
//! Features:
//! - Rebuild from configuration, keeping untouched tools running
//! - Per-tool and bulk start/stop (bulk stop skips oneshot tools)
//! - Merged, bounded log history with live subscription
//! - Aggregate status for enabling bulk actions
//!
//! Supervisors report through one unbounded channel drained by a single
//! aggregator task, so feed updates are serialized and per-tool order is
//! preserved end to end.

use crate::event::{RegistryEvent, SupervisorEvent};
use crate::log::{LogFeed, LogLine};
use crate::settings::{RegistryConfig, SupervisorSettings};
use crate::state::SupervisorState;
use crate::supervisor::Supervisor;
use futures::future::join_all;
use launchpad_foundation::{Error, Result, ToolDescriptor, ToolEntry, ToolKind};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of a rebuild, by tool id
#[derive(Debug, Default)]
pub struct RebuildReport {
    /// New supervisors (Stopped)
    pub added: Vec<String>,
    /// Supervisors torn down and discarded
    pub removed: Vec<String>,
    /// Unchanged supervisors, state untouched
    pub kept: Vec<String>,
    /// Descriptor replaced; applies on next start
    pub updated: Vec<String>,
    /// Valid but disabled entries
    pub disabled: Vec<String>,
    /// Entries that failed validation or duplicated an earlier id
    pub rejected: Vec<(String, Error)>,
}

impl RebuildReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Status of one tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub id: String,
    pub label: String,
    pub kind: ToolKind,
    pub state: SupervisorState,
    pub pid: Option<u32>,
    pub log_path: PathBuf,
}

/// Aggregate status across all supervisors
#[derive(Debug, Clone, Default)]
pub struct StatusSummary {
    /// Tools in registry order
    pub tools: Vec<ToolStatus>,
    /// Some tool can be started
    pub can_start_all: bool,
    /// Some non-oneshot tool is Running or Starting
    pub can_stop_all: bool,
}

impl StatusSummary {
    fn from_tools(tools: Vec<ToolStatus>) -> Self {
        let can_start_all = tools.iter().any(|t| t.state.can_start());
        let can_stop_all = tools
            .iter()
            .any(|t| !t.kind.is_oneshot() && t.state.is_active());
        Self {
            tools,
            can_start_all,
            can_stop_all,
        }
    }

    /// Number of tools in `state`
    pub fn count(&self, state: SupervisorState) -> usize {
        self.tools.iter().filter(|t| t.state == state).count()
    }

    pub fn running(&self) -> usize {
        self.count(SupervisorState::Running)
    }

    pub fn get(&self, id: &str) -> Option<&ToolStatus> {
        self.tools.iter().find(|t| t.id == id)
    }
}

/// Feed history plus the broadcast sender, updated together
struct Feed {
    history: LogFeed,
    tx: broadcast::Sender<RegistryEvent>,
}

/// Registry of supervisors
pub struct SupervisorRegistry {
    base_dir: PathBuf,
    settings: SupervisorSettings,

    /// Supervisors in configuration order
    supervisors: RwLock<Vec<Arc<Supervisor>>>,

    /// Cloned into every new supervisor
    events_tx: mpsc::UnboundedSender<SupervisorEvent>,

    feed: Arc<RwLock<Feed>>,

    aggregator: JoinHandle<()>,
}

impl SupervisorRegistry {
    /// Create an empty registry
    ///
    /// Must be called inside a Tokio runtime (spawns the feed aggregator).
    pub fn new(config: RegistryConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (tx, _) = broadcast::channel(config.feed_capacity.max(1));
        let feed = Arc::new(RwLock::new(Feed {
            history: LogFeed::new(config.history_limit),
            tx,
        }));

        let aggregator = tokio::spawn(aggregate(events_rx, Arc::clone(&feed)));

        Self {
            base_dir: config.base_dir,
            settings: config.supervisor,
            supervisors: RwLock::new(Vec::new()),
            events_tx,
            feed,
            aggregator,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    // ========================================================================
    // Rebuild
    // ========================================================================

    /// Reconcile the supervisor set with `entries`
    ///
    /// Invalid entries and repeated ids are rejected (first occurrence wins).
    /// Tools that disappeared or were disabled are stopped with the teardown
    /// timeout and discarded. Unchanged tools keep running.
    pub async fn rebuild(&self, entries: &[ToolEntry]) -> RebuildReport {
        let mut report = RebuildReport::default();
        let mut seen = HashSet::new();
        let mut wanted: Vec<ToolDescriptor> = Vec::new();

        for entry in entries {
            let descriptor = match entry.validate(&self.base_dir) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    let id = match entry.id.trim() {
                        "" => "<unnamed>".to_string(),
                        id => id.to_string(),
                    };
                    warn!("Rejected tool {}: {}", id, e);
                    report.rejected.push((id, e));
                    continue;
                }
            };
            if !seen.insert(descriptor.id.clone()) {
                warn!("Duplicate tool id {}, keeping the first", descriptor.id);
                let id = descriptor.id;
                report.rejected.push((id.clone(), Error::DuplicateTool(id)));
                continue;
            }
            if !descriptor.enabled {
                report.disabled.push(descriptor.id);
                continue;
            }
            wanted.push(descriptor);
        }

        let removed: Vec<Arc<Supervisor>> = {
            let mut current = self.supervisors.write();
            let mut previous: HashMap<String, Arc<Supervisor>> = current
                .drain(..)
                .map(|sup| (sup.id().to_string(), sup))
                .collect();

            let mut next = Vec::with_capacity(wanted.len());
            for descriptor in wanted {
                let id = descriptor.id.clone();
                match previous.remove(&id) {
                    Some(sup) => {
                        if *sup.descriptor() == descriptor {
                            report.kept.push(id);
                        } else {
                            sup.set_descriptor(descriptor);
                            report.updated.push(id);
                        }
                        next.push(sup);
                    }
                    None => {
                        next.push(Arc::new(Supervisor::new(
                            descriptor,
                            self.settings.clone(),
                            self.events_tx.clone(),
                        )));
                        report.added.push(id);
                    }
                }
            }
            *current = next;
            previous.into_values().collect()
        };

        report.removed = removed.iter().map(|sup| sup.id().to_string()).collect();
        report.removed.sort();
        join_all(removed.iter().map(|sup| sup.shutdown())).await;
        drop(removed);

        info!(
            "Rebuilt tools: {} added, {} removed, {} kept, {} updated, {} rejected",
            report.added.len(),
            report.removed.len(),
            report.kept.len(),
            report.updated.len(),
            report.rejected.len()
        );

        let _ = self.feed.read().tx.send(RegistryEvent::Rebuilt {
            added: report.added.len(),
            removed: report.removed.len(),
            updated: report.updated.len(),
            rejected: report.rejected.len(),
        });

        report
    }

    // ========================================================================
    // Control
    // ========================================================================

    fn get(&self, id: &str) -> Result<Arc<Supervisor>> {
        self.supervisors
            .read()
            .iter()
            .find(|sup| sup.id() == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("tool '{}'", id)))
    }

    fn snapshot(&self) -> Vec<Arc<Supervisor>> {
        self.supervisors.read().clone()
    }

    /// Start one tool
    pub async fn start(&self, id: &str) -> Result<SupervisorState> {
        self.get(id)?.start().await
    }

    /// Stop one tool with its kind's graceful timeout
    pub async fn stop(&self, id: &str) -> Result<SupervisorState> {
        Ok(self.get(id)?.stop().await)
    }

    /// Start every tool concurrently; a failure does not affect the others
    pub async fn start_all(&self) -> Vec<(String, Result<SupervisorState>)> {
        let supervisors = self.snapshot();
        let results = join_all(supervisors.iter().map(|sup| sup.start())).await;
        supervisors
            .iter()
            .map(|sup| sup.id().to_string())
            .zip(results)
            .collect()
    }

    /// Stop every non-oneshot tool concurrently
    pub async fn stop_all(&self) -> Vec<(String, SupervisorState)> {
        let supervisors: Vec<_> = self
            .snapshot()
            .into_iter()
            .filter(|sup| !sup.descriptor().is_oneshot())
            .collect();
        let results = join_all(supervisors.iter().map(|sup| sup.stop())).await;
        supervisors
            .iter()
            .map(|sup| sup.id().to_string())
            .zip(results)
            .collect()
    }

    /// Stop every tool, oneshot included, with the teardown timeout
    pub async fn shutdown(&self) {
        let supervisors = self.snapshot();
        debug!("Shutting down {} supervisors", supervisors.len());
        join_all(supervisors.iter().map(|sup| sup.shutdown())).await;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn tool_ids(&self) -> Vec<String> {
        self.supervisors
            .read()
            .iter()
            .map(|sup| sup.id().to_string())
            .collect()
    }

    pub fn descriptor(&self, id: &str) -> Option<Arc<ToolDescriptor>> {
        self.get(id).ok().map(|sup| sup.descriptor())
    }

    pub fn state(&self, id: &str) -> Option<SupervisorState> {
        self.get(id).ok().map(|sup| sup.state())
    }

    /// Receiver tracking one tool's latest state
    pub fn watch_state(&self, id: &str) -> Option<watch::Receiver<SupervisorState>> {
        self.get(id).ok().map(|sup| sup.watch_state())
    }

    /// Snapshot of every tool's state
    pub fn status(&self) -> StatusSummary {
        let tools = self
            .snapshot()
            .iter()
            .map(|sup| {
                let descriptor = sup.descriptor();
                ToolStatus {
                    id: descriptor.id.clone(),
                    label: descriptor.label.clone(),
                    kind: descriptor.kind,
                    state: sup.state(),
                    pid: sup.pid(),
                    log_path: descriptor.log_path.clone(),
                }
            })
            .collect();
        StatusSummary::from_tools(tools)
    }

    // ========================================================================
    // Feed
    // ========================================================================

    /// Live events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.feed.read().tx.subscribe()
    }

    /// History and a live receiver with no gap or overlap between them
    pub fn attach(&self) -> (Vec<LogLine>, broadcast::Receiver<RegistryEvent>) {
        let feed = self.feed.read();
        (feed.history.entries().cloned().collect(), feed.tx.subscribe())
    }

    /// Retained lines of every tool, oldest first
    pub fn history(&self) -> Vec<LogLine> {
        self.feed.read().history.entries().cloned().collect()
    }

    /// Retained lines of one tool, oldest first
    pub fn history_for(&self, id: &str) -> Vec<LogLine> {
        self.feed.read().history.for_tool(id)
    }
}

impl Drop for SupervisorRegistry {
    fn drop(&mut self) {
        self.aggregator.abort();
    }
}

/// Drain supervisor events into the feed
async fn aggregate(
    mut rx: mpsc::UnboundedReceiver<SupervisorEvent>,
    feed: Arc<RwLock<Feed>>,
) {
    while let Some(event) = rx.recv().await {
        let mut guard = feed.write();
        if let SupervisorEvent::Line(line) = &event {
            guard.history.push(line.clone());
        }
        let _ = guard.tx.send(RegistryEvent::from(event));
    }
    debug!("Feed aggregator finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchpad_foundation::ToolEntry;

    fn entry(id: &str) -> ToolEntry {
        ToolEntry::new(id, id.to_uppercase(), id, "app.py").with_interpreter("sh")
    }

    #[tokio::test]
    async fn test_rebuild_rejects_duplicates_and_skips_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SupervisorRegistry::new(RegistryConfig::new(dir.path()));

        let entries = vec![
            entry("a"),
            entry("a").with_kind(ToolKind::Oneshot),
            entry("b").with_enabled(false),
            ToolEntry::new("", "No id", "x", "x.py"),
        ];
        let report = registry.rebuild(&entries).await;

        assert_eq!(report.added, vec!["a"]);
        assert_eq!(report.disabled, vec!["b"]);
        assert_eq!(report.rejected.len(), 2);
        assert!(matches!(report.rejected[0].1, Error::DuplicateTool(_)));
        assert_eq!(report.rejected[1].0, "<unnamed>");

        // First occurrence wins
        let descriptor = registry.descriptor("a").unwrap();
        assert_eq!(descriptor.kind, ToolKind::Normal);
        assert_eq!(registry.tool_ids(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_rebuild_classifies_changes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SupervisorRegistry::new(RegistryConfig::new(dir.path()));
        registry.rebuild(&[entry("a"), entry("b"), entry("c")]).await;

        let report = registry
            .rebuild(&[
                entry("c"),
                entry("a").with_env("DEBUG", "1"),
                entry("d"),
            ])
            .await;

        assert_eq!(report.kept, vec!["c"]);
        assert_eq!(report.updated, vec!["a"]);
        assert_eq!(report.added, vec!["d"]);
        assert_eq!(report.removed, vec!["b"]);
        assert!(report.is_clean());
        assert_eq!(registry.tool_ids(), vec!["c", "a", "d"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SupervisorRegistry::new(RegistryConfig::new(dir.path()));

        assert!(matches!(
            registry.start("nope").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(registry.stop("nope").await, Err(Error::NotFound(_))));
        assert!(registry.state("nope").is_none());
    }

    #[tokio::test]
    async fn test_status_of_idle_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SupervisorRegistry::new(RegistryConfig::new(dir.path()));

        let empty = registry.status();
        assert!(!empty.can_start_all);
        assert!(!empty.can_stop_all);

        registry.rebuild(&[entry("a"), entry("b")]).await;
        let status = registry.status();
        assert_eq!(status.count(SupervisorState::Stopped), 2);
        assert!(status.can_start_all);
        assert!(!status.can_stop_all);
        assert_eq!(status.get("b").unwrap().label, "B");
    }

    #[tokio::test]
    async fn test_rebuild_event_published() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SupervisorRegistry::new(RegistryConfig::new(dir.path()));
        let mut rx = registry.subscribe();

        registry.rebuild(&[entry("a")]).await;

        match rx.recv().await.unwrap() {
            RegistryEvent::Rebuilt { added, removed, .. } => {
                assert_eq!(added, 1);
                assert_eq!(removed, 0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
