//! Supervisor / registry settings derived from `LauncherConfig`

use launchpad_foundation::{LauncherConfig, ToolKind};
use std::path::PathBuf;
use std::time::Duration;

/// Timing policy shared by every supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Graceful stop timeout for `normal` tools
    pub normal_stop_timeout: Duration,
    /// Graceful stop timeout for `oneshot` tools
    pub oneshot_stop_timeout: Duration,
    /// Wait after a forced kill before giving up on exit confirmation
    pub kill_wait: Duration,
    /// Output drain window after the process exits
    pub drain_timeout: Duration,
    /// Graceful timeout used when a supervisor is discarded
    pub teardown_timeout: Duration,
    /// Strip ANSI sequences from captured output
    pub strip_ansi: bool,
    /// Signal the process group instead of the single PID (Unix only)
    pub kill_process_group: bool,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self::from_config(&LauncherConfig::default())
    }
}

impl SupervisorSettings {
    pub fn from_config(config: &LauncherConfig) -> Self {
        Self {
            normal_stop_timeout: Duration::from_millis(config.normal_stop_timeout_ms),
            oneshot_stop_timeout: Duration::from_millis(config.oneshot_stop_timeout_ms),
            kill_wait: Duration::from_millis(config.kill_wait_ms),
            drain_timeout: Duration::from_millis(config.drain_timeout_ms),
            teardown_timeout: Duration::from_millis(config.teardown_timeout_ms),
            strip_ansi: config.strip_ansi(),
            kill_process_group: config.kill_process_group(),
        }
    }

    /// Graceful stop timeout for a tool kind
    pub fn graceful_timeout(&self, kind: ToolKind) -> Duration {
        match kind {
            ToolKind::Normal => self.normal_stop_timeout,
            ToolKind::Oneshot => self.oneshot_stop_timeout,
        }
    }

    /// Upper bound on how long a stop may take
    pub fn max_stop_duration(&self, kind: ToolKind) -> Duration {
        self.graceful_timeout(kind) + self.kill_wait
    }

    pub fn with_stop_timeouts(mut self, normal: Duration, oneshot: Duration) -> Self {
        self.normal_stop_timeout = normal;
        self.oneshot_stop_timeout = oneshot;
        self
    }

    pub fn with_kill_wait(mut self, kill_wait: Duration) -> Self {
        self.kill_wait = kill_wait;
        self
    }
}

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory tool paths are resolved against
    pub base_dir: PathBuf,
    pub supervisor: SupervisorSettings,
    /// Broadcast capacity of the merged feed
    pub feed_capacity: usize,
    /// Lines kept in feed history
    pub history_limit: usize,
}

impl RegistryConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::from_launcher_config(base_dir, &LauncherConfig::default())
    }

    pub fn from_launcher_config(base_dir: impl Into<PathBuf>, config: &LauncherConfig) -> Self {
        Self {
            base_dir: base_dir.into(),
            supervisor: SupervisorSettings::from_config(config),
            feed_capacity: config.feed_capacity.max(1),
            history_limit: config.history_limit.max(1),
        }
    }
}
