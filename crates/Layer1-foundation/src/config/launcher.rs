//! Launcher Config - 런처 설정
//!
//! Timing knobs for the process supervisor and sizing of the merged log feed.
//! Loaded from the global store first, then overridden by the project store.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// 설정 파일명
pub const LAUNCHER_CONFIG_FILE: &str = "launcher.json";

/// Launcher 통합 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// Graceful stop timeout for `normal` tools (ms).
    /// Kept short: a dashboard still holding its port after `Stopped` is worse
    /// than an abrupt kill.
    #[serde(default = "default_normal_stop_timeout_ms")]
    pub normal_stop_timeout_ms: u64,

    /// Graceful stop timeout for `oneshot` tools (ms)
    #[serde(default = "default_oneshot_stop_timeout_ms")]
    pub oneshot_stop_timeout_ms: u64,

    /// Wait after a forced kill before reporting `Stopped` anyway (ms)
    #[serde(default = "default_kill_wait_ms")]
    pub kill_wait_ms: u64,

    /// How long output pipes are drained after the process exits (ms)
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// Graceful timeout used when a rebuild discards a supervisor (ms)
    #[serde(default = "default_teardown_timeout_ms")]
    pub teardown_timeout_ms: u64,

    /// Broadcast capacity of the merged feed
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,

    /// Log lines retained in the merged feed history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Strip ANSI colour/control sequences from captured output (default on)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_ansi: Option<bool>,

    /// Signal the whole process group (Unix) so helper children die too
    /// (default on)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_process_group: Option<bool>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            normal_stop_timeout_ms: default_normal_stop_timeout_ms(),
            oneshot_stop_timeout_ms: default_oneshot_stop_timeout_ms(),
            kill_wait_ms: default_kill_wait_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
            teardown_timeout_ms: default_teardown_timeout_ms(),
            feed_capacity: default_feed_capacity(),
            history_limit: default_history_limit(),
            strip_ansi: None,
            kill_process_group: None,
        }
    }
}

impl LauncherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    ///
    /// A layer that cannot be read or parsed is skipped with a warning.
    pub fn load(project_root: &Path) -> Self {
        let mut stores = Vec::with_capacity(2);

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            stores.push(global);
        }

        // 2. 프로젝트 설정
        stores.push(JsonStore::project(project_root));

        Self::load_layers(&stores)
    }

    /// Merge `launcher.json` from each store in order, later stores winning
    pub fn load_layers(stores: &[JsonStore]) -> Self {
        let mut config = Self::new();
        for store in stores {
            match store.load_optional::<LauncherConfig>(LAUNCHER_CONFIG_FILE) {
                Ok(Some(layer)) => config.merge(layer),
                Ok(None) => {}
                Err(e) => warn!("Ignoring launcher settings layer: {}", e),
            }
        }
        config
    }

    /// 프로젝트 설정 저장
    pub fn save_project(&self, project_root: &Path) -> Result<()> {
        JsonStore::project(project_root).save(LAUNCHER_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선, 기본값은 덮어쓰지 않음)
    pub fn merge(&mut self, other: LauncherConfig) {
        if other.normal_stop_timeout_ms != default_normal_stop_timeout_ms() {
            self.normal_stop_timeout_ms = other.normal_stop_timeout_ms;
        }
        if other.oneshot_stop_timeout_ms != default_oneshot_stop_timeout_ms() {
            self.oneshot_stop_timeout_ms = other.oneshot_stop_timeout_ms;
        }
        if other.kill_wait_ms != default_kill_wait_ms() {
            self.kill_wait_ms = other.kill_wait_ms;
        }
        if other.drain_timeout_ms != default_drain_timeout_ms() {
            self.drain_timeout_ms = other.drain_timeout_ms;
        }
        if other.teardown_timeout_ms != default_teardown_timeout_ms() {
            self.teardown_timeout_ms = other.teardown_timeout_ms;
        }
        if other.feed_capacity != default_feed_capacity() {
            self.feed_capacity = other.feed_capacity;
        }
        if other.history_limit != default_history_limit() {
            self.history_limit = other.history_limit;
        }
        if other.strip_ansi.is_some() {
            self.strip_ansi = other.strip_ansi;
        }
        if other.kill_process_group.is_some() {
            self.kill_process_group = other.kill_process_group;
        }
    }

    pub fn strip_ansi(&self) -> bool {
        self.strip_ansi.unwrap_or(true)
    }

    pub fn kill_process_group(&self) -> bool {
        self.kill_process_group.unwrap_or(true)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn normal_stop_timeout_ms(mut self, ms: u64) -> Self {
        self.normal_stop_timeout_ms = ms;
        self
    }

    pub fn oneshot_stop_timeout_ms(mut self, ms: u64) -> Self {
        self.oneshot_stop_timeout_ms = ms;
        self
    }

    pub fn kill_wait_ms(mut self, ms: u64) -> Self {
        self.kill_wait_ms = ms;
        self
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_version() -> u32 {
    1
}

fn default_normal_stop_timeout_ms() -> u64 {
    500
}

fn default_oneshot_stop_timeout_ms() -> u64 {
    2000
}

fn default_kill_wait_ms() -> u64 {
    1000
}

fn default_drain_timeout_ms() -> u64 {
    500
}

fn default_teardown_timeout_ms() -> u64 {
    300
}

fn default_feed_capacity() -> usize {
    1000
}

fn default_history_limit() -> usize {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_config_default() {
        let config = LauncherConfig::new();
        assert_eq!(config.version, 1);
        assert_eq!(config.normal_stop_timeout_ms, 500);
        assert_eq!(config.oneshot_stop_timeout_ms, 2000);
        assert!(config.strip_ansi());
        assert!(config.kill_process_group());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: LauncherConfig =
            serde_json::from_str(r#"{"killWaitMs": 250, "stripAnsi": false}"#).unwrap();
        assert_eq!(config.kill_wait_ms, 250);
        assert!(!config.strip_ansi());
        assert_eq!(config.kill_process_group, None);
        assert_eq!(config.normal_stop_timeout_ms, 500);
        assert_eq!(config.history_limit, 5000);
    }

    #[test]
    fn test_config_merge() {
        let mut base = LauncherConfig::new().normal_stop_timeout_ms(800);

        let overlay = LauncherConfig::new().kill_wait_ms(200);
        base.merge(overlay);

        // Overlay left the stop timeout at its default, so the base value stays
        assert_eq!(base.normal_stop_timeout_ms, 800);
        assert_eq!(base.kill_wait_ms, 200);
    }

    #[test]
    fn test_project_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = LauncherConfig::new().oneshot_stop_timeout_ms(3000);
        config.save_project(dir.path()).unwrap();

        let loaded = LauncherConfig::load_layers(&[JsonStore::project(dir.path())]);
        assert_eq!(loaded.oneshot_stop_timeout_ms, 3000);
    }

    #[test]
    fn test_unset_flags_keep_lower_layer() {
        let global = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        std::fs::write(
            global.path().join(LAUNCHER_CONFIG_FILE),
            r#"{"stripAnsi": false, "killProcessGroup": false}"#,
        )
        .unwrap();
        std::fs::write(
            project.path().join(LAUNCHER_CONFIG_FILE),
            r#"{"killWaitMs": 400, "killProcessGroup": true}"#,
        )
        .unwrap();

        let config = LauncherConfig::load_layers(&[
            JsonStore::new(global.path()),
            JsonStore::new(project.path()),
        ]);
        assert!(!config.strip_ansi());
        assert!(config.kill_process_group());
        assert_eq!(config.kill_wait_ms, 400);
    }

    #[test]
    fn test_malformed_layer_is_skipped() {
        let global = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        std::fs::write(
            global.path().join(LAUNCHER_CONFIG_FILE),
            r#"{"normalStopTimeoutMs": 900}"#,
        )
        .unwrap();
        std::fs::write(project.path().join(LAUNCHER_CONFIG_FILE), "{ broken").unwrap();

        let config = LauncherConfig::load_layers(&[
            JsonStore::new(global.path()),
            JsonStore::new(project.path()),
        ]);
        assert_eq!(config.normal_stop_timeout_ms, 900);
        assert_eq!(config.kill_wait_ms, 1000);
    }
}
