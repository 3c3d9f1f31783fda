//! Tools Config - `tools_config.json`
//!
//! Loading is strict per entry: one malformed tool is reported and skipped
//! while the rest still load. A missing or unreadable file falls back to the
//! built-in defaults and is never overwritten automatically.

use super::tool::{ToolEntry, ToolKind};
use crate::storage::write_json;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// 설정 파일명
pub const TOOLS_CONFIG_FILE: &str = "tools_config.json";

/// Persisted tool list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub tools: Vec<ToolEntry>,
}

/// Result of loading `tools_config.json`
#[derive(Debug, Default)]
pub struct LoadedTools {
    /// Entries that parsed cleanly, in file order
    pub entries: Vec<ToolEntry>,
    /// Entries that did not parse, by id (or position when no id)
    pub rejected: Vec<(String, Error)>,
    /// True when the defaults were used instead of the file
    pub from_defaults: bool,
}

impl ToolsConfig {
    pub fn new(tools: Vec<ToolEntry>) -> Self {
        Self { tools }
    }

    /// Built-in defaults
    pub fn defaults() -> Self {
        Self::new(vec![
            ToolEntry::new("qidi-temps", "Qidi Temps", "qidi-temps", "app.py"),
            ToolEntry::new(
                "qidi-webcamd-restart",
                "Qidi Webcamd restart",
                "qidiwebcamdrestart",
                "webcamdrestart.py",
            )
            .with_kind(ToolKind::Oneshot),
            ToolEntry::new("voron-temps", "Voron Temps", "VoronTemps", "app.py"),
        ])
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// Load tools from disk
    pub fn load(path: &Path) -> LoadedTools {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No tools config at {} ({}), using defaults", path.display(), e);
                return Self::default_load();
            }
        };

        let raw: serde_json::Value = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Unreadable tools config {}: {}", path.display(), e);
                return Self::default_load();
            }
        };

        Self::from_value(raw)
    }

    /// Parse an already-decoded document: `{"tools": [...]}` or a bare array
    pub fn from_value(raw: serde_json::Value) -> LoadedTools {
        let items = match raw {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut map) => match map.remove("tools") {
                Some(serde_json::Value::Array(items)) => items,
                _ => return Self::default_load(),
            },
            _ => return Self::default_load(),
        };

        let mut loaded = LoadedTools::default();
        for (index, item) in items.into_iter().enumerate() {
            let label = item
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", index));

            match serde_json::from_value::<ToolEntry>(item) {
                Ok(entry) => loaded.entries.push(entry),
                Err(e) => {
                    warn!("Skipping tool entry {}: {}", label, e);
                    let err = Error::invalid_tool(&label, e.to_string());
                    loaded.rejected.push((label, err));
                }
            }
        }

        if loaded.entries.is_empty() {
            loaded.entries = Self::defaults().tools;
            loaded.from_defaults = true;
        }

        loaded
    }

    fn default_load() -> LoadedTools {
        LoadedTools {
            entries: Self::defaults().tools,
            rejected: Vec::new(),
            from_defaults: true,
        }
    }

    /// Persist to disk (pretty, sorted keys)
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    /// Write the defaults if no config exists yet. Returns true when written.
    pub fn ensure_exists(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::defaults().save(path)?;
        Ok(true)
    }
}
