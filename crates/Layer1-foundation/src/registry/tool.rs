//! Tool descriptors
//!
//! `ToolEntry` is the loosely shaped record persisted in `tools_config.json`.
//! `ToolEntry::validate` turns it into a `ToolDescriptor`: a closed structure
//! with every path resolved and the child environment computed, or an
//! `Error::InvalidTool` naming the first problem found.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Moonraker's default API port
pub const DEFAULT_MOONRAKER_API_PORT: u16 = 7125;

// ============================================================================
// ToolKind
// ============================================================================

/// Tool kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Long-running worker (dashboards); has a Stop action
    #[default]
    Normal,
    /// Runs to completion; no persistent Stop action
    Oneshot,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Normal => "normal",
            ToolKind::Oneshot => "oneshot",
        }
    }

    pub fn is_oneshot(&self) -> bool {
        matches!(self, ToolKind::Oneshot)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ToolEntry (persisted)
// ============================================================================

/// Persistent configuration for one launcher tool
///
/// Unknown keys are rejected so a typo never silently drops a setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolEntry {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub label: String,

    /// Working directory, relative to the launcher base directory
    #[serde(default)]
    pub project_dir: String,

    /// Entry script, relative to `project_dir`
    #[serde(default)]
    pub script: String,

    #[serde(default)]
    pub kind: ToolKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Exposed to the child as `MOONRAKER_API_URL`. A bare host is expanded
    /// to the printer query URL using `moonraker_api_port`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moonraker_url: Option<String>,

    /// Port Moonraker listens on when `moonraker_url` is a bare host (7125)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moonraker_api_port: Option<u16>,

    /// Local dashboard port, passed as `--port`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moonraker_port: Option<u16>,

    /// Explicit interpreter; the shared venv is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    /// Extra arguments appended after the script
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra environment variables for the child
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Per-tool log file; defaults to `<project_dir>/launcher_<label>.log`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
}

impl ToolEntry {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        project_dir: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            project_dir: project_dir.into(),
            script: script.into(),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: ToolKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn with_moonraker_url(mut self, url: impl Into<String>) -> Self {
        self.moonraker_url = Some(url.into());
        self
    }

    pub fn with_moonraker_api_port(mut self, port: u16) -> Self {
        self.moonraker_api_port = Some(port);
        self
    }

    pub fn with_dashboard_port(mut self, port: u16) -> Self {
        self.moonraker_port = Some(port);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_log_path(mut self, path: impl Into<String>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Validate and resolve against the launcher base directory
    pub fn validate(&self, base_dir: &Path) -> Result<ToolDescriptor> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(Error::invalid_tool("<unnamed>", "missing field 'id'"));
        }
        let label = self.label.trim();
        if label.is_empty() {
            return Err(Error::invalid_tool(id, "missing field 'label'"));
        }
        let project_dir = self.project_dir.trim();
        if project_dir.is_empty() {
            return Err(Error::invalid_tool(id, "missing field 'project_dir'"));
        }
        let script = self.script.trim();
        if script.is_empty() {
            return Err(Error::invalid_tool(id, "missing field 'script'"));
        }
        if self.moonraker_port == Some(0) {
            return Err(Error::invalid_tool(id, "dashboard port must be non-zero"));
        }
        if let Some(key) = self.env.keys().find(|k| k.is_empty() || k.contains('=')) {
            return Err(Error::invalid_tool(
                id,
                format!("invalid environment variable name '{}'", key),
            ));
        }

        let working_dir = base_dir.join(project_dir);
        let script_path = working_dir.join(script);

        let interpreter = match self.interpreter.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
            _ => venv_interpreter(base_dir),
        };

        let mut args = Vec::new();
        if let Some(port) = self.moonraker_port {
            args.push("--port".to_string());
            args.push(port.to_string());
        }
        args.extend(self.args.iter().cloned());

        let moonraker_url = match self.moonraker_url.as_deref().map(str::trim) {
            Some(url) if url.contains("://") => Some(url.to_string()),
            Some(host) => moonraker_query_url(host, self.moonraker_api_port),
            None => None,
        };

        let mut env = BTreeMap::new();
        env.insert("PYTHONUTF8".to_string(), "1".to_string());
        env.insert("PYTHONIOENCODING".to_string(), "utf-8".to_string());
        env.insert("LAUNCHER_TOOL_LABEL".to_string(), label.to_string());
        if let Some(ref url) = moonraker_url {
            env.insert("MOONRAKER_API_URL".to_string(), url.clone());
        }
        for (key, value) in &self.env {
            env.insert(key.clone(), value.clone());
        }

        let log_path = match self.log_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => base_dir.join(path),
            _ => default_log_path(&working_dir, label),
        };

        Ok(ToolDescriptor {
            id: id.to_string(),
            label: label.to_string(),
            kind: self.kind,
            enabled: self.enabled,
            invocation: Invocation {
                interpreter,
                script: script_path,
                working_dir,
                args,
            },
            env,
            log_path,
            moonraker_url,
            dashboard_port: self.moonraker_port,
        })
    }
}

// ============================================================================
// ToolDescriptor (validated)
// ============================================================================

/// How to launch a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub interpreter: PathBuf,
    pub script: PathBuf,
    pub working_dir: PathBuf,
    /// Arguments after the script
    pub args: Vec<String>,
}

impl Invocation {
    /// Full argument list passed to the interpreter
    pub fn command_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.script.to_string_lossy().into_owned());
        args.extend(self.args.iter().cloned());
        args
    }

    /// Check that the paths exist before spawning
    ///
    /// A bare interpreter name (`sh`, `python3`) is left to PATH lookup at
    /// spawn time.
    pub fn preflight(&self) -> std::result::Result<(), String> {
        if !self.working_dir.is_dir() {
            return Err(format!(
                "Project dir not found: {}",
                self.working_dir.display()
            ));
        }
        let has_dir = self
            .interpreter
            .parent()
            .map_or(false, |p| !p.as_os_str().is_empty());
        if has_dir && !self.interpreter.exists() {
            return Err(format!(
                "Interpreter not found: {}",
                self.interpreter.display()
            ));
        }
        if !self.script.exists() {
            return Err(format!("Script not found: {}", self.script.display()));
        }
        Ok(())
    }
}

/// A validated tool, consumed read-only by the supervisor layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub id: String,
    pub label: String,
    pub kind: ToolKind,
    pub enabled: bool,
    pub invocation: Invocation,
    /// Overrides injected into the child environment
    pub env: BTreeMap<String, String>,
    pub log_path: PathBuf,
    pub moonraker_url: Option<String>,
    pub dashboard_port: Option<u16>,
}

impl ToolDescriptor {
    pub fn is_oneshot(&self) -> bool {
        self.kind.is_oneshot()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Interpreter from the shared virtualenv at `<base>/venv`
///
/// Falls back to the platform's usual location so the spawn error names a
/// useful path.
pub fn venv_interpreter(base_dir: &Path) -> PathBuf {
    let venv = base_dir.join("venv");
    let candidates = [
        venv.join("bin").join("python3"),
        venv.join("bin").join("python"),
        venv.join("Scripts").join("python.exe"),
    ];

    if let Some(found) = candidates.iter().find(|p| p.exists()) {
        return found.clone();
    }

    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}

/// `<project_dir>/launcher_<safe label>.log`
pub fn default_log_path(project_dir: &Path, label: &str) -> PathBuf {
    let safe: String = label
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    project_dir.join(format!("launcher_{}.log", safe))
}

/// Moonraker object-query URL from a host and optional API port
pub fn moonraker_query_url(host: &str, api_port: Option<u16>) -> Option<String> {
    let host = host.trim();
    if host.is_empty() {
        return None;
    }
    let port = api_port.unwrap_or(DEFAULT_MOONRAKER_API_PORT);
    Some(format!("http://{}:{}/printer/objects/query", host, port))
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard() -> ToolEntry {
        ToolEntry::new("voron-temps", "Voron Temps", "VoronTemps", "app.py")
    }

    #[test]
    fn test_validate_resolves_paths() {
        let base = Path::new("/opt/launcher");
        let desc = dashboard().with_dashboard_port(5001).validate(base).unwrap();

        assert_eq!(desc.id, "voron-temps");
        assert_eq!(desc.kind, ToolKind::Normal);
        assert_eq!(desc.invocation.working_dir, base.join("VoronTemps"));
        assert_eq!(desc.invocation.script, base.join("VoronTemps/app.py"));
        assert_eq!(desc.invocation.args, vec!["--port", "5001"]);
        assert_eq!(
            desc.log_path,
            base.join("VoronTemps").join("launcher_voron_temps.log")
        );
        assert_eq!(desc.env.get("LAUNCHER_TOOL_LABEL").unwrap(), "Voron Temps");
        assert_eq!(desc.env.get("PYTHONUTF8").unwrap(), "1");
        assert!(!desc.env.contains_key("MOONRAKER_API_URL"));
    }

    #[test]
    fn test_validate_injects_moonraker_url() {
        let desc = dashboard()
            .with_moonraker_url("  http://printer:7125/printer/objects/query ")
            .validate(Path::new("/base"))
            .unwrap();

        assert_eq!(
            desc.env.get("MOONRAKER_API_URL").map(String::as_str),
            Some("http://printer:7125/printer/objects/query")
        );
    }

    #[test]
    fn test_validate_missing_fields() {
        let base = Path::new("/base");

        let err = ToolEntry::new("", "x", "d", "s.py").validate(base).unwrap_err();
        assert!(matches!(err, Error::InvalidTool { .. }));

        let err = ToolEntry::new("a", "x", "d", "  ").validate(base).unwrap_err();
        assert!(err.to_string().contains("script"));

        let err = ToolEntry::new("a", "", "d", "s.py").validate(base).unwrap_err();
        assert!(err.to_string().contains("label"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let raw = r#"{"id": "a", "label": "A", "project_dir": "d", "script": "s.py", "colour": "red"}"#;
        assert!(serde_json::from_str::<ToolEntry>(raw).is_err());

        let raw = r#"{"id": "a", "label": "A", "project_dir": "d", "script": "s.py", "kind": "daemon"}"#;
        assert!(serde_json::from_str::<ToolEntry>(raw).is_err());
    }

    #[test]
    fn test_user_env_overrides_defaults() {
        let desc = dashboard()
            .with_env("PYTHONUTF8", "0")
            .with_env("TARGET", "http://svc")
            .validate(Path::new("/base"))
            .unwrap();
        assert_eq!(desc.env.get("PYTHONUTF8").unwrap(), "0");
        assert_eq!(desc.env.get("TARGET").unwrap(), "http://svc");

        let err = dashboard()
            .with_env("BAD=NAME", "1")
            .validate(Path::new("/base"))
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_command_args_start_with_script() {
        let desc = dashboard()
            .with_interpreter("/usr/bin/python3")
            .with_dashboard_port(8080)
            .validate(Path::new("/base"))
            .unwrap();

        assert_eq!(desc.invocation.interpreter, PathBuf::from("/usr/bin/python3"));
        let args = desc.invocation.command_args();
        assert_eq!(args[0], "/base/VoronTemps/app.py");
        assert_eq!(&args[1..], &["--port", "8080"]);
    }

    #[test]
    fn test_preflight_reports_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tool")).unwrap();

        let desc = ToolEntry::new("t", "T", "tool", "run.sh")
            .with_interpreter("/bin/sh")
            .validate(dir.path())
            .unwrap();
        let err = desc.invocation.preflight().unwrap_err();
        assert!(err.starts_with("Script not found"));

        std::fs::write(dir.path().join("tool/run.sh"), "exit 0\n").unwrap();
        let desc = ToolEntry::new("t", "T", "tool", "run.sh")
            .with_interpreter("sh")
            .validate(dir.path())
            .unwrap();
        assert!(desc.invocation.preflight().is_ok());

        let desc = ToolEntry::new("t", "T", "missing", "run.sh")
            .validate(dir.path())
            .unwrap();
        assert!(desc.invocation.preflight().unwrap_err().starts_with("Project dir"));
    }

    #[test]
    fn test_default_log_path_sanitizes_label() {
        let path = default_log_path(Path::new("/p"), "Qidi Webcamd restart!");
        assert_eq!(path, PathBuf::from("/p/launcher_qidi_webcamd_restart_.log"));
    }

    #[test]
    fn test_bare_moonraker_host_expanded() {
        let base = Path::new("/base");
        let desc = dashboard()
            .with_moonraker_url("192.168.1.226")
            .validate(base)
            .unwrap();
        assert_eq!(
            desc.moonraker_url.as_deref(),
            Some("http://192.168.1.226:7125/printer/objects/query")
        );

        let desc = dashboard()
            .with_moonraker_url(" voron.local ")
            .with_moonraker_api_port(7130)
            .validate(base)
            .unwrap();
        assert_eq!(
            desc.env.get("MOONRAKER_API_URL").map(String::as_str),
            Some("http://voron.local:7130/printer/objects/query")
        );

        // 포트만 있고 호스트가 없으면 URL 없음
        let desc = dashboard()
            .with_moonraker_url("")
            .with_moonraker_api_port(7130)
            .validate(base)
            .unwrap();
        assert!(desc.moonraker_url.is_none());
    }

    #[test]
    fn test_moonraker_query_url() {
        assert_eq!(
            moonraker_query_url("192.168.1.20", None).as_deref(),
            Some("http://192.168.1.20:7125/printer/objects/query")
        );
        assert_eq!(
            moonraker_query_url("voron.local", Some(7130)).as_deref(),
            Some("http://voron.local:7130/printer/objects/query")
        );
        assert!(moonraker_query_url("  ", None).is_none());
    }
}
