//! # launchpad-foundation
//!
//! Foundation layer for Launchpad:
//! - Error: 공통 에러 타입 (`Error`, `Result`)
//! - Storage: JsonStore (글로벌 / 프로젝트 설정 디렉토리)
//! - Config: LauncherConfig (supervisor timing, feed sizing)
//! - Registry: ToolEntry / ToolDescriptor, `tools_config.json`
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  tools_config.json ──► ToolEntry ──validate──►          │
//! │                                   ToolDescriptor        │
//! │                                        │                │
//! │  launcher.json ──► LauncherConfig      │                │
//! │                         │              ▼                │
//! │                         └──►  Supervisor Registry       │
//! │                               (launchpad-supervisor)    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{LauncherConfig, LAUNCHER_CONFIG_FILE};

// ============================================================================
// Registry (도구 레지스트리)
// ============================================================================
pub use registry::{
    default_log_path, moonraker_query_url, venv_interpreter, Invocation, LoadedTools,
    ToolDescriptor, ToolEntry, ToolKind, ToolsConfig, DEFAULT_MOONRAKER_API_PORT,
    TOOLS_CONFIG_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{read_json, write_json, JsonStore};
