//! Registry - 도구 등록/관리
//!
//! - `tool` - ToolEntry (raw record) / ToolDescriptor (validated)
//! - `tools_config` - `tools_config.json` load/save + built-in defaults

pub mod tool;
pub mod tools_config;

// Tool
pub use tool::{
    default_log_path, moonraker_query_url, venv_interpreter, Invocation, ToolDescriptor,
    ToolEntry, ToolKind, DEFAULT_MOONRAKER_API_PORT,
};

// Tools config
pub use tools_config::{LoadedTools, ToolsConfig, TOOLS_CONFIG_FILE};
