//! Storage module for Launchpad
//!
//! - `json`: JSON - 범용 파일 저장/로드 (launcher.json, tools_config.json)

mod json;

// JSON Storage (범용)
pub use json::{read_json, write_json, JsonStore};
