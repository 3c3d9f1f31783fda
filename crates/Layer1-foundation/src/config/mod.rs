//! Config - 통합 설정 관리
//!
//! - `launcher.rs` - LauncherConfig (supervisor timing, feed sizing)

mod launcher;

pub use launcher::{LauncherConfig, LAUNCHER_CONFIG_FILE};
