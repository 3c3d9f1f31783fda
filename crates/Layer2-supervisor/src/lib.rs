//! # launchpad-supervisor
//!
//! Process supervision for Launchpad.
//! Runs each configured tool as a child process, captures its output line by
//! line and exposes a merged log feed across all tools.
//!
//! ## Features
//!
//! - Start/stop state machine per tool (`Supervisor`)
//! - Graceful stop with bounded kill escalation
//! - Per-run append-only log files
//! - Registry rebuild that keeps untouched tools running
//! - **Merged log feed with history and live subscription**

pub mod event;
pub mod log;
pub mod registry;
pub mod settings;
mod signal;
pub mod state;
pub mod supervisor;

// Supervisor
pub use settings::{RegistryConfig, SupervisorSettings};
pub use state::SupervisorState;
pub use supervisor::Supervisor;

// Registry
pub use event::{RegistryEvent, SupervisorEvent};
pub use registry::{RebuildReport, StatusSummary, SupervisorRegistry, ToolStatus};

// Log system
pub use log::{LineAssembler, LogFeed, LogLine, LogStream, RunLog};
