//! Supervisor state machine

use serde::{Deserialize, Serialize};

/// Lifecycle state of one supervised tool
///
/// ```text
/// Stopped ──start──► Starting ──spawned──► Running ──exit 0──► Stopped
///    ▲                  │                     │  └──exit≠0──► Error
///    │            spawn failed                │
///    │                  ▼                   stop
///    │                Error                   ▼
///    └─────────────── exit / kill ────── Stopping
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupervisorState {
    /// No process; ready to start
    #[default]
    Stopped,

    /// Spawn in progress
    Starting,

    /// Process is alive
    Running,

    /// Termination requested, waiting for exit
    Stopping,

    /// Last run failed to spawn or exited abnormally
    Error,
}

impl SupervisorState {
    /// Every state, in display order
    pub const ALL: [SupervisorState; 5] = [
        SupervisorState::Stopped,
        SupervisorState::Starting,
        SupervisorState::Running,
        SupervisorState::Stopping,
        SupervisorState::Error,
    ];

    /// A new run may be started from this state
    pub fn can_start(&self) -> bool {
        matches!(self, SupervisorState::Stopped | SupervisorState::Error)
    }

    /// A process exists (or is about to) and can be asked to stop
    pub fn is_active(&self) -> bool {
        matches!(self, SupervisorState::Starting | SupervisorState::Running)
    }

    /// Starting or Stopping
    pub fn is_transitional(&self) -> bool {
        matches!(self, SupervisorState::Starting | SupervisorState::Stopping)
    }

    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SupervisorState::Stopped => "Stopped",
            SupervisorState::Starting => "Starting",
            SupervisorState::Running => "Running",
            SupervisorState::Stopping => "Stopping",
            SupervisorState::Error => "Error",
        }
    }

    /// Get a symbol for the state (for status listings)
    pub fn symbol(&self) -> &'static str {
        match self {
            SupervisorState::Stopped => "◯",
            SupervisorState::Starting => "◎",
            SupervisorState::Running => "⟳",
            SupervisorState::Stopping => "⊘",
            SupervisorState::Error => "✗",
        }
    }
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_allowed_only_when_idle() {
        let startable: Vec<_> = SupervisorState::ALL
            .iter()
            .filter(|s| s.can_start())
            .collect();
        assert_eq!(
            startable,
            vec![&SupervisorState::Stopped, &SupervisorState::Error]
        );
    }

    #[test]
    fn test_default_is_stopped() {
        assert_eq!(SupervisorState::default(), SupervisorState::Stopped);
        assert_eq!(SupervisorState::Stopping.to_string(), "Stopping");
        assert!(SupervisorState::Starting.is_transitional());
        assert!(!SupervisorState::Error.is_active());
    }
}
