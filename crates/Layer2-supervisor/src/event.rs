//! Events flowing from supervisors to the registry, and from the registry
//! to observers.

use crate::log::LogLine;
use crate::state::SupervisorState;
use serde::{Deserialize, Serialize};

/// Emitted by a single supervisor, in per-tool order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Line(LogLine),
    StateChanged {
        tool_id: String,
        from: SupervisorState,
        to: SupervisorState,
    },
}

/// Published on the registry's merged feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A log line from any tool
    Line(LogLine),

    /// A tool changed state
    StateChanged {
        tool_id: String,
        from: SupervisorState,
        to: SupervisorState,
    },

    /// The tool set was rebuilt from configuration
    Rebuilt {
        added: usize,
        removed: usize,
        updated: usize,
        rejected: usize,
    },
}

impl From<SupervisorEvent> for RegistryEvent {
    fn from(event: SupervisorEvent) -> Self {
        match event {
            SupervisorEvent::Line(line) => RegistryEvent::Line(line),
            SupervisorEvent::StateChanged { tool_id, from, to } => {
                RegistryEvent::StateChanged { tool_id, from, to }
            }
        }
    }
}

impl RegistryEvent {
    /// Tool this event concerns, if any
    pub fn tool_id(&self) -> Option<&str> {
        match self {
            RegistryEvent::Line(line) => Some(&line.tool_id),
            RegistryEvent::StateChanged { tool_id, .. } => Some(tool_id),
            RegistryEvent::Rebuilt { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogStream;

    #[test]
    fn test_registry_event_json_shape() {
        let event = RegistryEvent::from(SupervisorEvent::StateChanged {
            tool_id: "dash1".into(),
            from: SupervisorState::Starting,
            to: SupervisorState::Running,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["tool_id"], "dash1");
        assert_eq!(json["to"], "Running");

        let line = RegistryEvent::Line(LogLine::new("dash1", LogStream::Stderr, "boom"));
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["type"], "line");
        assert_eq!(json["stream"], "stderr");
        assert_eq!(line.tool_id(), Some("dash1"));

        let back: RegistryEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, line);
    }
}
