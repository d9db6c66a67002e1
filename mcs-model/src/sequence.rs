use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution state of a sequence.
///
/// `Idle` only exists before the first run. `Running` can be re-entered from
/// any terminal state, so a finished sequence may be started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    Idle,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl SequenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceState::Idle => "idle",
            SequenceState::Running => "running",
            SequenceState::Completed => "completed",
            SequenceState::Failed => "failed",
            SequenceState::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SequenceState::Completed | SequenceState::Failed | SequenceState::Stopped
        )
    }

    pub fn can_transition_to(&self, next: SequenceState) -> bool {
        match (self, next) {
            (SequenceState::Idle, SequenceState::Running) => true,
            (SequenceState::Running, next) => next.is_terminal(),
            (current, SequenceState::Running) => current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sequence known to the process service. The step list itself lives in
/// the execution backend; only its length is needed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDefinition {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_steps")]
    pub steps: u32,
}

fn default_steps() -> u32 {
    1
}

impl SequenceDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, steps: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            steps,
        }
    }
}

/// Snapshot of a sequence, emitted on every state transition and progress
/// update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStatus {
    pub sequence_id: String,
    pub state: SequenceState,
    /// Monotonic per-sequence counter; bumps on every emitted status.
    pub revision: u64,
    pub current_step: u32,
    pub total_steps: u32,
    /// Fraction of steps completed, `0.0..=1.0`.
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SequenceStatus {
    pub fn idle(sequence_id: impl Into<String>, total_steps: u32) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            state: SequenceState::Idle,
            revision: 0,
            current_step: 0,
            total_steps,
            progress: 0.0,
            started_at: None,
            finished_at: None,
            updated_at: Utc::now(),
            error: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == SequenceState::Running
    }

    /// Sets the current step (clamped to the total) and recomputes progress.
    pub fn set_step(&mut self, step: u32) {
        self.current_step = step.min(self.total_steps);
        self.progress = if self.total_steps == 0 {
            1.0
        } else {
            f64::from(self.current_step) / f64::from(self.total_steps)
        };
    }
}

/// Envelope written to streaming consumers:
/// `{"type": "sequence_status", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SequenceStreamMessage {
    SequenceStatus(SequenceStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_is_reentrant_from_terminal_states() {
        use SequenceState::*;

        assert!(Idle.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));
        assert!(Running.can_transition_to(Stopped));
        assert!(Completed.can_transition_to(Running));
        assert!(Stopped.can_transition_to(Running));
        assert!(Failed.can_transition_to(Running));

        assert!(!Running.can_transition_to(Running));
        assert!(!Idle.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Stopped));
        assert!(!Stopped.can_transition_to(Idle));
    }

    #[test]
    fn stream_envelope_is_tagged() {
        let status = SequenceStatus::idle("S1", 4);
        let value = serde_json::to_value(SequenceStreamMessage::SequenceStatus(
            status,
        ))
        .unwrap();

        assert_eq!(value["type"], "sequence_status");
        assert_eq!(value["data"]["sequence_id"], "S1");
        assert_eq!(value["data"]["state"], "idle");
    }

    #[test]
    fn set_step_clamps_and_computes_progress() {
        let mut status = SequenceStatus::idle("S1", 4);
        status.set_step(1);
        assert_eq!(status.progress, 0.25);
        status.set_step(9);
        assert_eq!(status.current_step, 4);
        assert_eq!(status.progress, 1.0);
    }
}
