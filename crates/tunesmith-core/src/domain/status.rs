//! Lifecycle state of a generation task.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status.
///
/// State transitions:
/// - Idle -> Submitting -> Generating -> Complete
/// - Idle -> Submitting -> Error (create rejected)
/// - Generating -> Generating (progress update)
/// - Generating -> Error (remote failure, retry budget exhausted, timeout)
/// - any -> Idle (reset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Nothing submitted.
    #[default]
    Idle,

    /// Create request sent, waiting for the remote task id.
    Submitting,

    /// Remote task accepted, polling for completion.
    Generating,

    /// Remote task finished with a playable artifact.
    Complete,

    /// Submission or generation failed.
    Error,
}

impl TaskStatus {
    /// Is this a terminal state (no further automatic transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Error)
    }

    /// Is a submission in flight (the controller owns pending I/O)?
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Submitting | TaskStatus::Generating)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Idle => "idle",
            TaskStatus::Submitting => "submitting",
            TaskStatus::Generating => "generating",
            TaskStatus::Complete => "complete",
            TaskStatus::Error => "error",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
