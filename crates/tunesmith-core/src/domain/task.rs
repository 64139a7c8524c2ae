//! The generation task record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Artifact, GenerationError, ProgressEstimator, RemoteTaskId, SubmissionId, TaskStatus};

/// State of one generation, owned by the controller.
///
/// All transitions go through methods so the pairing invariants hold:
/// - `result.is_some()` iff `status == Complete`
/// - `error.is_some()` iff `status == Error`
///
/// Observers only ever see clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTask {
    pub submission: Option<SubmissionId>,
    pub id: Option<RemoteTaskId>,
    pub status: TaskStatus,

    /// 0-100, non-decreasing while `Generating`.
    pub progress: u8,

    pub result: Option<Artifact>,
    pub error: Option<String>,

    /// When the remote API accepted the request.
    pub submitted_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Successful status queries for the current task.
    pub polls: u32,
    pub consecutive_failures: u32,

    /// Text of the most recent transient poll failure, cleared on success.
    pub last_poll_error: Option<String>,
}

impl GenerationTask {
    pub fn idle() -> Self {
        Self {
            submission: None,
            id: None,
            status: TaskStatus::Idle,
            progress: 0,
            result: None,
            error: None,
            submitted_at: None,
            finished_at: None,
            polls: 0,
            consecutive_failures: 0,
            last_poll_error: None,
        }
    }

    /// Idle -> Submitting. Clears whatever a previous run left behind.
    pub fn begin_submit(&mut self, submission: SubmissionId) {
        *self = Self::idle();
        self.submission = Some(submission);
        self.status = TaskStatus::Submitting;
    }

    /// Submitting -> Generating.
    pub fn mark_generating(&mut self, id: RemoteTaskId, at: DateTime<Utc>) {
        self.id = Some(id);
        self.submitted_at = Some(at);
        self.progress = 0;
        self.status = TaskStatus::Generating;
    }

    /// In-progress poll: bump progress and clear the failure streak.
    pub fn record_progress(&mut self, remote: Option<u8>, estimator: &ProgressEstimator) {
        self.progress = estimator.next(self.progress, remote);
        self.record_poll_success();
    }

    /// Returns the length of the current failure streak.
    pub fn record_poll_failure(&mut self, message: String) -> u32 {
        self.consecutive_failures += 1;
        self.last_poll_error = Some(message);
        self.consecutive_failures
    }

    pub fn mark_complete(&mut self, artifact: Artifact, at: DateTime<Utc>) {
        self.record_poll_success();
        self.result = Some(artifact);
        self.error = None;
        self.progress = 100;
        self.finished_at = Some(at);
        self.status = TaskStatus::Complete;
    }

    pub fn mark_error(&mut self, error: &GenerationError, at: DateTime<Utc>) {
        self.result = None;
        self.error = Some(error.to_string());
        self.finished_at = Some(at);
        self.status = TaskStatus::Error;
    }

    /// Back to Idle, dropping id, result, error and progress.
    pub fn reset(&mut self) {
        *self = Self::idle();
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        self.submitted_at
            .and_then(|at| now.signed_duration_since(at).to_std().ok())
    }

    fn record_poll_success(&mut self) {
        self.polls += 1;
        self.consecutive_failures = 0;
        self.last_poll_error = None;
    }
}

impl Default for GenerationTask {
    fn default() -> Self {
        Self::idle()
    }
}
