//! In-process stand-in for the remote generation API.
//!
//! Every created task reports progress for a fixed number of status queries
//! and then completes (or fails, if configured to). Useful for demos and for
//! running the CLI without credentials.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ApiError, Artifact, GenerationRequest, RemoteTaskId};
use crate::ports::{CreateAck, GenerationApi, RemoteStatus};

struct SimulatedTask {
    title: Option<String>,
    queries: u32,
}

struct SimulatedState {
    next_id: u64,
    tasks: HashMap<RemoteTaskId, SimulatedTask>,
}

pub struct SimulatedApi {
    polls_to_complete: u32,
    track_length: Duration,
    failure: Option<String>,
    state: Mutex<SimulatedState>,
}

impl SimulatedApi {
    pub fn new(polls_to_complete: u32) -> Self {
        Self {
            polls_to_complete: polls_to_complete.max(1),
            track_length: Duration::from_secs(180),
            failure: None,
            state: Mutex::new(SimulatedState {
                next_id: 1,
                tasks: HashMap::new(),
            }),
        }
    }

    /// Tasks end in `error` with this message instead of completing.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn with_track_length(mut self, length: Duration) -> Self {
        self.track_length = length;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl GenerationApi for SimulatedApi {
    async fn create(&self, request: &GenerationRequest) -> Result<CreateAck, ApiError> {
        let mut state = self.lock();
        let task_id = RemoteTaskId::new(format!("sim-{}", state.next_id));
        state.next_id += 1;
        state.tasks.insert(
            task_id.clone(),
            SimulatedTask {
                title: request.title.clone(),
                queries: 0,
            },
        );
        tracing::debug!(%task_id, "simulated task created");
        Ok(CreateAck { task_id })
    }

    async fn status(&self, task_id: &RemoteTaskId) -> Result<RemoteStatus, ApiError> {
        let mut state = self.lock();
        let task = state.tasks.get_mut(task_id).ok_or_else(|| ApiError::Http {
            status: 404,
            body: format!("unknown task {task_id}"),
        })?;
        task.queries += 1;

        if task.queries < self.polls_to_complete {
            let progress = task.queries * 100 / self.polls_to_complete;
            return Ok(RemoteStatus::InProgress {
                progress: Some(progress.min(99) as u8),
            });
        }

        if let Some(message) = &self.failure {
            return Ok(RemoteStatus::Failed {
                message: Some(message.clone()),
            });
        }

        let mut artifact = Artifact::new(
            format!("simulated://{task_id}.mp3"),
            self.track_length.as_secs_f64(),
        );
        artifact.title = task.title.clone();
        Ok(RemoteStatus::Complete(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_after_configured_polls() {
        let api = SimulatedApi::new(3);
        let ack = api
            .create(&GenerationRequest::new("jazz").with_title("Blue"))
            .await
            .unwrap();
        assert_eq!(ack.task_id, RemoteTaskId::from("sim-1"));

        assert_eq!(
            api.status(&ack.task_id).await.unwrap(),
            RemoteStatus::InProgress { progress: Some(33) }
        );
        assert_eq!(
            api.status(&ack.task_id).await.unwrap(),
            RemoteStatus::InProgress { progress: Some(66) }
        );
        match api.status(&ack.task_id).await.unwrap() {
            RemoteStatus::Complete(artifact) => {
                assert_eq!(artifact.audio_url, "simulated://sim-1.mp3");
                assert_eq!(artifact.title.as_deref(), Some("Blue"));
                assert_eq!(artifact.duration_secs, 180.0);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_simulation_reports_message() {
        let api = SimulatedApi::new(1).failing_with("quota exceeded");
        let ack = api.create(&GenerationRequest::new("jazz")).await.unwrap();

        assert_eq!(
            api.status(&ack.task_id).await.unwrap(),
            RemoteStatus::Failed {
                message: Some("quota exceeded".into())
            }
        );
    }

    #[tokio::test]
    async fn unknown_task_is_404() {
        let api = SimulatedApi::new(2);
        let err = api.status(&RemoteTaskId::from("nope")).await.unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 404, .. }));
    }
}
