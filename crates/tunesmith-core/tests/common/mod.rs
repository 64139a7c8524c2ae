//! Shared fakes for controller integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{Notify, watch};

use tunesmith_core::domain::{ApiError, Artifact, GenerationRequest, GenerationTask, RemoteTaskId};
use tunesmith_core::ports::{CreateAck, GenerationApi, ManualClock, RemoteStatus};
use tunesmith_core::{ControllerConfig, GenerationController};

const WAIT: Duration = Duration::from_secs(5);

/// `GenerationApi` that replays queued answers.
///
/// An empty create queue acknowledges with `task-N`; an empty status queue
/// answers "in progress, no percentage".
#[derive(Default)]
pub struct ScriptedApi {
    creates: Mutex<VecDeque<Result<CreateAck, ApiError>>>,
    statuses: Mutex<VecDeque<Result<RemoteStatus, ApiError>>>,
    queried: Mutex<Vec<RemoteTaskId>>,
    create_calls: AtomicUsize,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    create_gate: Option<Arc<Notify>>,
    status_gate: Option<Arc<Notify>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_creates<I>(self, creates: I) -> Self
    where
        I: IntoIterator<Item = Result<CreateAck, ApiError>>,
    {
        self.creates.lock().unwrap().extend(creates);
        self
    }

    pub fn with_statuses<I>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = Result<RemoteStatus, ApiError>>,
    {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    /// Every create call waits for one `notify_one` on the gate.
    pub fn with_create_gate(mut self, gate: Arc<Notify>) -> Self {
        self.create_gate = Some(gate);
        self
    }

    /// Every status call waits for one `notify_one` on the gate.
    pub fn with_status_gate(mut self, gate: Arc<Notify>) -> Self {
        self.status_gate = Some(gate);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn queried(&self) -> Vec<RemoteTaskId> {
        self.queried.lock().unwrap().clone()
    }
}

/// Decrements the in-flight counter even if the call is aborted mid-way.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationApi for ScriptedApi {
    async fn create(&self, _request: &GenerationRequest) -> Result<CreateAck, ApiError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.create_gate {
            gate.notified().await;
        }
        self.creates
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CreateAck::new(format!("task-{n}"))))
    }

    async fn status(&self, task_id: &RemoteTaskId) -> Result<RemoteStatus, ApiError> {
        let _guard = InFlight::enter(&self.in_flight, &self.max_in_flight);
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.queried.lock().unwrap().push(task_id.clone());
        if let Some(gate) = &self.status_gate {
            gate.notified().await;
        }
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(RemoteStatus::InProgress { progress: None }))
    }
}

pub fn in_progress(progress: Option<u8>) -> Result<RemoteStatus, ApiError> {
    Ok(RemoteStatus::InProgress { progress })
}

pub fn complete(audio_url: &str) -> Result<RemoteStatus, ApiError> {
    Ok(RemoteStatus::Complete(Artifact::new(audio_url, 180.0)))
}

pub fn failed(message: &str) -> Result<RemoteStatus, ApiError> {
    Ok(RemoteStatus::Failed {
        message: Some(message.to_string()),
    })
}

pub fn transport(message: &str) -> ApiError {
    ApiError::Transport(message.to_string())
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
    ))
}

/// Two-second polling with the other defaults.
pub fn config() -> ControllerConfig {
    ControllerConfig::default().with_poll_interval(Duration::from_secs(2))
}

pub fn controller(
    api: &Arc<ScriptedApi>,
    clock: &Arc<ManualClock>,
    config: ControllerConfig,
) -> GenerationController {
    GenerationController::builder(api.clone())
        .clock(clock.clone())
        .config(config)
        .build()
        .unwrap()
}

/// Yield until `cond` holds, failing the test after a few seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition never became true");
}

/// Let spawned tasks run for a while without waiting on anything specific.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Wait for the poller to park, then move the clock forward by `by`.
pub async fn tick(clock: &ManualClock, by: Duration) {
    eventually(|| clock.sleepers() >= 1).await;
    clock.advance(by);
}

pub async fn wait_for(
    rx: &mut watch::Receiver<GenerationTask>,
    pred: impl FnMut(&GenerationTask) -> bool,
) -> GenerationTask {
    tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for task state")
        .expect("controller dropped")
        .clone()
}
