//! GenerationController - 1 件の生成のライフサイクル管理
//!
//! # フロー
//! 1. `start()` がリクエストを検証し、`Submitting` に遷移して create を送る
//! 2. 受理されたら `Generating` に遷移し、ポーリングタスクを spawn する。
//!    1 間隔待つ → status 問い合わせ → 結果を反映、を終端状態まで繰り返す。
//!    問い合わせを await してから次の待機に入るので、同時に飛ぶ問い合わせは常に 1 件
//! 3. `reset()` / `dispose()` は epoch を進めてポーリングタスクを abort する。
//!    古い epoch の応答は到着時に捨てる
//!
//! # ロック
//! - 状態は `std::sync::Mutex` の中。`.await` をまたいで保持しない
//! - observer はロック解放後に呼ぶ

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::builder::ControllerBuilder;
use super::config::{ConfigError, ControllerConfig, StartPolicy};
use crate::domain::{
    ApiError, ErrorKind, GenerationError, GenerationRequest, GenerationTask, ProgressEstimator,
    RemoteTaskId, SubmissionId, TaskStatus,
};
use crate::ports::{
    Clock, CreateAck, GenerationApi, IdGenerator, RemoteStatus, SubscriptionId, TaskObserver,
};

/// コントローラへのハンドル（clone は同じタスクを共有）
#[derive(Clone)]
pub struct GenerationController {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn GenerationApi>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    config: ControllerConfig,
    estimator: ProgressEstimator,
    state: Mutex<ControllerState>,
    watch_tx: watch::Sender<GenerationTask>,
}

struct ControllerState {
    task: GenerationTask,

    /// start/reset/dispose のたびに進む。非同期処理は開始時の epoch を持ち、
    /// 一致しなくなった時点で結果を無視される。
    epoch: u64,

    poller: Option<JoinHandle<()>>,
    observers: Vec<(SubscriptionId, Arc<dyn TaskObserver>)>,
    next_subscription: u64,
    disposed: bool,
}

impl ControllerState {
    fn cancel_pending(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

impl GenerationController {
    pub fn builder(api: Arc<dyn GenerationApi>) -> ControllerBuilder {
        ControllerBuilder::new(api)
    }

    /// SystemClock 上のコントローラを作成
    pub fn new(api: Arc<dyn GenerationApi>, config: ControllerConfig) -> Result<Self, ConfigError> {
        ControllerBuilder::new(api).config(config).build()
    }

    pub(crate) fn from_parts(
        api: Arc<dyn GenerationApi>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: ControllerConfig,
    ) -> Self {
        let (watch_tx, _) = watch::channel(GenerationTask::idle());
        let inner = Inner {
            api,
            clock,
            ids,
            estimator: config.estimator(),
            config,
            state: Mutex::new(ControllerState {
                task: GenerationTask::idle(),
                epoch: 0,
                poller: None,
                observers: Vec::new(),
                next_subscription: 1,
                disposed: false,
            }),
            watch_tx,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// 生成を送信し、リモートが受理したらポーリングを開始
    ///
    /// create の応答が返った時点で戻る。完了は `watch()` / `subscribe()` で通知。
    ///
    /// # Errors
    /// - `Validation`, `Busy`, `Disposed`: 状態は変わらず、何も送信しない
    /// - `Create`: タスクは同じメッセージで `Error` になっている
    /// - `Cancelled`: `reset()`/`dispose()`/置き換えの `start()` が先に走った。
    ///   遅れて届いた受理応答は破棄済み
    pub async fn start(&self, request: GenerationRequest) -> Result<RemoteTaskId, GenerationError> {
        if let Err(err) = request.validate() {
            debug!(error = %err, "rejecting generation request");
            return Err(err);
        }
        let (epoch, submission) = self.inner.admit()?;
        info!(
            %submission,
            tags = request.tags.len(),
            instrumental = request.instrumental,
            "submitting generation request"
        );

        let outcome = self.inner.api.create(&request).await;
        Inner::finish_submit(&self.inner, epoch, submission, outcome)
    }

    /// ポーリングを取り消して `Idle` に戻す（どの状態からでも安全）
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        state.cancel_pending();
        state.task.reset();
        info!(epoch = state.epoch, "generation reset");
        self.inner.publish(state);
    }

    /// 破棄: ポーリング取り消し、observer 解除、以降の start を拒否（冪等）
    ///
    /// # 進行中のタスク
    /// - `Error`（"controller has been disposed"）にして `watch()` にだけ流す
    /// - 終端状態を待っている receiver はこれで抜けられる
    /// - observer は先に解除されるので、この遷移は受け取らない
    pub fn dispose(&self) {
        let mut state = self.inner.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.cancel_pending();
        state.observers.clear();
        info!("generation controller disposed");

        if state.task.status.is_active() {
            let now = self.inner.clock.now();
            state.task.mark_error(&GenerationError::Disposed, now);
            self.inner.publish(state);
        }
    }

    pub fn snapshot(&self) -> GenerationTask {
        self.inner.lock().task.clone()
    }

    pub fn status(&self) -> TaskStatus {
        self.inner.lock().task.status
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// 常に最新のスナップショットを持つ receiver
    pub fn watch(&self) -> watch::Receiver<GenerationTask> {
        self.inner.watch_tx.subscribe()
    }

    /// 遷移のたびに呼ばれるコールバックを登録
    ///
    /// `dispose()` 後は登録されずにすぐ drop される。
    pub fn subscribe<O>(&self, observer: O) -> SubscriptionId
    where
        O: TaskObserver + 'static,
    {
        let mut state = self.inner.lock();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        if !state.disposed {
            state.observers.push((id, Arc::new(observer)));
        }
        id
    }

    /// 未知の subscription なら false
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.inner.lock();
        let before = state.observers.len();
        state.observers.retain(|(sid, _)| *sid != id);
        state.observers.len() != before
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 現在のタスクを watch チャネルと observer に流す
    ///
    /// observer を呼ぶ前にロックを解放する。
    fn publish(&self, state: MutexGuard<'_, ControllerState>) {
        let snapshot = state.task.clone();
        let observers: Vec<Arc<dyn TaskObserver>> = state
            .observers
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        self.watch_tx.send_replace(snapshot.clone());
        drop(state);

        for observer in observers {
            observer.on_change(&snapshot);
        }
    }

    /// Idle/終端 -> Submitting（StartPolicy に従う）
    fn admit(&self) -> Result<(u64, SubmissionId), GenerationError> {
        let mut state = self.lock();
        if state.disposed {
            return Err(GenerationError::Disposed);
        }
        let current = state.task.status;
        if current.is_active() {
            match self.config.start_policy {
                StartPolicy::Reject => {
                    debug!(status = %current, "start rejected, generation in flight");
                    return Err(GenerationError::Busy { status: current });
                }
                StartPolicy::Replace => {
                    info!(
                        status = %current,
                        task_id = ?state.task.id,
                        "replacing in-flight generation"
                    );
                }
            }
        }

        state.cancel_pending();
        let submission = self.ids.next_submission_id();
        state.task.begin_submit(submission);
        let epoch = state.epoch;
        self.publish(state);
        Ok((epoch, submission))
    }

    /// create の応答を反映
    /// - 成功: Submitting -> Generating（ポーリングタスクを spawn）
    /// - 失敗: Submitting -> Error
    fn finish_submit(
        this: &Arc<Self>,
        epoch: u64,
        submission: SubmissionId,
        outcome: Result<CreateAck, ApiError>,
    ) -> Result<RemoteTaskId, GenerationError> {
        let mut state = this.lock();
        if state.epoch != epoch {
            warn!(%submission, "create response arrived after cancellation, discarding");
            return Err(if state.disposed {
                GenerationError::Disposed
            } else {
                GenerationError::Cancelled
            });
        }

        let now = this.clock.now();
        match outcome {
            Ok(CreateAck { task_id }) => {
                state.task.mark_generating(task_id.clone(), now);
                state.poller = Some(tokio::spawn(poll_loop(
                    Arc::downgrade(this),
                    Arc::clone(&this.clock),
                    this.config.poll_interval,
                    epoch,
                    task_id.clone(),
                )));
                info!(%submission, %task_id, "generation accepted, polling for completion");
                this.publish(state);
                Ok(task_id)
            }
            Err(source) => {
                let error = GenerationError::Create(source);
                warn!(%submission, error = %error, "create request failed");
                state.task.mark_error(&error, now);
                this.publish(state);
                Err(error)
            }
        }
    }

    /// ポーリング 1 回分。止めるべきなら `true`
    async fn poll(&self, epoch: u64, task_id: &RemoteTaskId) -> bool {
        if self.expire_if_overdue(epoch) {
            return true;
        }
        debug!(%task_id, epoch, "querying generation status");
        let outcome = self.api.status(task_id).await;
        self.apply_poll(epoch, task_id, outcome)
    }

    fn deadline_error(&self, task: &GenerationTask, now: DateTime<Utc>) -> Option<GenerationError> {
        let limit = self.config.max_duration?;
        let elapsed = task.elapsed(now)?;
        (elapsed >= limit).then_some(GenerationError::Timeout(limit))
    }

    /// タスクが古いか `max_duration` を超えていればポーリングを止める
    fn expire_if_overdue(&self, epoch: u64) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch || state.task.status != TaskStatus::Generating {
            return true;
        }
        let now = self.clock.now();
        let Some(error) = self.deadline_error(&state.task, now) else {
            return false;
        };
        warn!(task_id = ?state.task.id, error = %error, "generation timed out");
        state.task.mark_error(&error, now);
        state.poller = None;
        self.publish(state);
        true
    }

    fn apply_poll(
        &self,
        epoch: u64,
        task_id: &RemoteTaskId,
        outcome: Result<RemoteStatus, ApiError>,
    ) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch || state.task.status != TaskStatus::Generating {
            debug!(%task_id, "discarding stale status response");
            return true;
        }

        let now = self.clock.now();
        let stop = match outcome {
            Ok(RemoteStatus::InProgress { progress }) => {
                state.task.record_progress(progress, &self.estimator);
                debug!(%task_id, progress = state.task.progress, remote = ?progress, "generation in progress");
                match self.deadline_error(&state.task, now) {
                    Some(error) => {
                        warn!(%task_id, error = %error, "generation timed out");
                        state.task.mark_error(&error, now);
                        true
                    }
                    None => false,
                }
            }
            Ok(RemoteStatus::Complete(artifact)) => {
                info!(%task_id, audio_url = %artifact.audio_url, duration_secs = artifact.duration_secs, "generation complete");
                state.task.mark_complete(artifact, now);
                true
            }
            Ok(RemoteStatus::Failed { message }) => {
                let error = GenerationError::remote(message);
                warn!(%task_id, error = %error, "remote reported generation failure");
                state.task.mark_error(&error, now);
                true
            }
            Err(ApiError::Malformed(detail)) => {
                let error = GenerationError::MalformedResponse(detail);
                warn!(%task_id, error = %error, "unusable status response");
                state.task.mark_error(&error, now);
                true
            }
            Err(source) if source.kind() == ErrorKind::Permanent => {
                let error = GenerationError::Poll(source);
                warn!(%task_id, error = %error, "status query rejected, not retrying");
                state.task.mark_error(&error, now);
                true
            }
            Err(source) => {
                let failures = state.task.record_poll_failure(source.to_string());
                let budget = self.config.max_consecutive_poll_failures;
                if failures >= budget {
                    let error = GenerationError::PollTransient {
                        attempts: failures,
                        source,
                    };
                    warn!(%task_id, error = %error, "status polling retry budget exhausted");
                    state.task.mark_error(&error, now);
                    true
                } else {
                    warn!(%task_id, error = %source, failures, budget, "status query failed, will retry");
                    false
                }
            }
        };

        if stop {
            state.poller = None;
        }
        self.publish(state);
        stop
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(poller) = state.poller.take() {
            poller.abort();
        }
    }
}

/// ポーリング間は弱参照だけを持つ。コントローラのハンドルが全て drop
/// されるとループも終わる。
async fn poll_loop(
    inner: Weak<Inner>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    epoch: u64,
    task_id: RemoteTaskId,
) {
    loop {
        clock.sleep(interval).await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if inner.poll(epoch, &task_id).await {
            break;
        }
    }
    debug!(%task_id, epoch, "polling stopped");
}
