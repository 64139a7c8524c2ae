//! Clock port - 時刻と待機の抽象化
//!
//! コントローラは `tokio::time` や `Utc::now()` を直接使わない。
//! テストでは [`ManualClock`] で仮想時間を進め、実際の 2 秒間隔を待たずに
//! ポーリングを駆動できる。
//!
//! # 実装
//! - **SystemClock**: 本番用（tokio タイマー）
//! - **ManualClock**: テスト用（手動で進める仮想時間）

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// この Clock 上で `duration` が経過したら完了
    async fn sleep(&self, duration: Duration);
}

/// 実時間（tokio タイマー）
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// [`advance`](ManualClock::advance) を呼んだときだけ進む仮想時間
///
/// 累積オフセットが期限に達した sleeper から起きる。
#[derive(Debug)]
pub struct ManualClock {
    origin: DateTime<Utc>,
    elapsed: watch::Sender<Duration>,
    sleepers: Arc<AtomicUsize>,
}

impl ManualClock {
    pub fn new(origin: DateTime<Utc>) -> Self {
        let (elapsed, _) = watch::channel(Duration::ZERO);
        Self {
            origin,
            elapsed,
            sleepers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.send_modify(|elapsed| *elapsed += by);
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.borrow()
    }

    /// 現在 [`Clock::sleep`] で待機中のタスク数
    pub fn sleepers(&self) -> usize {
        self.sleepers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.elapsed())
            .ok()
            .and_then(|offset| self.origin.checked_add_signed(offset))
            .unwrap_or(self.origin)
    }

    async fn sleep(&self, duration: Duration) {
        let mut rx = self.elapsed.subscribe();
        let deadline = *rx.borrow_and_update() + duration;
        let _parked = SleeperGuard::enter(&self.sleepers);
        loop {
            let now = *rx.borrow_and_update();
            if now >= deadline {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// sleep 中の future が drop されても sleeper 数を正しく保つ
struct SleeperGuard(Arc<AtomicUsize>);

impl SleeperGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for SleeperGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
