//! TaskObserver port - 状態変化の通知

use std::fmt;

use crate::domain::GenerationTask;

/// 状態遷移のたびにスナップショットを受け取る
///
/// # 呼び出し規約
/// - 遷移を起こしたタスク上で同期的に呼ばれる
/// - コントローラのロックは解放済み（中から `snapshot()` や `reset()` を呼んでよい）
/// - ポーリングはこの呼び出しを待つので、重い処理はしない
pub trait TaskObserver: Send + Sync {
    fn on_change(&self, task: &GenerationTask);
}

impl<F> TaskObserver for F
where
    F: Fn(&GenerationTask) + Send + Sync,
{
    fn on_change(&self, task: &GenerationTask) {
        self(task)
    }
}

/// `subscribe` が返すハンドル（`unsubscribe` に使う）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription-{}", self.0)
    }
}
