//! IdGenerator port - 送信 ID 生成の抽象化

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::SubmissionId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn next_submission_id(&self) -> SubmissionId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// タイムスタンプ部は注入された [`Clock`] から取る。
/// `ManualClock` の下では仮想時刻の ID になる。
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl IdGenerator for UlidGenerator {
    fn next_submission_id(&self) -> SubmissionId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        SubmissionId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
