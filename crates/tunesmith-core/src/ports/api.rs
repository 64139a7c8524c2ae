//! GenerationApi port - リモート音楽生成サービスの抽象化

use async_trait::async_trait;

use crate::domain::{ApiError, Artifact, GenerationRequest, RemoteTaskId};

/// create リクエストの受理応答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAck {
    pub task_id: RemoteTaskId,
}

impl CreateAck {
    pub fn new(task_id: impl Into<RemoteTaskId>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }
}

/// status 問い合わせの正規化済み応答
///
/// サービスがどんな形で返しても、実装はこのいずれかに変換する。
/// 変換できなければ [`ApiError::Malformed`] を返す。
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteStatus {
    /// 生成中。サービスが報告した場合のみ `progress`（0-100）が入る
    InProgress { progress: Option<u8> },

    /// 完了。再生可能な成果物つき
    Complete(Artifact),

    /// サービス側でタスクが失敗した
    Failed { message: Option<String> },
}

/// コントローラが必要とする 2 つのリモート操作
///
/// # リトライ
/// - 実装側では再試行しない
/// - リトライ予算はコントローラが管理する
#[async_trait]
pub trait GenerationApi: Send + Sync {
    async fn create(&self, request: &GenerationRequest) -> Result<CreateAck, ApiError>;

    async fn status(&self, task_id: &RemoteTaskId) -> Result<RemoteStatus, ApiError>;
}
