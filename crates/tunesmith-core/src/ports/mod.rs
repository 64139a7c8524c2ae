//! Ports - 外部との境界
//!
//! 各 trait が外部の協調者を 1 つずつ隠す。テストでは fake に差し替える。
//! - **GenerationApi**: リモート音楽生成サービス
//! - **Clock**: 現在時刻とポーリング間の待機
//! - **IdGenerator**: ローカルの送信 ID
//! - **TaskObserver**: コントローラの状態を表示する側

pub mod api;
pub mod clock;
pub mod id_generator;
pub mod observer;

pub use self::api::{CreateAck, GenerationApi, RemoteStatus};
pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::observer::{SubscriptionId, TaskObserver};
