//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて生成のライフサイクルを実装します。
//!
//! # 主要コンポーネント
//! - **ControllerBuilder**: api / clock / id generator のワイヤリング
//! - **ControllerConfig**: ポーリング間隔、リトライ予算、タイムアウト、StartPolicy
//! - **GenerationController**: 送信、ポーリング、reset、dispose

pub mod builder;
pub mod config;
pub mod controller;

pub use self::builder::ControllerBuilder;
pub use self::config::{ConfigError, ControllerConfig, StartPolicy};
pub use self::controller::GenerationController;
