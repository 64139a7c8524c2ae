//! ControllerConfig - コントローラの調整パラメータ

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ProgressEstimator;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_POLL_FAILURES: u32 = 3;
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(600);

/// 別の生成が進行中に `start` が呼ばれたときの振る舞い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPolicy {
    /// `GenerationError::Busy` で失敗。進行中のタスクはそのまま
    #[default]
    Reject,

    /// 進行中のタスクを取り消して（遅れて届く応答は破棄）やり直す
    Replace,
}

impl FromStr for StartPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(StartPolicy::Reject),
            "replace" => Ok(StartPolicy::Replace),
            other => Err(ConfigError::UnknownStartPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for StartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartPolicy::Reject => f.write_str("reject"),
            StartPolicy::Replace => f.write_str("replace"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("at least one status query failure must be tolerated")]
    ZeroFailureBudget,

    #[error("maximum duration must be greater than zero (use None to disable)")]
    ZeroMaxDuration,

    #[error("progress ceiling {0} is above 100")]
    CeilingOutOfRange(u8),

    #[error("unknown start policy {0:?} (expected \"reject\" or \"replace\")")]
    UnknownStartPolicy(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// status 問い合わせの間隔
    pub poll_interval: Duration,

    /// タスクを Error にするまでに許容する、連続した一時的失敗の回数
    pub max_consecutive_poll_failures: u32,

    /// `Generating` に留まれる上限時間。`None` なら無期限にポーリング
    pub max_duration: Option<Duration>,

    pub progress_step: u8,
    pub progress_ceiling: u8,

    pub start_policy: StartPolicy,
}

impl ControllerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_consecutive_poll_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_poll_failures = failures;
        self
    }

    pub fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn with_progress(mut self, step: u8, ceiling: u8) -> Self {
        self.progress_step = step;
        self.progress_ceiling = ceiling;
        self
    }

    pub fn with_start_policy(mut self, policy: StartPolicy) -> Self {
        self.start_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.max_consecutive_poll_failures == 0 {
            return Err(ConfigError::ZeroFailureBudget);
        }
        if self.max_duration.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ZeroMaxDuration);
        }
        if self.progress_ceiling > 100 {
            return Err(ConfigError::CeilingOutOfRange(self.progress_ceiling));
        }
        Ok(())
    }

    pub fn estimator(&self) -> ProgressEstimator {
        ProgressEstimator::new(self.progress_step, self.progress_ceiling)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_poll_failures: DEFAULT_MAX_POLL_FAILURES,
            max_duration: Some(DEFAULT_MAX_DURATION),
            progress_step: 10,
            progress_ceiling: 90,
            start_policy: StartPolicy::Reject,
        }
    }
}
