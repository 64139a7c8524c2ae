//! ControllerBuilder - コントローラの構築とワイヤリング
//!
//! 設定の検証は `build()` で行う。不正な設定は最初のポーリングではなく
//! 起動時に失敗する（Fail-fast）。

use std::sync::Arc;

use super::config::{ConfigError, ControllerConfig};
use super::controller::GenerationController;
use crate::ports::{Clock, GenerationApi, IdGenerator, SystemClock, UlidGenerator};

/// # 使用例
/// ```ignore
/// let controller = ControllerBuilder::new(Arc::new(api))
///     .config(ControllerConfig::default().with_max_duration(None))
///     .clock(Arc::new(ManualClock::new(origin)))
///     .build()?;
/// ```
pub struct ControllerBuilder {
    api: Arc<dyn GenerationApi>,
    config: ControllerConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl ControllerBuilder {
    pub fn new(api: Arc<dyn GenerationApi>) -> Self {
        Self {
            api,
            config: ControllerConfig::default(),
            clock: None,
            ids: None,
        }
    }

    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// 省略時は [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 省略時はコントローラの Clock を使う [`UlidGenerator`]
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self) -> Result<GenerationController, ConfigError> {
        self.config.validate()?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))) as Arc<dyn IdGenerator>);
        Ok(GenerationController::from_parts(
            self.api,
            clock,
            ids,
            self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use crate::impls::SimulatedApi;
    use std::time::Duration;

    #[test]
    fn build_with_defaults() {
        let controller = ControllerBuilder::new(Arc::new(SimulatedApi::new(2)))
            .build()
            .unwrap();

        assert_eq!(controller.snapshot().status, TaskStatus::Idle);
        assert_eq!(controller.config(), &ControllerConfig::default());
    }

    #[test]
    fn build_rejects_invalid_config() {
        let result = ControllerBuilder::new(Arc::new(SimulatedApi::new(2)))
            .config(ControllerConfig::default().with_poll_interval(Duration::ZERO))
            .build();

        assert!(matches!(result, Err(ConfigError::ZeroPollInterval)));
    }
}
