use anyhow::{anyhow, bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tunesmith_core::app::config::{DEFAULT_MAX_DURATION, DEFAULT_MAX_POLL_FAILURES, DEFAULT_POLL_INTERVAL};
use tunesmith_core::impls::http::DEFAULT_REQUEST_TIMEOUT;
use tunesmith_core::{ControllerConfig, StartPolicy};

const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_CONFIG_PATH: &str = "TUNESMITH_CONFIG_PATH";
const ENV_API_URL: &str = "TUNESMITH_API_URL";
const ENV_API_KEY: &str = "TUNESMITH_API_KEY";
const ENV_POLL_INTERVAL_MS: &str = "TUNESMITH_POLL_INTERVAL_MS";
const ENV_MAX_POLL_FAILURES: &str = "TUNESMITH_MAX_POLL_FAILURES";
const ENV_TIMEOUT_SECS: &str = "TUNESMITH_TIMEOUT_SECS";
const ENV_MODEL: &str = "TUNESMITH_MODEL";
const ENV_START_POLICY: &str = "TUNESMITH_START_POLICY";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    api_url: Option<String>,
    api_key: Option<String>,
    poll_interval_ms: u64,
    max_poll_failures: u32,
    /// 0 disables the generation timeout.
    timeout_secs: u64,
    request_timeout_secs: u64,
    model: Option<String>,
    start_policy: StartPolicy,
}

impl AppConfig {
    /// defaults -> config file -> environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let path = match config_file_override() {
            Some(path) => Some(path),
            None => Self::default_config_path().ok(),
        };
        if let Some(path) = path {
            if path.exists() {
                let partial = read_partial(&path)?;
                config.apply_partial(partial);
            }
        }

        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values the controller config does not cover.
    fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn api_url(&self) -> Option<&str> {
        self.api_url.as_deref()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        let max_duration = (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs));
        ControllerConfig::default()
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_max_consecutive_poll_failures(self.max_poll_failures)
            .with_max_duration(max_duration)
            .with_start_policy(self.start_policy)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "Tunesmith", "tunesmith")
            .ok_or_else(|| anyhow!("unable to determine config directory"))?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(url) = partial.api_url {
            self.api_url = Some(url);
        }
        if let Some(key) = partial.api_key {
            self.api_key = Some(key);
        }
        if let Some(ms) = partial.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
        if let Some(failures) = partial.max_poll_failures {
            self.max_poll_failures = failures;
        }
        if let Some(secs) = partial.timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(secs) = partial.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(model) = partial.model {
            self.model = Some(model);
        }
        if let Some(policy) = partial.start_policy {
            self.start_policy = policy;
        }
    }

    /// `lookup` is `env::var` outside of tests.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(value) = var(ENV_API_URL) {
            self.api_url = (!value.is_empty()).then_some(value);
        }
        if let Some(value) = var(ENV_API_KEY) {
            self.api_key = (!value.is_empty()).then_some(value);
        }
        if let Some(value) = var(ENV_POLL_INTERVAL_MS).filter(|v| !v.is_empty()) {
            self.poll_interval_ms = value
                .parse()
                .with_context(|| format!("{ENV_POLL_INTERVAL_MS} must be a number of milliseconds"))?;
        }
        if let Some(value) = var(ENV_MAX_POLL_FAILURES).filter(|v| !v.is_empty()) {
            self.max_poll_failures = value
                .parse()
                .with_context(|| format!("{ENV_MAX_POLL_FAILURES} must be a positive integer"))?;
        }
        if let Some(value) = var(ENV_TIMEOUT_SECS).filter(|v| !v.is_empty()) {
            self.timeout_secs = value
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_SECS} must be a number of seconds (0 disables)"))?;
        }
        if let Some(value) = var(ENV_MODEL).filter(|v| !v.is_empty()) {
            self.model = Some(value);
        }
        if let Some(value) = var(ENV_START_POLICY).filter(|v| !v.is_empty()) {
            self.start_policy = value
                .parse()
                .with_context(|| format!("invalid {ENV_START_POLICY}"))?;
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_poll_failures: DEFAULT_MAX_POLL_FAILURES,
            timeout_secs: DEFAULT_MAX_DURATION.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            model: None,
            start_policy: StartPolicy::default(),
        }
    }
}

fn config_file_override() -> Option<PathBuf> {
    let value = env::var_os(ENV_CONFIG_PATH)?;
    if value.is_empty() {
        return None;
    }
    let path = PathBuf::from(value);
    if path.is_dir() {
        return Some(path.join(CONFIG_FILE_NAME));
    }
    Some(path)
}

fn read_partial(path: &Path) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_partial(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_partial(contents: &str) -> Result<PartialConfig, toml::de::Error> {
    toml::from_str(contents)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    api_url: Option<String>,
    api_key: Option<String>,
    poll_interval_ms: Option<u64>,
    max_poll_failures: Option<u32>,
    timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    model: Option<String>,
    start_policy: Option<StartPolicy>,
}
