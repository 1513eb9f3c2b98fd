//! Configuration loading and validation
//!
//! Settings come from an optional TOML file layered under
//! `VOLWATCH`-prefixed environment variables (a `.env` file is honored).
//! Missing Telegram credentials are fatal at startup; everything else
//! has defaults.

use crate::error::{BotError, Result};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Notification channel credentials and dispatch mode.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    /// Collapse all of a tick's alerts into one message instead of one
    /// message per alert. Fixed per deployment, never interleaved.
    #[serde(default = "default_batch_alerts")]
    pub batch_alerts: bool,
}

/// Which market-data provider to poll, and how.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub provider: Provider,
    /// Optional API key, passed through to the adapter if it wants one.
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Truncate the symbol universe to the first N entries.
    pub symbol_limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Kucoin,
    Binance,
}

/// Detection and scheduling parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Minimum absolute percentage move that qualifies as an alert.
    #[serde(default = "default_threshold_pct")]
    pub volatility_threshold_pct: f64,
    /// Minimum elapsed time between baseline and comparison price.
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: u32,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Shortened sleep after a tick that errored out.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Sustained failure duration before a "source down" notice goes out.
    #[serde(default = "default_outage_grace_minutes")]
    pub outage_grace_minutes: u32,
    #[serde(default)]
    pub strategy: DetectionStrategy,
}

/// How price movement is measured. One strategy per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStrategy {
    /// Compare the open/close of a provider candle spanning the lookback
    /// window. Stateless.
    #[default]
    Candle,
    /// Compare against a stored per-symbol baseline sampled at tick
    /// cadence, rebasing after each evaluation.
    Rolling,
}

fn default_batch_alerts() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_threshold_pct() -> f64 {
    10.0
}

fn default_lookback_minutes() -> u32 {
    15
}

fn default_poll_interval_secs() -> u64 {
    180
}

fn default_error_backoff_secs() -> u64 {
    60
}

fn default_heartbeat_interval_secs() -> u64 {
    3600
}

fn default_outage_grace_minutes() -> u32 {
    30
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            symbol_limit: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volatility_threshold_pct: default_threshold_pct(),
            lookback_minutes: default_lookback_minutes(),
            poll_interval_secs: default_poll_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            outage_grace_minutes: default_outage_grace_minutes(),
            strategy: DetectionStrategy::default(),
        }
    }
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Kucoin => "kucoin",
            Provider::Binance => "binance",
        }
    }
}

impl Config {
    /// Load configuration from `path` (if present) and the environment,
    /// then validate it.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("VOLWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| BotError::Config(e.to_string()))?;

        let cfg: Config = settings
            .try_deserialize()
            .map_err(|e| BotError::Config(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(BotError::Config(
                "telegram.bot_token is required".to_string(),
            ));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(BotError::Config("telegram.chat_id is required".to_string()));
        }
        if self.engine.volatility_threshold_pct <= 0.0 {
            return Err(BotError::Config(
                "engine.volatility_threshold_pct must be positive".to_string(),
            ));
        }
        if self.engine.lookback_minutes == 0 {
            return Err(BotError::Config(
                "engine.lookback_minutes must be at least 1".to_string(),
            ));
        }
        if self.engine.poll_interval_secs == 0 {
            return Err(BotError::Config(
                "engine.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
