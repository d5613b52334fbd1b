use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notify::PolicyKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub binance: BinanceConfig,
    pub monitor: MonitorConfig,
    pub alert: AlertConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
    pub rest_base_url: String,
    pub ws_base_url: String,
    pub symbols: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_rate_limit_backoff_secs")]
    pub rate_limit_backoff_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Percent change over the window that counts as a detection.
    pub threshold_percent: f64,
    pub window_seconds: f64,
    pub min_tick_interval_ms: u64,
    #[serde(default = "default_price_epsilon")]
    pub price_epsilon: f64,
    #[serde(default = "default_one_second")]
    pub heartbeat_seconds: f64,
    #[serde(default = "default_one_second")]
    pub detect_interval_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    pub threshold_tiers: Vec<f64>,
    pub cooldown_seconds: f64,
    #[serde(default = "default_growth_factor")]
    pub growth_factor: f64,
    #[serde(default = "default_growth_cooldown_seconds")]
    pub growth_cooldown_seconds: f64,
    #[serde(default)]
    pub allowed_webhook_ids: Vec<String>,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub webhook_url: Option<String>,
    #[serde(skip)]
    pub secret: Option<String>,
    #[serde(skip)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    pub render_interval_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_rate_limit_backoff_secs() -> u64 {
    60
}

fn default_price_epsilon() -> f64 {
    0.01
}

fn default_one_second() -> f64 {
    1.0
}

fn default_growth_factor() -> f64 {
    1.5
}

fn default_growth_cooldown_seconds() -> f64 {
    300.0
}

fn default_queue_capacity() -> usize {
    32
}

/// Trim, upper-case and de-duplicate symbols, keeping first-seen order.
pub fn normalize_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for sym in symbols {
        let s = crate::model::tick::normalize_symbol(sym.as_ref());
        if !s.is_empty() && !out.iter().any(|v| v == &s) {
            out.push(s);
        }
    }
    out
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl BinanceConfig {
    pub fn monitored_symbols(&self) -> Vec<String> {
        normalize_symbols(&self.symbols)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_secs)
    }
}

impl AlertConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn path() -> PathBuf {
        std::env::var("VOLMON_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"))
    }

    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = Self::path();
        let mut config = Self::from_path(&path)?;

        config.binance.api_key = non_empty_env("BINANCE_API_KEY");
        config.alert.webhook_url = non_empty_env("DISCORD_WEBHOOK_URL");
        config.alert.secret = non_empty_env("VOLMON_ALERT_SECRET");
        config.alert.token = non_empty_env("VOLMON_ALERT_TOKEN");

        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&config_str)
            .with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("failed to parse config toml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.binance.monitored_symbols().is_empty() {
            bail!("binance.symbols must name at least one symbol");
        }
        validate_tiers(&self.alert.threshold_tiers).context("alert.threshold_tiers is invalid")?;
        positive("monitor.threshold_percent", self.monitor.threshold_percent)?;
        positive("monitor.window_seconds", self.monitor.window_seconds)?;
        positive("alert.cooldown_seconds", self.alert.cooldown_seconds)?;
        positive("alert.growth_cooldown_seconds", self.alert.growth_cooldown_seconds)?;
        positive("ui.render_interval_seconds", self.ui.render_interval_seconds)?;
        if !(self.monitor.price_epsilon >= 0.0) {
            bail!("monitor.price_epsilon must be >= 0");
        }
        if !(self.alert.growth_factor > 1.0) {
            bail!("alert.growth_factor must be > 1");
        }
        if self.alert.queue_capacity == 0 {
            bail!("alert.queue_capacity must be > 0");
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{} must be a positive number, got {}", name, value);
    }
    Ok(())
}

/// Tiers must be non-empty, positive and strictly ascending.
pub fn validate_tiers(tiers: &[f64]) -> Result<()> {
    if tiers.is_empty() {
        bail!("at least one tier is required");
    }
    for (i, tier) in tiers.iter().enumerate() {
        if !tier.is_finite() || *tier <= 0.0 {
            bail!("tier {} must be a positive number, got {}", i, tier);
        }
        if i > 0 && *tier <= tiers[i - 1] {
            bail!(
                "tiers must be strictly ascending: {} follows {}",
                tier,
                tiers[i - 1]
            );
        }
    }
    Ok(())
}
