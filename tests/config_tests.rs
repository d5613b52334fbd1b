use std::path::Path;
use std::time::Duration;

use volmon::config::Config;
use volmon::ingest::IngestSettings;
use volmon::notify::{NotificationGate, PolicyKind};

const FULL: &str = r#"
[binance]
rest_base_url = "https://api.binance.com"
ws_base_url = "wss://stream.binance.com:9443/ws"
symbols = ["btcusdt", "ETHUSDT", "BTCUSDT"]
request_timeout_secs = 7
reconnect_delay_secs = 3
rate_limit_backoff_secs = 90

[monitor]
threshold_percent = 1.0
window_seconds = 60.0
min_tick_interval_ms = 250
price_epsilon = 0.05

[alert]
policy = "growth"
threshold_tiers = [0.3, 0.5, 1.0, 2.0, 3.0, 5.0]
cooldown_seconds = 60.0
allowed_webhook_ids = ["1234567890"]

[ui]
render_interval_seconds = 5.0

[logging]
level = "debug"
"#;

#[test]
fn parse_full_toml() {
    let config = Config::from_toml(FULL).unwrap();
    assert_eq!(
        config.binance.monitored_symbols(),
        vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]
    );
    assert_eq!(config.binance.request_timeout(), Duration::from_secs(7));
    assert_eq!(config.binance.reconnect_delay(), Duration::from_secs(3));
    assert_eq!(config.binance.rate_limit_backoff(), Duration::from_secs(90));
    assert_eq!(config.alert.policy, PolicyKind::Growth);
    assert_eq!(config.alert.threshold_tiers.len(), 6);
    assert_eq!(config.alert.allowed_webhook_ids, vec!["1234567890".to_string()]);
    assert!(config.logging.file.is_none());
    assert!(config.alert.webhook_url.is_none());
}

#[test]
fn defaults_fill_optional_fields() {
    let config = Config::from_toml(FULL).unwrap();
    assert!((config.monitor.heartbeat_seconds - 1.0).abs() < f64::EPSILON);
    assert!((config.monitor.detect_interval_seconds - 1.0).abs() < f64::EPSILON);
    assert!((config.alert.growth_factor - 1.5).abs() < f64::EPSILON);
    assert!((config.alert.growth_cooldown_seconds - 300.0).abs() < f64::EPSILON);
    assert_eq!(config.alert.queue_capacity, 32);
    assert_eq!(config.alert.timeout(), Duration::from_secs(10));

    let settings = IngestSettings::from(&config.monitor);
    assert!((settings.min_interval_seconds - 0.25).abs() < 1e-12);
    assert!((settings.price_epsilon - 0.05).abs() < 1e-12);
}

#[test]
fn policy_defaults_to_tier_ladder() {
    let toml_str = FULL.replace("policy = \"growth\"\n", "");
    let config = Config::from_toml(&toml_str).unwrap();
    assert_eq!(config.alert.policy, PolicyKind::TierLadder);
    assert_eq!(
        NotificationGate::from_config(&config.alert).kind(),
        PolicyKind::TierLadder
    );
}

#[test]
fn rejects_invalid_values() {
    let cases = [
        FULL.replace(
            "threshold_tiers = [0.3, 0.5, 1.0, 2.0, 3.0, 5.0]",
            "threshold_tiers = [0.5, 0.3]",
        ),
        FULL.replace(
            "threshold_tiers = [0.3, 0.5, 1.0, 2.0, 3.0, 5.0]",
            "threshold_tiers = []",
        ),
        FULL.replace("window_seconds = 60.0", "window_seconds = 0.0"),
        FULL.replace("threshold_percent = 1.0", "threshold_percent = -1.0"),
        FULL.replace(
            "symbols = [\"btcusdt\", \"ETHUSDT\", \"BTCUSDT\"]",
            "symbols = [\" \"]",
        ),
        FULL.replace("render_interval_seconds = 5.0", "render_interval_seconds = 0.0"),
        FULL.replace("policy = \"growth\"", "policy = \"sometimes\""),
        FULL.replace("policy = \"growth\"", "policy = \"growth\"\ngrowth_factor = 1.0"),
    ];
    for toml_str in cases {
        assert!(Config::from_toml(&toml_str).is_err(), "accepted:\n{}", toml_str);
    }
}

#[test]
fn shipped_default_config_is_valid() {
    let config = Config::from_path(Path::new("config/default.toml")).unwrap();
    assert_eq!(config.alert.policy, PolicyKind::TierLadder);
    assert_eq!(config.alert.threshold_tiers, vec![0.3, 0.5, 1.0, 2.0, 3.0, 5.0]);
    assert!((config.alert.cooldown_seconds - 60.0).abs() < f64::EPSILON);
    assert!((config.monitor.window_seconds - 60.0).abs() < f64::EPSILON);
    assert_eq!(config.monitor.min_tick_interval_ms, 100);
    assert!((config.ui.render_interval_seconds - 5.0).abs() < f64::EPSILON);
    assert!(!config.binance.monitored_symbols().is_empty());
}
