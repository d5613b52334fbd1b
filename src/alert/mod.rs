pub mod dispatcher;
pub mod guard;
pub mod webhook;

use async_trait::async_trait;

use crate::display::format_price;
use crate::error::AppError;
use crate::model::tick::normalize_symbol;

pub use dispatcher::{AlertDelivery, AlertDispatcher, DeliveryOutcome};
pub use guard::{neutralize_mentions, AlertGuard, WebhookTarget};
pub use webhook::DiscordWebhookSink;

/// Fields of one volatility alert, validated at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPayload {
    symbol: String,
    price: f64,
    change_percent: f64,
    timestamp: f64,
    window_seconds: f64,
}

impl AlertPayload {
    pub fn new(
        symbol: &str,
        price: f64,
        change_percent: f64,
        timestamp: f64,
        window_seconds: f64,
    ) -> Result<Self, AppError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(AppError::InvalidAlert("empty symbol".to_string()));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(AppError::InvalidAlert(format!(
                "{}: price must be positive, got {}",
                symbol, price
            )));
        }
        if !change_percent.is_finite() {
            return Err(AppError::InvalidAlert(format!(
                "{}: change is not finite",
                symbol
            )));
        }
        if !timestamp.is_finite() || !window_seconds.is_finite() || window_seconds <= 0.0 {
            return Err(AppError::InvalidAlert(format!(
                "{}: invalid timestamp or window",
                symbol
            )));
        }
        Ok(Self {
            symbol,
            price,
            change_percent,
            timestamp,
            window_seconds,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn change_percent(&self) -> f64 {
        self.change_percent
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    /// Human-readable message body with mass mentions neutralized.
    pub fn content(&self) -> String {
        let text = format!(
            "Volatility alert!\nTicker: {}\nPrice: ${}\nChange: {:+.2}% ({:.0}s window)",
            self.symbol,
            format_price(self.price),
            self.change_percent,
            self.window_seconds
        );
        neutralize_mentions(&text)
    }
}

/// Downstream alert destination. Delivery is at-most-once; `send` reports
/// success and never retries.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Webhook identity to check against the allow-list, `None` for local
    /// sinks.
    fn target(&self) -> Option<&WebhookTarget>;

    async fn send(&self, alert: &AlertPayload) -> bool;
}

/// Writes alerts to the log when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    fn target(&self) -> Option<&WebhookTarget> {
        None
    }

    async fn send(&self, alert: &AlertPayload) -> bool {
        tracing::info!(
            symbol = %alert.symbol(),
            price = alert.price(),
            change = alert.change_percent(),
            "Alert (no webhook configured): {}",
            alert.content().replace('\n', " | ")
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_rejects_invalid_fields() {
        assert!(AlertPayload::new("", 1.0, 1.0, 0.0, 60.0).is_err());
        assert!(AlertPayload::new("BTCUSDT", 0.0, 1.0, 0.0, 60.0).is_err());
        assert!(AlertPayload::new("BTCUSDT", 1.0, f64::NAN, 0.0, 60.0).is_err());
        assert!(AlertPayload::new("BTCUSDT", 1.0, 1.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn content_formats_fields() {
        let alert = AlertPayload::new("btcusdt", 67123.456, 1.234, 0.0, 60.0).unwrap();
        let content = alert.content();
        assert!(content.contains("Ticker: BTCUSDT"));
        assert!(content.contains("Price: $67,123.46"));
        assert!(content.contains("Change: +1.23% (60s window)"));

        let down = AlertPayload::new("ETHUSDT", 3000.0, -2.5, 0.0, 60.0).unwrap();
        assert!(down.content().contains("Change: -2.50%"));
    }

    #[test]
    fn content_neutralizes_mentions_in_symbol() {
        let alert = AlertPayload::new("@everyone", 1.0, 1.0, 0.0, 60.0).unwrap();
        assert!(!alert.content().contains("@EVERYONE"));
        assert!(!alert.content().to_ascii_lowercase().contains("@everyone"));
    }
}
