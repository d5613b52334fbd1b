use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::{AlertPayload, AlertSink, WebhookTarget};

#[derive(Debug, Serialize)]
struct AllowedMentions {
    parse: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct WebhookMessage {
    content: String,
    allowed_mentions: AllowedMentions,
}

impl WebhookMessage {
    /// Empty `parse` list disables every implicit mention.
    fn from_alert(alert: &AlertPayload) -> Self {
        Self {
            content: alert.content(),
            allowed_mentions: AllowedMentions { parse: Vec::new() },
        }
    }
}

pub struct DiscordWebhookSink {
    http: reqwest::Client,
    target: WebhookTarget,
}

impl DiscordWebhookSink {
    pub fn new(target: WebhookTarget, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build webhook HTTP client")?;
        Ok(Self { http, target })
    }

    async fn post(&self, alert: &AlertPayload) -> Result<()> {
        let resp = self
            .http
            .post(self.target.url().clone())
            .json(&WebhookMessage::from_alert(alert))
            .send()
            .await
            .context("webhook POST failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("webhook returned HTTP {}: {}", status, truncate(&body, 200));
        }
        Ok(())
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl AlertSink for DiscordWebhookSink {
    fn target(&self) -> Option<&WebhookTarget> {
        Some(&self.target)
    }

    async fn send(&self, alert: &AlertPayload) -> bool {
        match self.post(alert).await {
            Ok(()) => {
                tracing::info!(
                    symbol = %alert.symbol(),
                    change = alert.change_percent(),
                    webhook_id = %self.target.id(),
                    "Alert delivered"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    symbol = %alert.symbol(),
                    change = alert.change_percent(),
                    webhook_id = %self.target.id(),
                    error = %format!("{:#}", e),
                    "Alert delivery failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_disables_mentions() {
        let alert = AlertPayload::new("BTCUSDT", 100.0, 1.5, 0.0, 60.0).unwrap();
        let json = serde_json::to_value(WebhookMessage::from_alert(&alert)).unwrap();
        assert_eq!(json["allowed_mentions"]["parse"], serde_json::json!([]));
        assert!(json["content"]
            .as_str()
            .unwrap()
            .contains("Ticker: BTCUSDT"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("가나다라", 2), "가나");
    }
}
