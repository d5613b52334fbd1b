use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;

use super::types::BinanceTradeEvent;
use crate::model::tick::{normalize_symbol, now_secs, PriceTick};

/// Backoff between reconnects. A factor of 1.0 gives a fixed delay.
struct ExponentialBackoff {
    current: Duration,
    initial: Duration,
    max: Duration,
    factor: f64,
}

impl ExponentialBackoff {
    fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            current: initial,
            initial,
            max,
            factor,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.factor).min(self.max.as_secs_f64()),
        );
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Parse one trade-stream text frame into a tick stamped at `received_at`.
pub fn parse_trade(text: &str, received_at: f64) -> Result<PriceTick> {
    let event: BinanceTradeEvent =
        serde_json::from_str(text).context("malformed trade payload")?;
    Ok(PriceTick::new(&event.symbol, event.price, received_at)?)
}

fn is_rate_limited(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<tungstenite::Error>(),
        Some(tungstenite::Error::Http(resp)) if resp.status().as_u16() == 429
    )
}

/// Hand a tick to the pipeline without waiting. A full channel drops the
/// tick; returns `false` once the receiver is gone.
fn forward_tick(tick_tx: &mpsc::Sender<PriceTick>, tick: PriceTick) -> bool {
    match tick_tx.try_send(tick) {
        Ok(()) => true,
        Err(TrySendError::Full(tick)) => {
            tracing::warn!(symbol = %tick.symbol, "Tick channel full, dropping tick");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Trade stream for one symbol with automatic resubscription.
#[derive(Debug, Clone)]
pub struct BinanceWsClient {
    symbol: String,
    url: String,
    reconnect_delay: Duration,
    rate_limit_backoff: Duration,
}

impl BinanceWsClient {
    pub fn new(
        ws_base_url: &str,
        symbol: &str,
        reconnect_delay: Duration,
        rate_limit_backoff: Duration,
    ) -> Self {
        let symbol = normalize_symbol(symbol);
        Self {
            url: format!(
                "{}/{}@trade",
                ws_base_url.trim_end_matches('/'),
                symbol.to_ascii_lowercase()
            ),
            symbol,
            reconnect_delay,
            rate_limit_backoff,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect and run the WebSocket loop, reconnecting after a fixed delay
    /// until shutdown. Ticks go through `tick_tx`.
    pub async fn connect_and_run(
        &self,
        tick_tx: mpsc::Sender<PriceTick>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut backoff =
            ExponentialBackoff::new(self.reconnect_delay, self.rate_limit_backoff, 1.0);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.connect_once(&tick_tx, &mut shutdown, &mut backoff).await {
                Ok(()) => {
                    tracing::info!(symbol = %self.symbol, "WebSocket closed for shutdown");
                    break;
                }
                Err(e) => {
                    let delay = if is_rate_limited(&e) {
                        self.rate_limit_backoff
                    } else {
                        backoff.next_delay()
                    };
                    tracing::warn!(
                        symbol = %self.symbol,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %format!("{:#}", e),
                        "WebSocket disconnected, reconnecting"
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => continue,
                        _ = shutdown.changed() => {
                            tracing::info!(symbol = %self.symbol, "Shutdown during reconnect");
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn connect_once(
        &self,
        tick_tx: &mpsc::Sender<PriceTick>,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut ExponentialBackoff,
    ) -> Result<()> {
        tracing::debug!(symbol = %self.symbol, url = %self.url, "Connecting");

        let (ws_stream, _resp) = tokio::select! {
            res = tokio_tungstenite::connect_async(&self.url) => {
                res.context("WebSocket connect failed")?
            }
            _ = shutdown.changed() => return Ok(()),
        };
        backoff.reset();
        tracing::info!(symbol = %self.symbol, "WebSocket connected");

        let (_write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            match parse_trade(&text, now_secs()) {
                                Ok(tick) if tick.symbol == self.symbol => {
                                    if !forward_tick(tick_tx, tick) {
                                        tracing::info!(symbol = %self.symbol, "Tick consumer gone, closing stream");
                                        return Ok(());
                                    }
                                }
                                Ok(tick) => {
                                    tracing::debug!(expected = %self.symbol, got = %tick.symbol, "Dropping tick for another symbol");
                                }
                                Err(e) => {
                                    tracing::debug!(symbol = %self.symbol, error = %format!("{:#}", e), "Dropping malformed tick");
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            return Err(anyhow::anyhow!("WebSocket closed by server: {:?}", frame));
                        }
                        Some(Ok(_)) => {
                            // tokio-tungstenite answers pings automatically
                        }
                        Some(Err(e)) => {
                            return Err(anyhow::anyhow!("WebSocket read error: {}", e));
                        }
                        None => {
                            return Err(anyhow::anyhow!("WebSocket stream ended"));
                        }
                    }
                }
                _ = shutdown.changed() => {
                    return Ok(());
                }
            }
        }
    }
}
