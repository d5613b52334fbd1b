use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::alert::{AlertDispatcher, AlertPayload};
use crate::config::Config;
use crate::detector::{DetectorResult, VolatilityDetector};
use crate::display::SharedDisplayState;
use crate::ingest::{IngestDecision, IngestSettings, SuppressReason, TickIngestor};
use crate::model::tick::{normalize_symbol, PriceTick};
use crate::notify::{NotificationGate, NotifyReason};

/// What happened to one tick inside the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Wrong symbol or invalid price.
    Dropped,
    Suppressed(SuppressReason),
    /// Accepted for display only; detection not due yet.
    Displayed,
    Evaluated(DetectorResult),
    Alerted {
        result: DetectorResult,
        reason: NotifyReason,
        /// `false` when the alert queue was full or closed.
        queued: bool,
    },
}

/// Ingest -> detect -> gate -> dispatch for one symbol, plus the display
/// update. Owns its window and gate state for the life of the process.
pub struct SymbolMonitor {
    symbol: String,
    ingestor: TickIngestor,
    detector: VolatilityDetector,
    gate: NotificationGate,
    display: Arc<SharedDisplayState>,
    alerts: AlertDispatcher,
}

impl SymbolMonitor {
    pub fn new(
        symbol: &str,
        config: &Config,
        display: Arc<SharedDisplayState>,
        alerts: AlertDispatcher,
    ) -> Self {
        Self::from_parts(
            symbol,
            TickIngestor::new(IngestSettings::from(&config.monitor)),
            VolatilityDetector::new(
                config.monitor.threshold_percent,
                config.monitor.window_seconds,
            ),
            NotificationGate::from_config(&config.alert),
            display,
            alerts,
        )
    }

    pub fn from_parts(
        symbol: &str,
        ingestor: TickIngestor,
        detector: VolatilityDetector,
        gate: NotificationGate,
        display: Arc<SharedDisplayState>,
        alerts: AlertDispatcher,
    ) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            ingestor,
            detector,
            gate,
            display,
            alerts,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn gate(&self) -> &NotificationGate {
        &self.gate
    }

    pub fn detector(&self) -> &VolatilityDetector {
        &self.detector
    }

    /// Feed the REST snapshot price taken before the stream is warm.
    pub fn seed_snapshot(&mut self, price: f64, now: f64) -> TickOutcome {
        match PriceTick::new(&self.symbol, price, now) {
            Ok(tick) => {
                tracing::info!(symbol = %self.symbol, price, "Initial price");
                self.on_tick(&tick)
            }
            Err(e) => {
                tracing::warn!(symbol = %self.symbol, error = %e, "Ignoring snapshot price");
                TickOutcome::Dropped
            }
        }
    }

    pub fn on_tick(&mut self, tick: &PriceTick) -> TickOutcome {
        if tick.symbol != self.symbol || !tick.price.is_finite() || tick.price <= 0.0 {
            tracing::debug!(
                symbol = %self.symbol,
                got = %tick.symbol,
                price = tick.price,
                "Dropping invalid tick"
            );
            return TickOutcome::Dropped;
        }

        let (timestamp, detect) = match self.ingestor.ingest(tick.price, tick.timestamp) {
            IngestDecision::Suppressed(reason) => return TickOutcome::Suppressed(reason),
            IngestDecision::Accepted { timestamp, detect } => (timestamp, detect),
        };

        self.display.update(&self.symbol, tick.price, timestamp);
        if !detect {
            return TickOutcome::Displayed;
        }

        let result = self.detector.detect(tick.price, timestamp);
        if !result.detected {
            if result.has_change() {
                self.gate.observe_quiet(result.change_percent);
            }
            return TickOutcome::Evaluated(result);
        }

        tracing::info!(
            symbol = %self.symbol,
            change = result.change_percent,
            threshold = self.detector.threshold_percent(),
            "Volatility detected"
        );

        let reason = match self.gate.evaluate(result.change_percent, timestamp) {
            Some(reason) => reason,
            None => {
                tracing::debug!(symbol = %self.symbol, change = result.change_percent, "Alert throttled");
                return TickOutcome::Evaluated(result);
            }
        };

        let queued = match AlertPayload::new(
            &self.symbol,
            tick.price,
            result.change_percent,
            timestamp,
            self.detector.window().window_seconds(),
        ) {
            Ok(alert) => self.alerts.dispatch(alert),
            Err(e) => {
                tracing::warn!(symbol = %self.symbol, error = %e, "Could not build alert");
                false
            }
        };
        tracing::info!(
            symbol = %self.symbol,
            change = result.change_percent,
            reason = reason.as_str(),
            queued,
            "Alert raised"
        );
        TickOutcome::Alerted {
            result,
            reason,
            queued,
        }
    }

    /// Consume ticks until the source closes or shutdown fires.
    pub async fn run(
        mut self,
        mut ticks: mpsc::Receiver<PriceTick>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                tick = ticks.recv() => {
                    match tick {
                        Some(tick) => {
                            let _ = self.on_tick(&tick);
                        }
                        None => break,
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        tracing::info!(symbol = %self.symbol, "Monitor stopped");
    }
}
