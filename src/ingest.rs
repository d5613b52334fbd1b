use crate::config::MonitorConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestSettings {
    /// Ticks closer than this to the last accepted one are dropped.
    pub min_interval_seconds: f64,
    /// Absolute price move that counts as a change.
    pub price_epsilon: f64,
    /// Accept an unchanged price once this much time has passed.
    pub heartbeat_seconds: f64,
    /// Minimum spacing between ticks routed to detection.
    pub detect_interval_seconds: f64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            min_interval_seconds: 0.1,
            price_epsilon: 0.01,
            heartbeat_seconds: 1.0,
            detect_interval_seconds: 1.0,
        }
    }
}

impl From<&MonitorConfig> for IngestSettings {
    fn from(cfg: &MonitorConfig) -> Self {
        Self {
            min_interval_seconds: cfg.min_tick_interval_ms as f64 / 1000.0,
            price_epsilon: cfg.price_epsilon,
            heartbeat_seconds: cfg.heartbeat_seconds,
            detect_interval_seconds: cfg.detect_interval_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Arrived within the minimum interval.
    Burst,
    /// Price did not move and the heartbeat is not due.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngestDecision {
    Suppressed(SuppressReason),
    Accepted {
        /// Effective timestamp, never earlier than the previous accepted one.
        timestamp: f64,
        /// Route this tick to the volatility detector as well.
        detect: bool,
    },
}

impl IngestDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Per-symbol debounce in front of detection and display.
#[derive(Debug, Clone)]
pub struct TickIngestor {
    settings: IngestSettings,
    last_price: Option<f64>,
    last_processed_at: Option<f64>,
    last_detect_at: Option<f64>,
}

impl TickIngestor {
    pub fn new(settings: IngestSettings) -> Self {
        Self {
            settings,
            last_price: None,
            last_processed_at: None,
            last_detect_at: None,
        }
    }

    pub fn ingest(&mut self, price: f64, timestamp: f64) -> IngestDecision {
        let timestamp = match self.last_processed_at {
            None => timestamp,
            Some(last_at) => {
                let timestamp = timestamp.max(last_at);
                let elapsed = timestamp - last_at;
                if elapsed < self.settings.min_interval_seconds {
                    return IngestDecision::Suppressed(SuppressReason::Burst);
                }
                let price_changed = self
                    .last_price
                    .map_or(true, |last| (price - last).abs() >= self.settings.price_epsilon);
                if !price_changed && elapsed < self.settings.heartbeat_seconds {
                    return IngestDecision::Suppressed(SuppressReason::Unchanged);
                }
                timestamp
            }
        };

        self.last_price = Some(price);
        self.last_processed_at = Some(timestamp);

        let detect = self
            .last_detect_at
            .map_or(true, |at| timestamp - at >= self.settings.detect_interval_seconds);
        if detect {
            self.last_detect_at = Some(timestamp);
        }
        IngestDecision::Accepted { timestamp, detect }
    }

    pub fn last_price(&self) -> Option<f64> {
        self.last_price
    }

    pub fn last_processed_at(&self) -> Option<f64> {
        self.last_processed_at
    }
}
