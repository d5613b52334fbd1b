pub mod window;

pub use window::PriceWindow;

/// Verdict of one `detect` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorResult {
    pub detected: bool,
    /// Signed percent change from the oldest retained price. Zero when the
    /// window holds fewer than two points.
    pub change_percent: f64,
    /// Number of points the window held after pruning.
    pub points: usize,
}

impl DetectorResult {
    /// `true` when the change is defined, i.e. at least two points were
    /// compared.
    pub fn has_change(&self) -> bool {
        self.points >= 2
    }
}

/// Edge-to-edge percent change over a trailing time window for one symbol.
#[derive(Debug, Clone)]
pub struct VolatilityDetector {
    threshold_percent: f64,
    window: PriceWindow,
}

impl VolatilityDetector {
    pub fn new(threshold_percent: f64, window_seconds: f64) -> Self {
        Self {
            threshold_percent,
            window: PriceWindow::new(window_seconds),
        }
    }

    pub fn detect(&mut self, price: f64, now: f64) -> DetectorResult {
        self.window.push(now, price);
        self.window.prune(now);

        let points = self.window.len();
        let oldest = match self.window.oldest() {
            Some((_, p)) if points >= 2 => p,
            _ => {
                return DetectorResult {
                    detected: false,
                    change_percent: 0.0,
                    points,
                }
            }
        };

        let change_percent = (price - oldest) / oldest * 100.0;
        DetectorResult {
            detected: change_percent.abs() >= self.threshold_percent,
            change_percent,
            points,
        }
    }

    pub fn threshold_percent(&self) -> f64 {
        self.threshold_percent
    }

    pub fn window(&self) -> &PriceWindow {
        &self.window
    }
}
