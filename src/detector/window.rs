use std::collections::VecDeque;

/// Time-pruned buffer of `(timestamp, price)` points, oldest first.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    window_seconds: f64,
    points: VecDeque<(f64, f64)>,
}

impl PriceWindow {
    pub fn new(window_seconds: f64) -> Self {
        assert!(window_seconds > 0.0, "window must be > 0 seconds");
        Self {
            window_seconds,
            points: VecDeque::new(),
        }
    }

    pub fn push(&mut self, timestamp: f64, price: f64) {
        self.points.push_back((timestamp, price));
    }

    /// Drop points older than `now - window_seconds`. Timestamps are
    /// non-decreasing, so only the front needs checking.
    pub fn prune(&mut self, now: f64) {
        let cutoff = now - self.window_seconds;
        while let Some(&(ts, _)) = self.points.front() {
            if ts >= cutoff {
                break;
            }
            self.points.pop_front();
        }
    }

    pub fn oldest(&self) -> Option<(f64, f64)> {
        self.points.front().copied()
    }

    pub fn latest(&self) -> Option<(f64, f64)> {
        self.points.back().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    pub fn iter(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prune_keeps_boundary_point() {
        let mut w = PriceWindow::new(60.0);
        w.push(0.0, 100.0);
        w.push(30.0, 101.0);
        w.prune(60.0);
        assert_eq!(w.len(), 2);
        w.prune(60.5);
        assert_eq!(w.len(), 1);
        assert_eq!(w.oldest(), Some((30.0, 101.0)));
    }

    #[test]
    fn prune_can_empty_window() {
        let mut w = PriceWindow::new(5.0);
        w.push(0.0, 1.0);
        w.push(1.0, 2.0);
        w.prune(100.0);
        assert!(w.is_empty());
        assert_eq!(w.latest(), None);
    }
}
