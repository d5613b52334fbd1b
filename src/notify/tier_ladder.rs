use super::{Direction, NotificationState, NotifyReason};

/// Ascending ladder of percent magnitudes with a repeat cooldown.
///
/// Three kinds of state per symbol: below the floor (`last_tier == None`),
/// armed at some tier, and cooling down between repeats at that tier. A
/// direction reversal passes from any of them.
#[derive(Debug, Clone)]
pub struct TierLadderGate {
    tiers: Vec<f64>,
    cooldown_seconds: f64,
    state: Option<NotificationState>,
}

impl TierLadderGate {
    /// `tiers` must be non-empty and strictly ascending (checked by config
    /// validation).
    pub fn new(tiers: Vec<f64>, cooldown_seconds: f64) -> Self {
        assert!(!tiers.is_empty(), "tier ladder needs at least one tier");
        Self {
            tiers,
            cooldown_seconds,
            state: None,
        }
    }

    /// Index of the highest tier not exceeding `magnitude`.
    pub fn tier_index(&self, magnitude: f64) -> Option<usize> {
        self.tiers.iter().rposition(|&tier| tier <= magnitude)
    }

    pub fn floor(&self) -> f64 {
        self.tiers[0]
    }

    pub fn evaluate(&mut self, change: f64, now: f64) -> Option<NotifyReason> {
        let magnitude = change.abs();
        let tier = self.tier_index(magnitude);
        let floor = self.floor();
        let cooldown = self.cooldown_seconds;
        let state = self.state.get_or_insert_with(NotificationState::default);

        let direction = Direction::of(change);
        let reason = if direction.reverses(state.last_direction) {
            Some(NotifyReason::Reversal)
        } else if tier > state.last_tier {
            Some(NotifyReason::Escalation)
        } else if magnitude >= floor && now - state.last_notified_at >= cooldown {
            Some(NotifyReason::Reminder)
        } else {
            None
        };

        if magnitude < floor {
            state.last_tier = None;
        }
        if reason.is_some() {
            state.record(change, now, tier);
        }
        reason
    }

    pub fn should_notify(&mut self, change: f64, now: f64) -> bool {
        self.evaluate(change, now).is_some()
    }

    pub fn observe_quiet(&mut self, change: f64) {
        if change.abs() < self.floor() {
            if let Some(state) = self.state.as_mut() {
                state.last_tier = None;
            }
        }
    }

    pub fn state(&self) -> Option<&NotificationState> {
        self.state.as_ref()
    }

    pub fn tiers(&self) -> &[f64] {
        &self.tiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> TierLadderGate {
        TierLadderGate::new(vec![0.3, 0.5, 1.0, 2.0, 3.0, 5.0], 60.0)
    }

    #[test]
    fn tier_index_picks_highest_band() {
        let g = gate();
        assert_eq!(g.tier_index(0.1), None);
        assert_eq!(g.tier_index(0.3), Some(0));
        assert_eq!(g.tier_index(0.49), Some(0));
        assert_eq!(g.tier_index(1.2), Some(2));
        assert_eq!(g.tier_index(9.0), Some(5));
    }

    #[test]
    fn state_is_created_lazily() {
        let mut g = gate();
        assert!(g.state().is_none());
        g.observe_quiet(0.1);
        assert!(g.state().is_none());
        let _ = g.evaluate(0.4, 10.0);
        assert!(g.state().is_some());
    }
}
