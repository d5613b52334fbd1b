use super::{Direction, NotificationState, NotifyReason};

/// Simpler throttle: repeat after a long cooldown, on reversal, or when the
/// magnitude grows by `growth_factor` over the last notified change.
/// Has no tier floor and so no floor reset.
#[derive(Debug, Clone)]
pub struct GrowthGate {
    growth_factor: f64,
    cooldown_seconds: f64,
    state: Option<NotificationState>,
}

impl GrowthGate {
    pub fn new(growth_factor: f64, cooldown_seconds: f64) -> Self {
        Self {
            growth_factor,
            cooldown_seconds,
            state: None,
        }
    }

    pub fn evaluate(&mut self, change: f64, now: f64) -> Option<NotifyReason> {
        let state = self.state.get_or_insert_with(NotificationState::default);
        let direction = Direction::of(change);

        let reason = if direction.reverses(state.last_direction) {
            Some(NotifyReason::Reversal)
        } else if now - state.last_notified_at >= self.cooldown_seconds {
            Some(NotifyReason::Reminder)
        } else if change.abs() >= self.growth_factor * state.last_change.abs() {
            Some(NotifyReason::Escalation)
        } else {
            None
        };

        if reason.is_some() {
            state.record(change, now, None);
        }
        reason
    }

    pub fn state(&self) -> Option<&NotificationState> {
        self.state.as_ref()
    }
}
