pub mod growth;
pub mod tier_ladder;

use serde::Deserialize;

use crate::config::AlertConfig;

pub use growth::GrowthGate;
pub use tier_ladder::TierLadderGate;

/// Sign of a price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Down,
    #[default]
    Flat,
    Up,
}

impl Direction {
    pub fn of(change: f64) -> Self {
        if change > 0.0 {
            Self::Up
        } else if change < 0.0 {
            Self::Down
        } else {
            Self::Flat
        }
    }

    /// A reversal needs a non-flat previous and current direction.
    pub fn reverses(self, previous: Direction) -> bool {
        previous != Self::Flat && self != Self::Flat && self != previous
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Self::Down => -1,
            Self::Flat => 0,
            Self::Up => 1,
        }
    }
}

/// Per-symbol throttling memory. `last_tier` is `None` while below the
/// smallest tier.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NotificationState {
    pub last_notified_at: f64,
    pub last_change: f64,
    pub last_direction: Direction,
    pub last_tier: Option<usize>,
}

impl NotificationState {
    fn record(&mut self, change: f64, now: f64, tier: Option<usize>) {
        self.last_notified_at = now;
        self.last_change = change;
        self.last_direction = Direction::of(change);
        self.last_tier = tier;
    }
}

/// Why a change was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyReason {
    /// Direction flipped against the last notified move.
    Reversal,
    /// Moved into a higher severity band (or grew past the growth factor).
    Escalation,
    /// Still elevated after the cooldown elapsed.
    Reminder,
}

impl NotifyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reversal => "reversal",
            Self::Escalation => "escalation",
            Self::Reminder => "reminder",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    TierLadder,
    Growth,
}

/// Throttling policy for one symbol. Evaluate once per detection result.
#[derive(Debug, Clone)]
pub enum NotificationGate {
    TierLadder(TierLadderGate),
    Growth(GrowthGate),
}

impl NotificationGate {
    pub fn from_config(cfg: &AlertConfig) -> Self {
        match cfg.policy {
            PolicyKind::TierLadder => Self::TierLadder(TierLadderGate::new(
                cfg.threshold_tiers.clone(),
                cfg.cooldown_seconds,
            )),
            PolicyKind::Growth => Self::Growth(GrowthGate::new(
                cfg.growth_factor,
                cfg.growth_cooldown_seconds,
            )),
        }
    }

    pub fn evaluate(&mut self, change: f64, now: f64) -> Option<NotifyReason> {
        match self {
            Self::TierLadder(g) => g.evaluate(change, now),
            Self::Growth(g) => g.evaluate(change, now),
        }
    }

    pub fn should_notify(&mut self, change: f64, now: f64) -> bool {
        self.evaluate(change, now).is_some()
    }

    /// Feed a change that did not reach the detection threshold. Only the
    /// tier floor reset applies; never notifies.
    pub fn observe_quiet(&mut self, change: f64) {
        match self {
            Self::TierLadder(g) => g.observe_quiet(change),
            Self::Growth(_) => {}
        }
    }

    pub fn state(&self) -> Option<&NotificationState> {
        match self {
            Self::TierLadder(g) => g.state(),
            Self::Growth(g) => g.state(),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::TierLadder(_) => PolicyKind::TierLadder,
            Self::Growth(_) => PolicyKind::Growth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_of_sign() {
        assert_eq!(Direction::of(0.4), Direction::Up);
        assert_eq!(Direction::of(-0.4), Direction::Down);
        assert_eq!(Direction::of(0.0), Direction::Flat);
        assert_eq!(Direction::of(-0.0), Direction::Flat);
    }

    #[test]
    fn reversal_ignores_flat() {
        assert!(Direction::Down.reverses(Direction::Up));
        assert!(!Direction::Up.reverses(Direction::Up));
        assert!(!Direction::Up.reverses(Direction::Flat));
        assert!(!Direction::Flat.reverses(Direction::Down));
    }
}
