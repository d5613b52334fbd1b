use volmon::notify::{Direction, GrowthGate, NotificationGate, NotifyReason, TierLadderGate};

fn ladder() -> TierLadderGate {
    TierLadderGate::new(vec![0.3, 0.5, 1.0, 2.0, 3.0, 5.0], 60.0)
}

#[test]
fn tier_ladder_escalates_then_suppresses_same_tier() {
    let mut g = ladder();
    let t0 = 1_000.0;
    assert_eq!(g.evaluate(0.4, t0), Some(NotifyReason::Escalation));
    assert_eq!(g.evaluate(0.6, t0 + 5.0), Some(NotifyReason::Escalation));
    assert_eq!(g.evaluate(1.2, t0 + 10.0), Some(NotifyReason::Escalation));
    assert_eq!(g.evaluate(1.3, t0 + 20.0), None);

    let state = g.state().unwrap();
    assert_eq!(state.last_tier, Some(2));
    assert_eq!(state.last_direction, Direction::Up);
    assert!((state.last_change - 1.2).abs() < f64::EPSILON);
    assert!((state.last_notified_at - (t0 + 10.0)).abs() < f64::EPSILON);
}

#[test]
fn reversal_overrides_cooldown_and_lower_tier() {
    let mut g = ladder();
    let t0 = 1_000.0;
    assert!(g.should_notify(0.4, t0));
    assert!(g.should_notify(0.6, t0 + 1.0));
    assert!(g.should_notify(1.2, t0 + 2.0));
    assert_eq!(g.evaluate(-0.4, t0 + 3.0), Some(NotifyReason::Reversal));

    let state = g.state().unwrap();
    assert_eq!(state.last_direction, Direction::Down);
    assert_eq!(state.last_tier, Some(0));
}

#[test]
fn reminder_after_cooldown_at_same_tier() {
    let mut g = ladder();
    assert!(g.should_notify(1.2, 1_000.0));
    assert!(!g.should_notify(1.1, 1_059.0));
    assert_eq!(g.evaluate(1.1, 1_060.0), Some(NotifyReason::Reminder));
    assert!(!g.should_notify(1.1, 1_061.0));
}

#[test]
fn lower_tier_same_direction_is_suppressed_within_cooldown() {
    let mut g = ladder();
    assert!(g.should_notify(2.5, 1_000.0));
    assert!(!g.should_notify(0.6, 1_010.0));
    assert!(!g.should_notify(1.5, 1_020.0));
}

#[test]
fn floor_reset_rearms_escalation() {
    let mut g = ladder();
    assert!(g.should_notify(0.4, 1_000.0));
    assert!(!g.should_notify(0.35, 1_001.0));

    // Dropping under the floor does not notify but resets the tier.
    assert!(!g.should_notify(0.1, 1_002.0));
    assert_eq!(g.state().unwrap().last_tier, None);

    assert_eq!(g.evaluate(0.4, 1_003.0), Some(NotifyReason::Escalation));
}

#[test]
fn observe_quiet_resets_floor_without_notifying() {
    let mut g = ladder();
    assert!(g.should_notify(0.4, 1_000.0));
    g.observe_quiet(0.2);
    let state = g.state().unwrap();
    assert_eq!(state.last_tier, None);
    assert!((state.last_notified_at - 1_000.0).abs() < f64::EPSILON);
    assert!(g.should_notify(0.4, 1_001.0));
}

#[test]
fn observe_quiet_above_floor_keeps_tier() {
    let mut g = ladder();
    assert!(g.should_notify(0.6, 1_000.0));
    g.observe_quiet(0.4);
    assert_eq!(g.state().unwrap().last_tier, Some(1));
    assert!(!g.should_notify(0.6, 1_001.0));
}

#[test]
fn zero_change_never_counts_as_reversal() {
    let mut g = ladder();
    assert!(g.should_notify(0.5, 1_000.0));
    assert!(!g.should_notify(0.0, 1_001.0));
    assert_eq!(g.state().unwrap().last_direction, Direction::Up);
}

#[test]
fn first_negative_change_escalates() {
    let mut g = ladder();
    assert_eq!(g.evaluate(-3.1, 5.0), Some(NotifyReason::Escalation));
    assert_eq!(g.state().unwrap().last_tier, Some(4));
}

#[test]
fn growth_policy_rules() {
    let mut g = GrowthGate::new(1.5, 300.0);
    let t0 = 10_000.0;
    assert!(g.evaluate(1.0, t0).is_some());
    assert_eq!(g.evaluate(1.4, t0 + 10.0), None);
    assert_eq!(g.evaluate(1.5, t0 + 20.0), Some(NotifyReason::Escalation));
    assert_eq!(g.evaluate(1.6, t0 + 30.0), None);
    assert_eq!(g.evaluate(-1.0, t0 + 40.0), Some(NotifyReason::Reversal));
    assert_eq!(g.evaluate(-1.0, t0 + 340.0), Some(NotifyReason::Reminder));
}

#[test]
fn gate_enum_dispatches_to_policy() {
    let mut gate = NotificationGate::TierLadder(ladder());
    assert!(gate.state().is_none());
    assert!(gate.should_notify(0.4, 1_000.0));
    assert!(!gate.should_notify(0.45, 1_001.0));

    let mut growth = NotificationGate::Growth(GrowthGate::new(1.5, 300.0));
    assert!(growth.should_notify(0.4, 1_000.0));
    growth.observe_quiet(0.0);
    assert!(growth.should_notify(0.7, 1_001.0));
}
