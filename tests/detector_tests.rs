use volmon::detector::VolatilityDetector;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn basic_detection() {
    let mut det = VolatilityDetector::new(1.0, 60.0);
    let first = det.detect(100.0, 0.0);
    assert!(!first.detected);
    assert!(!first.has_change());

    let r = det.detect(101.0, 10.0);
    assert!(approx(r.change_percent, 1.0));
    assert!(r.detected);
}

#[test]
fn window_expiry_moves_anchor() {
    let mut det = VolatilityDetector::new(1.0, 60.0);
    let _ = det.detect(100.0, 0.0);
    let _ = det.detect(100.5, 30.0);
    let r = det.detect(101.5, 61.0);

    assert_eq!(det.window().oldest(), Some((30.0, 100.5)));
    assert!(approx(r.change_percent, (101.5 - 100.5) / 100.5 * 100.0));
    assert!(r.change_percent < 1.0);
    assert!(!r.detected);
}

#[test]
fn pruned_entries_are_within_window() {
    let mut det = VolatilityDetector::new(0.5, 10.0);
    let ticks = [
        (0.0, 10.0),
        (3.0, 10.1),
        (7.5, 10.2),
        (12.0, 10.0),
        (12.0, 9.9),
        (25.0, 9.8),
        (26.0, 9.7),
    ];
    for &(t, p) in &ticks {
        let _ = det.detect(p, t);
        assert!(det.window().iter().all(|&(ts, _)| ts >= t - 10.0));
    }
}

#[test]
fn single_point_after_gap_is_not_detected() {
    let mut det = VolatilityDetector::new(0.1, 5.0);
    let _ = det.detect(100.0, 0.0);
    let r = det.detect(200.0, 100.0);
    assert_eq!(r.points, 1);
    assert!(!r.detected);
    assert_eq!(r.change_percent, 0.0);
}

#[test]
fn threshold_is_inclusive_and_signed() {
    let mut det = VolatilityDetector::new(25.0, 60.0);
    let _ = det.detect(100.0, 0.0);
    let r = det.detect(75.0, 1.0);
    assert_eq!(r.change_percent, -25.0);
    assert!(r.detected);
}

#[test]
fn change_uses_oldest_not_intermediate_points() {
    let mut det = VolatilityDetector::new(1.0, 60.0);
    let _ = det.detect(100.0, 0.0);
    let _ = det.detect(150.0, 1.0);
    let _ = det.detect(80.0, 2.0);
    let r = det.detect(100.5, 3.0);
    assert!(approx(r.change_percent, 0.5));
    assert!(!r.detected);
    assert_eq!(r.points, 4);
}
