use botflow::model::ConfidenceState;
use botflow::ConfidenceTracker;

#[test]
fn test_state_survives_a_new_tracker() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ConfidenceTracker::new(dir.path());
    for _ in 0..5 {
        tracker.record_heal_success("login").unwrap();
    }
    tracker.record_heal_failure("login").unwrap();

    let reopened = ConfidenceTracker::new(dir.path());
    let state = reopened.state("login").unwrap();
    assert_eq!(state.total_successful_heals, 5);
    assert_eq!(state.total_failed_heals, 1);
    assert_eq!(state.consecutive_successful_heals, 0);
    assert_eq!(state.consecutive_failed_heals, 1);
    // 85 after the streak, +15 for the failure
    assert_eq!(state.auto_threshold, 100.0);

    let raw = std::fs::read_to_string(dir.path().join("login.confidence.json")).unwrap();
    let on_disk: ConfidenceState = serde_json::from_str(&raw).unwrap();
    assert_eq!(on_disk, state);
}

#[test]
fn test_threshold_adapts_then_gates_auto_heal() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ConfidenceTracker::new(dir.path().join("nested").join("state"));
    assert!(!tracker.should_auto_heal("search", 99.0).unwrap());

    let mut state = tracker.state("search").unwrap();
    for _ in 0..20 {
        state = tracker.record_heal_success("search").unwrap();
    }
    assert_eq!(state.auto_threshold, 70.0);
    assert!(tracker.should_auto_heal("search", 70.0).unwrap());
    assert!(!tracker.should_auto_heal("search", 69.9).unwrap());

    tracker.record_heal_failure("search").unwrap();
    assert_eq!(tracker.state("search").unwrap().auto_threshold, 85.0);
    tracker.record_heal_failure("search").unwrap();
    tracker.record_heal_failure("search").unwrap();
    assert_eq!(tracker.state("search").unwrap().auto_threshold, 100.0);

    tracker.reset("search").unwrap();
    assert_eq!(
        tracker.state("search").unwrap(),
        ConfidenceState::new("search")
    );
}
