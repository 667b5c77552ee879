use std::time::Duration;

use ductkit_settings::AdaptiveSettings;
use ductkit_snap::{AdaptiveTuner, TuningDirection, TuningState};

fn start() -> TuningState {
    TuningState {
        debounce_delay: Duration::from_millis(16),
        batch_size: 50,
    }
}

#[test]
fn test_repeated_low_scores_respect_ceilings() {
    let settings = AdaptiveSettings::default();
    let mut tuner = AdaptiveTuner::new(settings.clone(), start());

    let mut now = Duration::ZERO;
    let mut adjustments = 0;
    for _ in 0..50 {
        now += settings.evaluation_interval();
        if tuner.evaluate(12.0, now).is_some() {
            adjustments += 1;
        }
        let state = tuner.state();
        assert!(state.debounce_delay <= Duration::from_millis(settings.max_delay_ms));
        assert!(state.batch_size <= settings.max_batch_size);
    }

    assert_eq!(tuner.state().debounce_delay, Duration::from_millis(32));
    assert_eq!(tuner.state().batch_size, 100);
    // 16 -> 32 ms takes 4 steps, 50 -> 100 takes 5; the batch step decides.
    assert_eq!(adjustments, 5);
}

#[test]
fn test_repeated_high_scores_respect_floors() {
    let settings = AdaptiveSettings::default();
    let mut tuner = AdaptiveTuner::new(settings.clone(), start());

    let mut now = Duration::ZERO;
    for _ in 0..50 {
        now += settings.evaluation_interval();
        if let Some(adjustment) = tuner.evaluate(99.0, now) {
            assert_eq!(adjustment.direction, TuningDirection::Tighten);
        }
        let state = tuner.state();
        assert!(state.debounce_delay >= Duration::from_millis(settings.min_delay_ms));
        assert!(state.batch_size >= settings.min_batch_size);
    }

    assert_eq!(tuner.state().debounce_delay, Duration::from_millis(8));
    assert_eq!(tuner.state().batch_size, 20);
}

#[test]
fn test_adjustments_are_rate_limited() {
    let settings = AdaptiveSettings::default();
    let mut tuner = AdaptiveTuner::new(settings, start());

    // Evaluated every 5 s, adjusted at most every 10 s.
    let applied: Vec<bool> = (1..=6)
        .map(|i| tuner.evaluate(10.0, Duration::from_secs(5 * i)).is_some())
        .collect();
    assert_eq!(applied, vec![true, false, true, false, true, false]);
}

#[test]
fn test_thresholds_are_configuration() {
    let settings = AdaptiveSettings {
        low_score_threshold: 90.0,
        high_score_threshold: 99.0,
        delay_step_ms: 2,
        batch_step: 5,
        ..AdaptiveSettings::default()
    };
    let mut tuner = AdaptiveTuner::new(settings, start());

    let adjustment = tuner.evaluate(85.0, Duration::from_secs(5)).expect("backs off");
    assert_eq!(adjustment.previous, start());
    assert_eq!(adjustment.current.debounce_delay, Duration::from_millis(18));
    assert_eq!(adjustment.current.batch_size, 55);
}
