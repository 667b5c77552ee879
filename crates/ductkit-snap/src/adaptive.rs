//! Hysteresis controller for interaction timing.
//!
//! A low performance score backs off (longer debounce delay, larger batches)
//! to cut per-frame work; a very high score tightens both again for
//! responsiveness. Scores in between leave everything alone. At most one
//! adjustment is applied per minimum adjustment interval, and values are
//! clamped to their configured floors and ceilings.

use std::time::Duration;

use ductkit_settings::AdaptiveSettings;

/// The two tuned parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningState {
    pub debounce_delay: Duration,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningDirection {
    /// Score below the low threshold
    BackOff,
    /// Score above the high threshold
    Tighten,
}

/// An applied change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningAdjustment {
    pub score: f64,
    pub direction: TuningDirection,
    pub previous: TuningState,
    pub current: TuningState,
}

#[derive(Debug, Clone)]
pub struct AdaptiveTuner {
    settings: AdaptiveSettings,
    state: TuningState,
    last_adjustment: Option<Duration>,
}

impl AdaptiveTuner {
    /// Creates a tuner starting from `initial`, clamped into bounds.
    pub fn new(settings: AdaptiveSettings, initial: TuningState) -> Self {
        let mut tuner = Self {
            settings,
            state: initial,
            last_adjustment: None,
        };
        tuner.state = tuner.clamp(initial);
        tuner
    }

    pub fn state(&self) -> TuningState {
        self.state
    }

    pub fn settings(&self) -> &AdaptiveSettings {
        &self.settings
    }

    pub fn last_adjustment(&self) -> Option<Duration> {
        self.last_adjustment
    }

    /// Feeds one score sample taken at `now` on the session clock.
    ///
    /// Returns the adjustment when the state changed. A sample that would push
    /// a value past its bound changes nothing and does not reset the rate
    /// limit.
    pub fn evaluate(&mut self, score: f64, now: Duration) -> Option<TuningAdjustment> {
        if !self.settings.enabled || score.is_nan() {
            return None;
        }
        if let Some(last) = self.last_adjustment {
            if now.saturating_sub(last) < self.settings.min_adjustment_interval() {
                return None;
            }
        }

        let direction = if score < self.settings.low_score_threshold {
            TuningDirection::BackOff
        } else if score > self.settings.high_score_threshold {
            TuningDirection::Tighten
        } else {
            return None;
        };

        let delay_step = Duration::from_millis(self.settings.delay_step_ms);
        let batch_step = self.settings.batch_step;
        let previous = self.state;
        let proposed = match direction {
            TuningDirection::BackOff => TuningState {
                debounce_delay: previous.debounce_delay + delay_step,
                batch_size: previous.batch_size.saturating_add(batch_step),
            },
            TuningDirection::Tighten => TuningState {
                debounce_delay: previous.debounce_delay.saturating_sub(delay_step),
                batch_size: previous.batch_size.saturating_sub(batch_step),
            },
        };
        let current = self.clamp(proposed);
        if current == previous {
            return None;
        }

        self.state = current;
        self.last_adjustment = Some(now);
        tracing::info!(
            "Adaptive tuning ({:?}, score {:.0}): delay {:?} -> {:?}, batch {} -> {}",
            direction,
            score,
            previous.debounce_delay,
            current.debounce_delay,
            previous.batch_size,
            current.batch_size
        );
        Some(TuningAdjustment {
            score,
            direction,
            previous,
            current,
        })
    }

    fn clamp(&self, state: TuningState) -> TuningState {
        let min_delay = Duration::from_millis(self.settings.min_delay_ms);
        let max_delay = Duration::from_millis(self.settings.max_delay_ms);
        TuningState {
            debounce_delay: state.debounce_delay.clamp(min_delay, max_delay.max(min_delay)),
            batch_size: state.batch_size.clamp(
                self.settings.min_batch_size,
                self.settings.max_batch_size.max(self.settings.min_batch_size),
            ),
        }
    }
}
