//! Rolling frame-time measurement and the derived performance score.

use std::collections::VecDeque;
use std::time::Duration;

use ductkit_settings::MonitorSettings;

/// Tracks the most recent frame durations.
#[derive(Debug, Clone)]
pub struct FrameMonitor {
    /// Frame rate that scores 100
    target_fps: f64,
    window_size: usize,
    frames: VecDeque<Duration>,
    total: Duration,
    frames_recorded: u64,
}

impl FrameMonitor {
    /// Create a new monitor averaging over the last `window_size` frames.
    pub fn new(target_fps: f64, window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            target_fps,
            window_size,
            frames: VecDeque::with_capacity(window_size),
            total: Duration::ZERO,
            frames_recorded: 0,
        }
    }

    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self::new(settings.target_fps, settings.window_size)
    }

    /// Record the duration of one rendered frame.
    pub fn record_frame(&mut self, frame_time: Duration) {
        if self.frames.len() == self.window_size {
            if let Some(oldest) = self.frames.pop_front() {
                self.total = self.total.saturating_sub(oldest);
            }
        }
        self.frames.push_back(frame_time);
        self.total += frame_time;
        self.frames_recorded += 1;
    }

    /// Mean frame time over the window, `None` before the first frame.
    pub fn average_frame_time(&self) -> Option<Duration> {
        let count = u32::try_from(self.frames.len()).ok().filter(|n| *n > 0)?;
        Some(self.total / count)
    }

    /// Frames per second implied by the average frame time.
    pub fn fps(&self) -> Option<f64> {
        let average = self.average_frame_time()?.as_secs_f64();
        if average > 0.0 {
            Some(1.0 / average)
        } else {
            Some(f64::INFINITY)
        }
    }

    /// Performance score in `0.0..=100.0`: the measured frame rate as a
    /// percentage of the target, capped at 100.
    pub fn score(&self) -> Option<f64> {
        let fps = self.fps()?;
        Some((fps / self.target_fps * 100.0).clamp(0.0, 100.0))
    }

    pub fn frames_recorded(&self) -> u64 {
        self.frames_recorded
    }

    pub fn reset(&mut self) {
        self.frames.clear();
        self.total = Duration::ZERO;
    }

    /// One-line summary for status displays.
    pub fn report(&self) -> String {
        match (self.fps(), self.score()) {
            (Some(fps), Some(score)) => format!("{:.1} fps, score {:.0}", fps, score),
            _ => "no frames recorded".to_string(),
        }
    }
}

impl Default for FrameMonitor {
    fn default() -> Self {
        Self::from_settings(&MonitorSettings::default())
    }
}
