//! Playback state machine advancing the current frame over time.

use serde::Serialize;

use crate::schema::PlaybackConfig;
use crate::timeline::RangeError;

/// Playback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
}

/// Playback errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    #[error("Speed multiplier must be finite and positive, got {0}")]
    InvalidSpeed(f64),
}

/// Frame-advance state machine driven by host ticks.
///
/// While playing, a tick advances one frame once at least
/// `frame_interval_ms / speed` has passed since the last advance,
/// wrapping from the last frame back to the first.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    total_frames: usize,
    current_frame: usize,
    status: PlaybackStatus,
    speed: f64,
    frame_interval_ms: f64,
    last_tick_ms: f64,
}

impl PlaybackController {
    /// Create a stopped controller with no frames loaded.
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            total_frames: 0,
            current_frame: 0,
            status: PlaybackStatus::Stopped,
            speed: config.default_speed,
            frame_interval_ms: config.frame_interval_ms,
            last_tick_ms: 0.0,
        }
    }

    /// Point at a new timeline: frame 0, stopped. Speed is kept.
    pub fn load(&mut self, total_frames: usize) {
        self.total_frames = total_frames;
        self.current_frame = 0;
        self.status = PlaybackStatus::Stopped;
    }

    pub fn play(&mut self) {
        self.status = PlaybackStatus::Playing;
    }

    pub fn pause(&mut self) {
        self.status = PlaybackStatus::Stopped;
    }

    /// Stop and rewind to frame 0.
    pub fn reset(&mut self) {
        self.status = PlaybackStatus::Stopped;
        self.current_frame = 0;
    }

    /// Jump to a frame. Valid while playing or stopped.
    pub fn seek(&mut self, frame: usize) -> Result<(), RangeError> {
        if frame >= self.total_frames {
            return Err(RangeError::Frame {
                index: frame,
                total: self.total_frames,
            });
        }
        self.current_frame = frame;
        Ok(())
    }

    /// Change the speed multiplier. The tick timer is not reset.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), PlaybackError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(PlaybackError::InvalidSpeed(speed));
        }
        self.speed = speed;
        Ok(())
    }

    /// Current wait between advances, in milliseconds.
    #[inline]
    pub fn advance_interval_ms(&self) -> f64 {
        self.frame_interval_ms / self.speed
    }

    /// Process a host tick. Returns true when the frame advanced.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if self.status != PlaybackStatus::Playing || self.total_frames == 0 {
            return false;
        }
        if now_ms - self.last_tick_ms < self.advance_interval_ms() {
            return false;
        }
        self.current_frame = (self.current_frame + 1) % self.total_frames;
        self.last_tick_ms = now_ms;
        true
    }

    #[inline]
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    #[inline]
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    #[inline]
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn last_tick_ms(&self) -> f64 {
        self.last_tick_ms
    }

    /// One-based position label, e.g. `"3 / 120"`.
    pub fn frame_label(&self) -> String {
        if self.total_frames == 0 {
            return "0 / 0".to_string();
        }
        format!("{} / {}", self.current_frame + 1, self.total_frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(total: usize) -> PlaybackController {
        let mut playback = PlaybackController::new(&PlaybackConfig::default());
        playback.load(total);
        playback
    }

    #[test]
    fn test_initial_state() {
        let playback = controller(4);
        assert_eq!(playback.current_frame(), 0);
        assert_eq!(playback.status(), PlaybackStatus::Stopped);
        assert_eq!(playback.speed(), 1.0);
        assert_eq!(playback.frame_label(), "1 / 4");
    }

    #[test]
    fn test_tick_ignored_when_stopped() {
        let mut playback = controller(4);
        assert!(!playback.tick(1_000.0));
        assert_eq!(playback.current_frame(), 0);
    }

    #[test]
    fn test_tick_rate_limited() {
        let mut playback = controller(4);
        playback.play();

        assert!(!playback.tick(99.0));
        assert!(playback.tick(100.0));
        assert_eq!(playback.current_frame(), 1);
        assert!(!playback.tick(150.0));
        assert!(playback.tick(200.0));
        assert_eq!(playback.current_frame(), 2);
        assert_eq!(playback.last_tick_ms(), 200.0);
    }

    #[test]
    fn test_wraparound() {
        let mut playback = controller(3);
        playback.seek(2).unwrap();
        playback.play();
        assert!(playback.tick(100.0));
        assert_eq!(playback.current_frame(), 0);
    }

    #[test]
    fn test_single_frame_wraps_to_itself() {
        let mut playback = controller(1);
        playback.play();
        assert!(playback.tick(100.0));
        assert_eq!(playback.current_frame(), 0);
    }

    #[test]
    fn test_speed_scaling() {
        fn advance_times(speed: f64) -> Vec<f64> {
            let mut playback = controller(1000);
            playback.set_speed(speed).unwrap();
            playback.play();
            let mut times = Vec::new();
            // ~60 Hz host ticks
            let mut now = 0.0;
            while times.len() < 5 {
                now += 1000.0 / 60.0;
                if playback.tick(now) {
                    times.push(now);
                }
            }
            times
        }

        let gap = |t: &[f64]| (t[4] - t[0]) / 4.0;
        let slow = gap(&advance_times(1.0));
        let fast = gap(&advance_times(2.0));
        // Within one host tick of exactly half.
        assert!((slow / 2.0 - fast).abs() <= 1000.0 / 60.0, "{slow} vs {fast}");
        assert!(fast < slow);
    }

    #[test]
    fn test_speed_change_keeps_timer() {
        let mut playback = controller(10);
        playback.play();
        assert!(playback.tick(100.0));
        playback.set_speed(2.0).unwrap();
        assert_eq!(playback.last_tick_ms(), 100.0);
        assert!(!playback.tick(149.0));
        assert!(playback.tick(150.0));
    }

    #[test]
    fn test_invalid_speed() {
        let mut playback = controller(2);
        assert_eq!(playback.set_speed(0.0), Err(PlaybackError::InvalidSpeed(0.0)));
        assert!(playback.set_speed(-1.0).is_err());
        assert!(playback.set_speed(f64::NAN).is_err());
        assert!(playback.set_speed(f64::INFINITY).is_err());
        assert_eq!(playback.speed(), 1.0);
    }

    #[test]
    fn test_seek_and_reset() {
        let mut playback = controller(5);
        playback.play();
        playback.seek(3).unwrap();
        assert!(playback.is_playing());
        assert_eq!(playback.current_frame(), 3);
        assert_eq!(
            playback.seek(5),
            Err(RangeError::Frame { index: 5, total: 5 })
        );
        assert_eq!(playback.current_frame(), 3);

        playback.reset();
        assert_eq!(playback.current_frame(), 0);
        assert_eq!(playback.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut playback = controller(5);
        playback.play();
        assert!(playback.tick(100.0));
        playback.pause();
        assert!(!playback.tick(500.0));
        assert_eq!(playback.current_frame(), 1);
        playback.play();
        assert!(playback.tick(500.0));
        assert_eq!(playback.current_frame(), 2);
    }

    #[test]
    fn test_load_resets() {
        let mut playback = controller(5);
        playback.set_speed(2.0).unwrap();
        playback.play();
        playback.seek(4).unwrap();

        playback.load(3);
        assert_eq!(playback.current_frame(), 0);
        assert!(!playback.is_playing());
        assert_eq!(playback.total_frames(), 3);
        assert_eq!(playback.speed(), 2.0);
    }

    #[test]
    fn test_empty_controller() {
        let mut playback = PlaybackController::new(&PlaybackConfig::default());
        playback.play();
        assert!(!playback.tick(1_000.0));
        assert!(playback.seek(0).is_err());
        assert_eq!(playback.frame_label(), "0 / 0");
    }
}
