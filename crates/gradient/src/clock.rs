//! Animation clock and frame pacing.
//!
//! Accumulated animation time advances by elapsed real time × speed
//! multiplier while playing and freezes while paused, so it is monotone
//! non-decreasing over the engine's life. Pacing mirrors the scheduling
//! the host's redraw loop expects: `ready_for_frame` gates on an optional
//! FPS cap and `next_deadline` feeds a wait-until control flow.

use std::time::{Duration, Instant};

pub(crate) struct FrameClock {
    accumulated: f64,
    speed: f64,
    last_advance: Option<Instant>,
    playing: bool,
    min_frame_interval: Option<Duration>,
    last_render: Option<Instant>,
}

impl FrameClock {
    pub(crate) fn new() -> Self {
        Self {
            accumulated: 0.0,
            speed: 1.0,
            last_advance: None,
            playing: false,
            min_frame_interval: None,
            last_render: None,
        }
    }

    /// Negative speeds would rewind the clock; they clamp to zero.
    pub(crate) fn set_speed(&mut self, speed: f32) {
        self.speed = f64::from(speed.max(0.0));
    }

    pub(crate) fn set_target_fps(&mut self, fps: Option<f32>) {
        self.min_frame_interval = fps
            .filter(|value| *value > 0.0)
            .map(|value| Duration::from_secs_f64(1.0 / f64::from(value)));
    }

    pub(crate) fn resume(&mut self, now: Instant) {
        if !self.playing {
            self.playing = true;
            self.last_advance = Some(now);
        }
    }

    pub(crate) fn pause(&mut self) {
        self.playing = false;
        self.last_advance = None;
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing
    }

    /// Advances the clock to `now` and returns the animation time.
    pub(crate) fn advance(&mut self, now: Instant) -> f32 {
        if self.playing {
            if let Some(last) = self.last_advance {
                let elapsed = now.saturating_duration_since(last);
                self.accumulated += elapsed.as_secs_f64() * self.speed;
            }
            self.last_advance = Some(now);
        }
        self.accumulated as f32
    }

    /// Whether the FPS cap allows rendering another frame at `now`.
    pub(crate) fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.min_frame_interval, self.last_render) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub(crate) fn mark_rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
    }

    /// Earliest instant the next frame may render, when capped.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        Some(self.last_render? + self.min_frame_interval?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_is_monotone_while_playing() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.resume(start);
        let mut last = clock.advance(start);
        for step in 1..10 {
            let time = clock.advance(start + Duration::from_millis(step * 16));
            assert!(time >= last);
            last = time;
        }
    }

    #[test]
    fn pause_freezes_the_clock() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.resume(start);
        let frozen = clock.advance(start + Duration::from_secs(1));

        clock.pause();
        let after_pause = clock.advance(start + Duration::from_secs(5));
        assert_eq!(after_pause, frozen);

        // Resuming restarts from now; the paused gap never accrues.
        clock.resume(start + Duration::from_secs(5));
        let resumed = clock.advance(start + Duration::from_secs(6));
        assert!((resumed - frozen - 1.0).abs() < 1e-3);
    }

    #[test]
    fn speed_multiplier_scales_elapsed_time() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.set_speed(2.0);
        clock.resume(start);
        let time = clock.advance(start + Duration::from_secs(3));
        assert!((time - 6.0).abs() < 1e-3);
    }

    #[test]
    fn negative_speed_clamps_to_zero() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.set_speed(-1.0);
        clock.resume(start);
        assert_eq!(clock.advance(start + Duration::from_secs(2)), 0.0);
    }

    #[test]
    fn fps_cap_paces_frames() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.set_target_fps(Some(10.0));

        assert!(clock.ready_for_frame(start));
        clock.mark_rendered(start);
        assert!(!clock.ready_for_frame(start + Duration::from_millis(50)));
        assert!(clock.ready_for_frame(start + Duration::from_millis(100)));
        assert_eq!(
            clock.next_deadline(),
            Some(start + Duration::from_millis(100))
        );
    }

    #[test]
    fn uncapped_clock_is_always_ready() {
        let mut clock = FrameClock::new();
        let now = Instant::now();
        clock.mark_rendered(now);
        assert!(clock.ready_for_frame(now));
        assert_eq!(clock.next_deadline(), None);
    }
}
