//! # Frame Timing
//!
//! Per-frame delta time, a smoothed frame rate and the optional frame cap.

use web_time::Duration;

use crate::pacer::{Clock, Pace, Pacer, SystemClock};

/// Frame timing with FPS measurement and an optional frame cap.
///
/// The cap is enforced by handing whatever is left of the frame budget to a
/// [`Pacer`], so the statistics it learns carry over from frame to frame.
#[derive(Debug)]
pub struct FrameLimiter<C = SystemClock> {
    /// Target FPS (0 = unlimited)
    target_fps: u32,
    /// Frame duration implied by the target
    frame_budget: Duration,
    pacer: Pacer<C>,
    /// Clock reading at the start of the current frame
    frame_start: Duration,
    /// Exponential moving average of the measured frame rate
    smoothed_fps: f32,
}

impl FrameLimiter<SystemClock> {
    pub fn new(target_fps: u32) -> Self {
        Self::with_pacer(target_fps, Pacer::new())
    }
}

impl<C: Clock> FrameLimiter<C> {
    /// 5% new value, 95% old value for a steady readout
    const SMOOTHING: f32 = 0.05;

    pub fn with_pacer(target_fps: u32, pacer: Pacer<C>) -> Self {
        let frame_start = pacer.clock().now();
        Self {
            target_fps,
            frame_budget: budget_for(target_fps),
            pacer,
            frame_start,
            smoothed_fps: 0.0,
        }
    }

    /// Marks the start of a frame and returns the time since the previous one.
    pub fn begin_frame(&mut self) -> Duration {
        let now = self.pacer.clock().now();
        let delta = now.saturating_sub(self.frame_start);
        self.frame_start = now;

        let frame_time = delta.as_secs_f32();
        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps = if self.smoothed_fps == 0.0 {
                instant_fps
            } else {
                self.smoothed_fps * (1.0 - Self::SMOOTHING) + instant_fps * Self::SMOOTHING
            };
        }

        delta
    }

    /// Sleeps away whatever is left of the current frame's budget.
    ///
    /// Returns `None` when uncapped or when the frame already ran over.
    pub fn wait(&mut self) -> Option<Pace> {
        if self.target_fps == 0 {
            return None;
        }

        let elapsed = self.pacer.clock().now().saturating_sub(self.frame_start);
        let remaining = self.frame_budget.checked_sub(elapsed)?;
        if remaining.is_zero() {
            return None;
        }

        Some(self.pacer.sleep(remaining))
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn set_target_fps(&mut self, target_fps: u32) {
        self.target_fps = target_fps;
        self.frame_budget = budget_for(target_fps);
    }

    /// Smoothed frames per second.
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }

    pub fn pacer(&self) -> &Pacer<C> {
        &self.pacer
    }
}

fn budget_for(target_fps: u32) -> Duration {
    if target_fps > 0 {
        Duration::from_secs_f64(1.0 / target_fps as f64)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacer::tests::ScriptedClock;

    fn limiter(target_fps: u32) -> FrameLimiter<ScriptedClock> {
        FrameLimiter::with_pacer(target_fps, Pacer::with_clock(ScriptedClock::new(&[150, 250])))
    }

    #[test]
    fn uncapped_never_waits() {
        let mut limiter = limiter(0);
        limiter.begin_frame();
        assert!(limiter.wait().is_none());
    }

    #[test]
    fn waits_out_the_rest_of_the_budget() {
        let mut limiter = limiter(50);
        limiter.begin_frame();
        limiter.pacer().clock().advance(Duration::from_millis(5));

        let pace = limiter.wait().expect("frame was under budget");
        assert!(pace.total() >= Duration::from_millis(15));

        let delta = limiter.begin_frame();
        assert!(delta >= Duration::from_millis(20));
        assert!(delta <= Duration::from_millis(21));
    }

    #[test]
    fn overrunning_frames_do_not_wait() {
        let mut limiter = limiter(100);
        limiter.begin_frame();
        limiter.pacer().clock().advance(Duration::from_millis(25));
        assert!(limiter.wait().is_none());
    }

    #[test]
    fn fps_tracks_the_cap() {
        let mut limiter = limiter(30);
        for _ in 0..200 {
            limiter.begin_frame();
            limiter.pacer().clock().advance(Duration::from_millis(2));
            limiter.wait();
        }
        assert!((limiter.fps() - 30.0).abs() < 1.0, "fps = {}", limiter.fps());
    }

    #[test]
    fn changing_the_target_updates_the_budget() {
        let mut limiter = limiter(30);
        limiter.set_target_fps(0);
        assert_eq!(limiter.target_fps(), 0);
        limiter.begin_frame();
        assert!(limiter.wait().is_none());
    }
}
