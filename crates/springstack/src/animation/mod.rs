#![forbid(unsafe_code)]

//! Tick-driven animation primitives.
//!
//! Every animation advances only when [`Animation::tick`] is called with the
//! frame delta, so the same code runs against a real frame clock or a test
//! that steps time by hand.
//!
//! # Invariants
//!
//! 1. `value()` is in `[0.0, 1.0]` before easing is applied; eased values may
//!    overshoot.
//! 2. A zero-duration animation is complete before its first tick.
//! 3. `tick` after completion is a no-op apart from accumulating overshoot.

pub mod ease;
pub mod stagger;
pub mod timeline;

use std::time::Duration;

pub use ease::{Ease, EaseDirection};
pub use stagger::stagger_offsets;
pub use timeline::{PlaybackState, Timeline};

/// Something that progresses over time.
pub trait Animation {
    /// Advance by `dt`.
    fn tick(&mut self, dt: Duration);

    /// True once the animation has reached its end.
    fn is_complete(&self) -> bool;

    /// Current eased progress.
    fn value(&self) -> f32;

    /// Rewind to the start.
    fn reset(&mut self);

    /// Time accumulated past the end, if complete.
    fn overshoot(&self) -> Duration {
        Duration::ZERO
    }
}

/// Interpolates a scalar from `from` to `to` over `duration` along an [`Ease`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    from: f64,
    to: f64,
    duration: Duration,
    elapsed: Duration,
    ease: Ease,
}

impl Tween {
    #[must_use]
    pub fn new(from: f64, to: f64, duration: Duration, ease: Ease) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            ease,
        }
    }

    /// A `0.0 → 1.0` progress tween.
    #[must_use]
    pub fn progress(duration: Duration, ease: Ease) -> Self {
        Self::new(0.0, 1.0, duration, ease)
    }

    /// Linear progress through the duration, clamped to `[0, 1]`.
    #[must_use]
    pub fn linear_progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// Eased progress, possibly outside `[0, 1]`.
    #[must_use]
    pub fn eased(&self) -> f64 {
        let t = self.linear_progress();
        if t >= 1.0 { 1.0 } else { self.ease.apply(t) }
    }

    /// Current interpolated value.
    #[must_use]
    pub fn current(&self) -> f64 {
        self.from + (self.to - self.from) * self.eased()
    }

    #[must_use]
    pub fn target(&self) -> f64 {
        self.to
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Animation for Tween {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn value(&self) -> f32 {
        self.eased() as f32
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    fn overshoot(&self) -> Duration {
        self.elapsed.saturating_sub(self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);

    #[test]
    fn linear_tween_interpolates() {
        let mut t = Tween::new(10.0, 20.0, MS_100, Ease::Linear);
        assert_eq!(t.current(), 10.0);
        t.tick(Duration::from_millis(50));
        assert!((t.current() - 15.0).abs() < 1e-9);
        assert!(!t.is_complete());
        t.tick(Duration::from_millis(70));
        assert!(t.is_complete());
        assert_eq!(t.current(), 20.0);
        assert_eq!(t.overshoot(), Duration::from_millis(20));
    }

    #[test]
    fn zero_duration_is_complete_immediately() {
        let t = Tween::new(0.0, -300.0, Duration::ZERO, Ease::Linear);
        assert!(t.is_complete());
        assert_eq!(t.current(), -300.0);
        assert_eq!(t.value(), 1.0);
    }

    #[test]
    fn reset_rewinds() {
        let mut t = Tween::progress(MS_100, Ease::Linear);
        t.tick(MS_100);
        t.reset();
        assert_eq!(t.value(), 0.0);
        assert!(!t.is_complete());
    }
}
