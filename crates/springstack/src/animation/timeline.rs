#![forbid(unsafe_code)]

//! Timeline: labeled tweens and cues on a shared clock.
//!
//! A [`Timeline`] places progress [`Tween`]s and zero-length cues at offsets
//! from its start. The morph choreography is expressed this way: a position
//! tween from zero, a reveal cue at the start of the crossfade, and an
//! opacity tween a few milliseconds later.
//!
//! # Usage
//!
//! ```ignore
//! use std::time::Duration;
//! use springstack::{Ease, Timeline, Tween};
//!
//! let mut timeline = Timeline::new()
//!     .add("position", Duration::ZERO, Tween::progress(Duration::from_millis(480), ease))
//!     .cue("reveal", Duration::from_millis(450))
//!     .add("fade", Duration::from_millis(460), Tween::progress(Duration::from_millis(30), fade));
//! timeline.play();
//! ```
//!
//! # Invariants
//!
//! 1. Events and cues are kept sorted by offset (stable on insertion).
//! 2. The duration is `max(offset + tween duration, cue offset)` over all entries.
//! 3. Each cue fires exactly once, on the tick where the clock reaches its offset,
//!    including an offset of zero on the very first tick.
//! 4. `tick()` only advances a timeline in the `Playing` state.
//!
//! # Failure Modes
//!
//! - Empty timeline: finishes on its first tick, progress is 1.0.
//! - Unknown label: `event_value` returns `None`.

use std::time::Duration;

use super::{Animation, Tween};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Playback state of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not yet started.
    Idle,
    Playing,
    /// Clock reached the duration.
    Finished,
}

#[derive(Debug)]
struct TimelineEvent {
    offset: Duration,
    label: String,
    tween: Tween,
}

#[derive(Debug)]
struct Cue {
    offset: Duration,
    label: String,
    fired: bool,
}

/// Labeled tweens and cues scheduled against one clock.
#[derive(Debug)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
    cues: Vec<Cue>,
    fired: Vec<String>,
    total_duration: Duration,
    state: PlaybackState,
    current_time: Duration,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl Timeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            cues: Vec::new(),
            fired: Vec::new(),
            total_duration: Duration::ZERO,
            state: PlaybackState::Idle,
            current_time: Duration::ZERO,
        }
    }

    /// Add a labeled tween starting at `offset` (builder pattern).
    #[must_use]
    pub fn add(mut self, label: &str, offset: Duration, tween: Tween) -> Self {
        let end = offset.saturating_add(tween.duration());
        let pos = self.events.partition_point(|e| e.offset <= offset);
        self.events.insert(
            pos,
            TimelineEvent {
                offset,
                label: label.to_string(),
                tween,
            },
        );
        self.total_duration = self.total_duration.max(end);
        self
    }

    /// Add a cue that fires once when the clock reaches `offset` (builder pattern).
    #[must_use]
    pub fn cue(mut self, label: &str, offset: Duration) -> Self {
        let pos = self.cues.partition_point(|c| c.offset <= offset);
        self.cues.insert(
            pos,
            Cue {
                offset,
                label: label.to_string(),
                fired: false,
            },
        );
        self.total_duration = self.total_duration.max(offset);
        self
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

impl Timeline {
    /// Start or restart playback from the beginning.
    pub fn play(&mut self) {
        self.reset();
        self.state = PlaybackState::Playing;
    }

    /// Cues fired since the last call, in offset order.
    pub fn take_cues(&mut self) -> Vec<String> {
        std::mem::take(&mut self.fired)
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn current_time(&self) -> Duration {
        self.current_time
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.total_duration
    }

    /// Eased value of the labeled tween, 0.0 before it starts.
    #[must_use]
    pub fn event_value(&self, label: &str) -> Option<f64> {
        self.events
            .iter()
            .find(|e| e.label == label)
            .map(|e| {
                if self.state == PlaybackState::Idle || self.current_time < e.offset {
                    0.0
                } else {
                    e.tween.eased()
                }
            })
    }

    /// Whether the clock has reached the labeled tween's offset.
    #[must_use]
    pub fn event_started(&self, label: &str) -> bool {
        self.state != PlaybackState::Idle
            && self
                .events
                .iter()
                .any(|e| e.label == label && self.current_time >= e.offset)
    }

    /// Overall progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.total_duration.is_zero() {
            return if self.state == PlaybackState::Idle { 0.0 } else { 1.0 };
        }
        (self.current_time.as_secs_f64() / self.total_duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Animation trait implementation
// ---------------------------------------------------------------------------

impl Animation for Timeline {
    fn tick(&mut self, dt: Duration) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let before = self.current_time;
        let now = before.saturating_add(dt);

        for event in &mut self.events {
            if now < event.offset || event.tween.is_complete() {
                continue;
            }
            if before >= event.offset {
                event.tween.tick(dt);
            } else {
                event.tween.tick(now.saturating_sub(event.offset));
            }
        }

        for cue in &mut self.cues {
            if !cue.fired && now >= cue.offset {
                cue.fired = true;
                self.fired.push(cue.label.clone());
            }
        }

        self.current_time = now;
        if self.current_time >= self.total_duration {
            self.state = PlaybackState::Finished;
        }
    }

    fn is_complete(&self) -> bool {
        self.state == PlaybackState::Finished
    }

    fn value(&self) -> f32 {
        self.progress() as f32
    }

    fn reset(&mut self) {
        self.current_time = Duration::ZERO;
        self.state = PlaybackState::Idle;
        self.fired.clear();
        for event in &mut self.events {
            event.tween.reset();
        }
        for cue in &mut self.cues {
            cue.fired = false;
        }
    }

    fn overshoot(&self) -> Duration {
        if self.state == PlaybackState::Finished {
            self.current_time.saturating_sub(self.total_duration)
        } else {
            Duration::ZERO
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Ease;

    const MS_100: Duration = Duration::from_millis(100);
    const MS_200: Duration = Duration::from_millis(200);
    const MS_300: Duration = Duration::from_millis(300);

    fn morph_like() -> Timeline {
        Timeline::new()
            .add("position", Duration::ZERO, Tween::progress(MS_300, Ease::Linear))
            .cue("reveal", MS_200)
            .add("fade", MS_200 + Duration::from_millis(10), Tween::progress(MS_100, Ease::Linear))
    }

    #[test]
    fn duration_covers_latest_end() {
        assert_eq!(morph_like().duration(), Duration::from_millis(310));
    }

    #[test]
    fn idle_timeline_does_not_advance() {
        let mut tl = morph_like();
        tl.tick(MS_100);
        assert_eq!(tl.current_time(), Duration::ZERO);
        assert_eq!(tl.state(), PlaybackState::Idle);
    }

    #[test]
    fn cues_fire_once_in_order() {
        let mut tl = morph_like().cue("early", Duration::ZERO);
        tl.play();
        tl.tick(Duration::ZERO);
        assert_eq!(tl.take_cues(), vec!["early".to_string()]);
        tl.tick(MS_100);
        assert!(tl.take_cues().is_empty());
        tl.tick(MS_100);
        assert_eq!(tl.take_cues(), vec!["reveal".to_string()]);
        tl.tick(MS_100);
        assert!(tl.take_cues().is_empty());
    }

    #[test]
    fn late_event_only_gets_the_portion_after_its_offset() {
        let mut tl = morph_like();
        tl.play();
        tl.tick(Duration::from_millis(250));
        assert!(tl.event_started("fade"));
        let fade = tl.event_value("fade").unwrap();
        assert!((fade - 0.4).abs() < 1e-9, "fade = {fade}");
        let pos = tl.event_value("position").unwrap();
        assert!((pos - 250.0 / 300.0).abs() < 1e-9);
    }

    #[test]
    fn finishes_at_duration() {
        let mut tl = morph_like();
        tl.play();
        tl.tick(Duration::from_millis(400));
        assert!(tl.is_complete());
        assert_eq!(tl.event_value("fade"), Some(1.0));
        assert_eq!(tl.overshoot(), Duration::from_millis(90));
        assert_eq!(tl.progress(), 1.0);
    }

    #[test]
    fn empty_timeline_finishes_on_first_tick() {
        let mut tl = Timeline::new();
        tl.play();
        tl.tick(Duration::ZERO);
        assert!(tl.is_complete());
        assert_eq!(tl.progress(), 1.0);
    }

    #[test]
    fn unknown_label() {
        assert_eq!(morph_like().event_value("nope"), None);
        assert!(!morph_like().event_started("fade"));
    }
}
