#![forbid(unsafe_code)]

//! Layout followers: animations that track state instead of operations.
//!
//! [`TrackFollower`] keeps the panel track on the active depth when the
//! depth changes outside a transition (a jump, for instance) and re-snaps it
//! when the viewport is resized. [`CrumbRowTween`] eases the breadcrumb
//! wrapper toward the row's natural height as crumbs wrap and unwrap.
//!
//! Both stand aside while the engine drives the track: during a drill,
//! while an operation is transitioning, while the engine asked followers to
//! skip, or while its own slide is running.

use std::time::Duration;

use tracing::trace;

use crate::animation::{Animation, Tween};
use crate::engine::ViewState;
use crate::scene::Scene;
use crate::timing::TimingConfig;

/// Follows the active depth with the track.
#[derive(Debug, Default)]
pub struct TrackFollower {
    seen_depth: Option<usize>,
    seen_width: Option<f64>,
    tween: Option<Tween>,
}

impl TrackFollower {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a follow animation is running.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    pub fn tick(
        &mut self,
        dt: Duration,
        scene: &mut dyn Scene,
        view: &mut ViewState,
        active_depth: usize,
        transitioning: bool,
        timing: &TimingConfig,
    ) {
        if view.skip_auto_track || view.track_tween_active {
            self.tween = None;
        }
        let blocked = view.deep_linking
            || transitioning
            || view.skip_auto_track
            || view.track_tween_active;
        let width = scene.viewport_width();

        if self.seen_width.is_some_and(|w| w != width) && !blocked {
            self.tween = None;
            scene.set_track_x(-(active_depth as f64) * width);
            view.display_depth = active_depth;
            trace!(target: "springstack.layout", width, depth = active_depth, "track snapped on resize");
        }
        self.seen_width = Some(width);

        let previous = self.seen_depth.replace(active_depth);
        if previous.is_some_and(|d| d != active_depth) && !blocked {
            let to = -(active_depth as f64) * width;
            trace!(target: "springstack.layout", from = ?previous, to = active_depth, "track follows depth");
            self.tween = Some(Tween::new(
                scene.track_x(),
                to,
                timing.track(),
                timing.track_ease.clone(),
            ));
            view.display_depth = active_depth;
        }

        if let Some(tween) = self.tween.as_mut() {
            tween.tick(dt);
            scene.set_track_x(tween.current());
            if tween.is_complete() {
                self.tween = None;
            }
        }
    }
}

/// Eases the breadcrumb wrapper height toward the row height.
#[derive(Debug, Default)]
pub struct CrumbRowTween {
    target: Option<f64>,
    current: f64,
    tween: Option<Tween>,
}

impl CrumbRowTween {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Height last written to the wrapper.
    #[must_use]
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn tick(&mut self, dt: Duration, scene: &mut dyn Scene, timing: &TimingConfig) {
        let height = scene.crumb_row_height();
        match self.target {
            None => {
                self.current = height;
                scene.set_crumb_wrapper_height(height);
            }
            Some(target) if target != height => {
                trace!(target: "springstack.layout", from = self.current, to = height, "crumb row resized");
                self.tween = Some(Tween::new(
                    self.current,
                    height,
                    timing.crumb_height(),
                    timing.crumb_height_ease.clone(),
                ));
            }
            Some(_) => {}
        }
        self.target = Some(height);

        if let Some(tween) = self.tween.as_mut() {
            tween.tick(dt);
            self.current = tween.current();
            scene.set_crumb_wrapper_height(self.current);
            if tween.is_complete() {
                self.tween = None;
            }
        }
    }
}
