#![forbid(unsafe_code)]

//! Transition engine: frame-driven state machines for push, pop, pop-to and
//! drill-to.
//!
//! The engine owns the view-side state the render layer reads
//! ([`ViewState`]) and runs one [`ActiveOperation`] at a time. Every call to
//! [`TransitionEngine::tick`] advances the running job by one frame. Each job
//! is a small phase enum polled with [`Poll`]; the waiting primitives
//! (fixed waits, frame waits, waits for an element, the track slide and the
//! two morphs) are separate machines the jobs compose.
//!
//! # Time
//!
//! The frame delta is consumed by the first primitive that waits on time in
//! a tick. Phases that complete hand over to the next phase within the same
//! tick with zero elapsed time, so a chain of instant phases never costs a
//! frame. A finished job resolves immediately and the next queued operation
//! starts in the same tick.
//!
//! # Invariants
//!
//! 1. At most one ghost is alive, owned by the running job, and it is
//!    removed before the job resolves.
//! 2. The stack is committed exactly once per push or pop step.
//! 3. Timing is sampled when an operation starts; changes made while it
//!    runs apply to the next one.
//! 4. `transitioning` is set for the duration of every push and pop step.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Push source card not laid out | Push without a ghost, wait one beat |
//! | Morph target missing after 2000 ms | Ghost removed, morph skipped |
//! | Target vanishes before the reveal | Ghost removed, flags cleared |
//! | Ghost detached underneath | Morph ends, flags cleared |
//! | Viewport width stays 0 for 2000 ms | Track slide skipped |
//! | Drill card missing (`abort`) | Drill stops, completion still resolves |

use std::task::Poll;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::animation::{Animation, Timeline, Tween};
use crate::controller::{ActiveOperation, DrillOrigin, NavController, Operation, OperationKind};
use crate::geometry::{Offset, Rect};
use crate::node::{Node, NodeKey, describe_path, path_keys};
use crate::routing::MissingCardPolicy;
use crate::scene::{GhostFrame, GhostId, GhostSpec, Part, Scene, Snapshot, Target};
use crate::timing::TimingConfig;

/// How long a morph waits for its target to appear.
pub const LOCATE_TIMEOUT: Duration = Duration::from_millis(2000);
/// How long a track slide waits for a non-zero viewport width.
pub const TRACK_READY_TIMEOUT: Duration = Duration::from_millis(2000);
/// Gap between the reveal of the target and the start of the ghost fade.
const FADE_OUT_LAG: Duration = Duration::from_millis(10);

const POSITION: &str = "position";
const REVEAL: &str = "reveal";
const FADE: &str = "fade";

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Direction of the last navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NavDirection {
    Forward,
    Back,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphDirection {
    /// List card into its breadcrumb (push).
    ToCrumb,
    /// Breadcrumb back into its list card (pop).
    ToList,
}

/// The node whose ghost is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morphing {
    pub key: NodeKey,
    pub direction: MorphDirection,
}

/// A list card kept hidden while its breadcrumb represents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenCard {
    pub key: NodeKey,
    /// Depth of the panel holding the card.
    pub depth: usize,
}

/// Engine-owned state the render layer reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Depth the track currently shows.
    pub display_depth: usize,
    pub hidden_card: Option<HiddenCard>,
    /// Breadcrumb not yet revealed.
    pub pending_crumb: Option<NodeKey>,
    pub morphing: Option<Morphing>,
    /// A morph timeline is playing.
    pub morph_active: bool,
    /// Source card hidden on the scene for the duration of a push.
    pub hidden_source: Option<NodeKey>,
    /// A drill is replaying a path.
    pub deep_linking: bool,
    pub nav_direction: NavDirection,
    /// The engine drives the track; followers stay put.
    pub skip_auto_track: bool,
    pub track_tween_active: bool,
}

impl ViewState {
    /// Whether the list card for `key` should render hidden.
    ///
    /// The hidden card becomes visible while it is the target of a running
    /// to-list morph, so the morph can fade it in.
    #[must_use]
    pub fn should_hide_card(&self, key: &NodeKey) -> bool {
        let hidden = self.hidden_card.as_ref().is_some_and(|h| &h.key == key);
        let morphing_in = self.morph_active
            && self
                .morphing
                .as_ref()
                .is_some_and(|m| m.direction == MorphDirection::ToList && &m.key == key);
        hidden && !morphing_in
    }

    #[must_use]
    pub fn is_crumb_pending(&self, key: &NodeKey) -> bool {
        self.pending_crumb.as_ref() == Some(key)
    }

    fn clear_pending(&mut self, key: &NodeKey) {
        if self.pending_crumb.as_ref() == Some(key) {
            self.pending_crumb = None;
        }
    }
}

/// What happened inside a tick, for the routing adapter and observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Started {
        id: u64,
        kind: OperationKind,
        origin: Option<DrillOrigin>,
    },
    Finished {
        id: u64,
        kind: OperationKind,
        origin: Option<DrillOrigin>,
    },
    /// A drill stopped because the card for `at` never appeared.
    DrillAborted { at: NodeKey },
}

/// How drills treat cards that are slow to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrillSettings {
    pub wait_for_card: Duration,
    pub on_missing_card: MissingCardPolicy,
}

impl Default for DrillSettings {
    fn default() -> Self {
        Self {
            wait_for_card: Duration::from_millis(15_000),
            on_missing_card: MissingCardPolicy::Abort,
        }
    }
}

impl DrillSettings {
    /// `None` waits forever.
    #[must_use]
    pub fn card_timeout(&self) -> Option<Duration> {
        match self.on_missing_card {
            MissingCardPolicy::Wait => None,
            MissingCardPolicy::Abort | MissingCardPolicy::Push => Some(self.wait_for_card),
        }
    }
}

// ---------------------------------------------------------------------------
// Tick context
// ---------------------------------------------------------------------------

struct Cx<'a, D> {
    scene: &'a mut dyn Scene,
    controller: &'a NavController<D>,
    view: &'a mut ViewState,
    timing: &'a TimingConfig,
    drill: DrillSettings,
    events: &'a mut Vec<EngineEvent>,
    synced_version: &'a mut u64,
    frame: u64,
    dt: Duration,
}

impl<D: Clone + 'static> Cx<'_, D> {
    /// The unconsumed part of this frame's delta; zero after the first call.
    fn take_dt(&mut self) -> Duration {
        std::mem::take(&mut self.dt)
    }

    fn commit(&mut self, next: Vec<Node<D>>) {
        debug!(target: "springstack.engine", path = %describe_path(&next), "commit");
        self.controller.commit_stack(next);
        sync_scene(self.scene, self.controller, self.synced_version);
    }

    fn clear_hidden_source(&mut self) {
        if let Some(source) = self.view.hidden_source.take() {
            let target = Target::Card(source);
            self.scene.set_hidden(&target, false);
            self.scene.set_opacity(&target, Part::Shell, None);
            self.scene.set_opacity(&target, Part::Content, None);
        }
    }

    /// Place the track at `depth` without animating.
    fn snap_track(&mut self, depth: usize) {
        self.view.display_depth = depth;
        let width = self.scene.viewport_width();
        if width > 0.0 {
            self.scene.set_track_x(-(depth as f64) * width);
        }
    }
}

fn sync_scene<D: Clone + 'static>(
    scene: &mut dyn Scene,
    controller: &NavController<D>,
    synced_version: &mut u64,
) {
    let version = controller.stack_version();
    if version != *synced_version {
        let keys = controller.with_stack(path_keys);
        scene.stack_committed(&keys);
        *synced_version = version;
    }
}

/// Depth shown by a track at `track_x`.
fn depth_at(track_x: f64, width: f64) -> usize {
    let depth = (-track_x / width).round();
    if depth.is_finite() && depth > 0.0 {
        depth as usize
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Waiting primitives
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Wait {
    remaining: Duration,
}

impl Wait {
    fn new(duration: Duration) -> Self {
        Self {
            remaining: duration,
        }
    }

    fn poll<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> Poll<()> {
        if !self.remaining.is_zero() {
            self.remaining = self.remaining.saturating_sub(cx.take_dt());
        }
        if self.remaining.is_zero() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Completes once `count` frame boundaries have passed since the first poll.
#[derive(Debug)]
struct Frames {
    count: u64,
    start: Option<u64>,
}

impl Frames {
    fn new(count: u64) -> Self {
        Self { count, start: None }
    }

    fn poll<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> Poll<()> {
        let start = *self.start.get_or_insert(cx.frame);
        if cx.frame >= start + self.count {
            Poll::Ready(())
        } else {
            cx.take_dt();
            Poll::Pending
        }
    }
}

/// Polls the scene for a target once per frame.
#[derive(Debug)]
struct WaitFor {
    target: Target,
    timeout: Option<Duration>,
    elapsed: Duration,
}

impl WaitFor {
    fn new(target: Target, timeout: Option<Duration>) -> Self {
        Self {
            target,
            timeout,
            elapsed: Duration::ZERO,
        }
    }

    /// `Ready(None)` on timeout.
    fn poll<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> Poll<Option<Snapshot>> {
        if let Some(snapshot) = cx.scene.snapshot(&self.target) {
            return Poll::Ready(Some(snapshot));
        }
        self.elapsed = self.elapsed.saturating_add(cx.take_dt());
        match self.timeout {
            Some(limit) if self.elapsed >= limit => Poll::Ready(None),
            _ => Poll::Pending,
        }
    }
}

/// Waits for a non-zero viewport width; `Ready(false)` on timeout.
#[derive(Debug, Default)]
struct TrackReady {
    elapsed: Duration,
}

impl TrackReady {
    fn poll<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> Poll<bool> {
        if cx.scene.viewport_width() > 0.0 {
            return Poll::Ready(true);
        }
        self.elapsed = self.elapsed.saturating_add(cx.take_dt());
        if self.elapsed >= TRACK_READY_TIMEOUT {
            warn!(target: "springstack.engine", "viewport width still zero; track not ready");
            Poll::Ready(false)
        } else {
            Poll::Pending
        }
    }
}

/// Slides the track from one depth to another.
#[derive(Debug)]
struct TrackSlide {
    from: usize,
    to: usize,
    ready: TrackReady,
    tween: Option<Tween>,
}

impl TrackSlide {
    fn new(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            ready: TrackReady::default(),
            tween: None,
        }
    }

    fn poll<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> Poll<()> {
        if self.tween.is_none() {
            if self.ready.poll(cx).is_pending() {
                return Poll::Pending;
            }
            let width = cx.scene.viewport_width();
            if width <= 0.0 {
                return Poll::Ready(());
            }
            let from_x = -(self.from as f64) * width;
            let to_x = -(self.to as f64) * width;
            trace!(target: "springstack.engine", from = self.from, to = self.to, width, "track slide");
            cx.scene.set_track_x(from_x);
            cx.view.track_tween_active = true;
            self.tween = Some(Tween::new(
                from_x,
                to_x,
                cx.timing.track(),
                cx.timing.track_ease.clone(),
            ));
        }
        let Some(tween) = self.tween.as_mut() else {
            return Poll::Ready(());
        };
        tween.tick(cx.take_dt());
        if tween.is_complete() {
            cx.scene.set_track_x(tween.target());
            cx.view.display_depth = self.to;
            cx.view.track_tween_active = false;
            Poll::Ready(())
        } else {
            cx.scene.set_track_x(tween.current());
            Poll::Pending
        }
    }
}

// ---------------------------------------------------------------------------
// Morphs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct GhostHandle {
    id: GhostId,
    origin: Rect,
}

impl GhostHandle {
    fn mount(scene: &mut dyn Scene, source: Target, snapshot: &Snapshot) -> Self {
        let origin = snapshot.shell;
        let id = scene.mount_ghost(GhostSpec {
            source,
            origin,
            padding: snapshot.padding,
            has_content: snapshot.has_content,
        });
        scene.place_ghost(id, GhostFrame::at_origin(false));
        Self { id, origin }
    }
}

#[derive(Debug)]
struct Correction {
    from: Offset,
    to: Offset,
    tween: Tween,
}

#[derive(Debug)]
struct MorphRun {
    timeline: Timeline,
    delta: Offset,
    current: Offset,
    correction: Option<Correction>,
    snapped: Option<Offset>,
}

#[derive(Debug)]
enum MorphStage {
    Settle(Frames),
    Locate(WaitFor),
    Run(MorphRun),
}

/// Ghost flight between a list card and a breadcrumb.
///
/// To-crumb morphs land on the crumb's content box and ease onto a fresh
/// measurement over the crossfade. To-list morphs land on the card's outer
/// box and snap to a fresh measurement at the reveal.
#[derive(Debug)]
struct Morph {
    direction: MorphDirection,
    key: NodeKey,
    ghost: GhostHandle,
    stage: MorphStage,
}

impl Morph {
    fn to_crumb(key: NodeKey, ghost: GhostHandle) -> Self {
        let target = Target::Crumb(key.clone());
        Self {
            direction: MorphDirection::ToCrumb,
            key,
            ghost,
            stage: MorphStage::Locate(WaitFor::new(target, Some(LOCATE_TIMEOUT))),
        }
    }

    fn to_list(key: NodeKey, ghost: GhostHandle) -> Self {
        Self {
            direction: MorphDirection::ToList,
            key,
            ghost,
            stage: MorphStage::Settle(Frames::new(2)),
        }
    }

    fn target(&self) -> Target {
        match self.direction {
            MorphDirection::ToCrumb => Target::Crumb(self.key.clone()),
            MorphDirection::ToList => Target::Card(self.key.clone()),
        }
    }

    /// Translation that puts the ghost on its landing spot.
    fn landing(&self, snapshot: &Snapshot) -> Offset {
        match self.direction {
            MorphDirection::ToCrumb => self.ghost.origin.offset_to(snapshot.content_origin()),
            MorphDirection::ToList => self
                .ghost
                .origin
                .offset_to((snapshot.outer.x, snapshot.outer.y)),
        }
    }

    fn poll<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> Poll<()> {
        loop {
            match &mut self.stage {
                MorphStage::Settle(frames) => {
                    if frames.poll(cx).is_pending() {
                        return Poll::Pending;
                    }
                    self.stage =
                        MorphStage::Locate(WaitFor::new(self.target(), Some(LOCATE_TIMEOUT)));
                }
                MorphStage::Locate(wait) => match wait.poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Some(snapshot)) if snapshot.has_content => {
                        let run = self.begin(cx, &snapshot);
                        self.stage = MorphStage::Run(run);
                    }
                    Poll::Ready(_) => {
                        self.abort(cx, "target not found");
                        return Poll::Ready(());
                    }
                },
                MorphStage::Run(_) => return self.step(cx),
            }
        }
    }

    fn begin<D: Clone + 'static>(&self, cx: &mut Cx<'_, D>, snapshot: &Snapshot) -> MorphRun {
        let target = self.target();
        cx.scene.set_opacity(&target, Part::Shell, Some(0.0));
        cx.scene.set_opacity(&target, Part::Content, Some(0.0));
        let delta = self.landing(snapshot);
        let morph = cx.timing.morph();
        let crossfade = cx.timing.crossfade();
        let reveal_at = morph.saturating_sub(crossfade);
        let fade_at = match self.direction {
            MorphDirection::ToCrumb => reveal_at + FADE_OUT_LAG,
            MorphDirection::ToList => reveal_at,
        };
        let mut timeline = Timeline::new()
            .add(
                POSITION,
                Duration::ZERO,
                Tween::progress(morph, cx.timing.morph_ease.clone()),
            )
            .cue(REVEAL, reveal_at)
            .add(
                FADE,
                fade_at,
                Tween::progress(crossfade, cx.timing.fade_ease.clone()),
            );
        timeline.play();
        cx.view.morph_active = true;
        debug!(
            target: "springstack.engine",
            key = %self.key,
            direction = ?self.direction,
            dx = delta.dx,
            dy = delta.dy,
            "morph started"
        );
        MorphRun {
            timeline,
            delta,
            current: Offset::ZERO,
            correction: None,
            snapped: None,
        }
    }

    fn step<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> Poll<()> {
        let target = self.target();
        let dt = cx.take_dt();
        let mut reveal = None;
        {
            let MorphStage::Run(run) = &mut self.stage else {
                return Poll::Ready(());
            };
            run.timeline.tick(dt);
            if let Some(correction) = run.correction.as_mut() {
                correction.tween.tick(dt);
            }
            for cue in run.timeline.take_cues() {
                if cue == REVEAL {
                    reveal = Some(cx.scene.snapshot(&target));
                }
            }
        }
        if let Some(measured) = reveal {
            let Some(snapshot) = measured else {
                self.abort(cx, "target vanished before reveal");
                return Poll::Ready(());
            };
            let fresh = self.landing(&snapshot);
            let crossfade = cx.timing.crossfade();
            let fade_ease = cx.timing.fade_ease.clone();
            if let MorphStage::Run(run) = &mut self.stage {
                match self.direction {
                    MorphDirection::ToCrumb => {
                        run.correction = Some(Correction {
                            from: run.current,
                            to: fresh,
                            tween: Tween::progress(crossfade, fade_ease),
                        });
                    }
                    MorphDirection::ToList => run.snapped = Some(fresh),
                }
            }
            cx.scene.set_opacity(&target, Part::Shell, Some(1.0));
            cx.scene.set_opacity(&target, Part::Content, Some(1.0));
            if self.direction == MorphDirection::ToCrumb {
                cx.view.clear_pending(&self.key);
            }
        }

        let MorphStage::Run(run) = &mut self.stage else {
            return Poll::Ready(());
        };
        run.current = if let Some(at) = run.snapped {
            at
        } else if let Some(c) = &run.correction {
            c.from.lerp(c.to, c.tween.eased())
        } else {
            let t = run.timeline.event_value(POSITION).unwrap_or(1.0);
            Offset::ZERO.lerp(run.delta, t)
        };
        let opacity = 1.0 - run.timeline.event_value(FADE).unwrap_or(0.0);
        let frame = GhostFrame {
            offset: run.current,
            opacity,
            content_opacity: opacity,
            muted: self.direction == MorphDirection::ToList,
        };
        let complete = run.timeline.is_complete();
        if !cx.scene.place_ghost(self.ghost.id, frame) {
            self.abort(cx, "ghost detached");
            return Poll::Ready(());
        }
        if complete {
            self.finish(cx);
            return Poll::Ready(());
        }
        Poll::Pending
    }

    fn finish<D: Clone + 'static>(&self, cx: &mut Cx<'_, D>) {
        let target = self.target();
        cx.scene.set_opacity(&target, Part::Shell, None);
        cx.scene.set_opacity(&target, Part::Content, None);
        cx.scene.remove_ghost(self.ghost.id);
        cx.view.morph_active = false;
        if self.direction == MorphDirection::ToCrumb {
            cx.view.clear_pending(&self.key);
        }
        trace!(target: "springstack.engine", key = %self.key, "morph finished");
    }

    fn abort<D: Clone + 'static>(&self, cx: &mut Cx<'_, D>, reason: &'static str) {
        warn!(
            target: "springstack.engine",
            key = %self.key,
            direction = ?self.direction,
            reason,
            "morph ended early"
        );
        self.finish(cx);
    }
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum PushPhase {
    Start,
    Morph(Morph),
    Beat(Wait),
    TrackReady(TrackReady),
    Slide(TrackSlide),
    Settle(Frames),
    Finished,
}

#[derive(Debug)]
struct PushJob<D> {
    node: Node<D>,
    source: Option<NodeKey>,
    from_override: Option<usize>,
    prev_depth: usize,
    next_depth: usize,
    phase: PushPhase,
}

impl<D: Clone + 'static> PushJob<D> {
    fn new(node: Node<D>, source: Option<NodeKey>, from_override: Option<usize>) -> Self {
        Self {
            node,
            source,
            from_override,
            prev_depth: 0,
            next_depth: 0,
            phase: PushPhase::Start,
        }
    }

    fn poll(&mut self, cx: &mut Cx<'_, D>) -> Poll<()> {
        loop {
            self.phase = match std::mem::replace(&mut self.phase, PushPhase::Finished) {
                PushPhase::Start => self.start(cx),
                PushPhase::Morph(mut morph) => {
                    if morph.poll(cx).is_pending() {
                        self.phase = PushPhase::Morph(morph);
                        return Poll::Pending;
                    }
                    PushPhase::TrackReady(TrackReady::default())
                }
                PushPhase::Beat(mut wait) => {
                    if wait.poll(cx).is_pending() {
                        self.phase = PushPhase::Beat(wait);
                        return Poll::Pending;
                    }
                    cx.view.clear_pending(&self.node.key());
                    PushPhase::TrackReady(TrackReady::default())
                }
                PushPhase::TrackReady(mut ready) => {
                    if ready.poll(cx).is_pending() {
                        self.phase = PushPhase::TrackReady(ready);
                        return Poll::Pending;
                    }
                    let from = self.from_depth(cx);
                    cx.view.skip_auto_track = true;
                    cx.controller.set_active_depth(self.next_depth);
                    PushPhase::Slide(TrackSlide::new(from, self.next_depth))
                }
                PushPhase::Slide(mut slide) => {
                    if slide.poll(cx).is_pending() {
                        self.phase = PushPhase::Slide(slide);
                        return Poll::Pending;
                    }
                    PushPhase::Settle(Frames::new(1))
                }
                PushPhase::Settle(mut frames) => {
                    if frames.poll(cx).is_pending() {
                        self.phase = PushPhase::Settle(frames);
                        return Poll::Pending;
                    }
                    cx.view.skip_auto_track = false;
                    cx.view.morphing = None;
                    cx.clear_hidden_source();
                    cx.controller.set_transitioning(false);
                    PushPhase::Finished
                }
                PushPhase::Finished => return Poll::Ready(()),
            };
        }
    }

    fn start(&mut self, cx: &mut Cx<'_, D>) -> PushPhase {
        let key = self.node.key();
        if cx.controller.with_stack(|s| s.iter().any(|n| n.is(&key))) {
            warn!(target: "springstack.engine", key = %key, "push of a node already on the stack ignored");
            return PushPhase::Finished;
        }
        cx.view.nav_direction = NavDirection::Forward;
        cx.controller.set_transitioning(true);
        self.prev_depth = cx.view.display_depth;
        cx.view.pending_crumb = Some(key.clone());

        let mut ghost = None;
        if let Some(source) = &self.source {
            let target = Target::Card(source.clone());
            match cx.scene.snapshot(&target) {
                Some(snapshot) => {
                    ghost = Some(GhostHandle::mount(cx.scene, target.clone(), &snapshot));
                    cx.scene.set_hidden(&target, true);
                    cx.view.hidden_source = Some(source.clone());
                    cx.view.hidden_card = Some(HiddenCard {
                        key: source.clone(),
                        depth: cx.controller.active_depth(),
                    });
                }
                None => warn!(
                    target: "springstack.engine",
                    source = %source,
                    "source card not laid out; pushing without a morph"
                ),
            }
        }
        cx.view.morphing = Some(Morphing {
            key: key.clone(),
            direction: MorphDirection::ToCrumb,
        });

        let mut next = cx.controller.stack();
        next.push(self.node.clone());
        self.next_depth = next.len() - 1;
        cx.commit(next);

        match ghost {
            Some(ghost) => PushPhase::Morph(Morph::to_crumb(key, ghost)),
            None => PushPhase::Beat(Wait::new(cx.timing.beat())),
        }
    }

    /// Depth the slide starts from: the track's own position, the display
    /// depth while deep linking, or the drill depth when given.
    fn from_depth(&self, cx: &mut Cx<'_, D>) -> usize {
        let width = cx.scene.viewport_width();
        let mut from = self.prev_depth;
        if width > 0.0 {
            from = depth_at(cx.scene.track_x(), width);
        }
        if cx.view.deep_linking {
            from = cx.view.display_depth;
        }
        if let Some(depth) = self.from_override {
            from = depth;
        }
        from.min(self.next_depth)
    }
}

// ---------------------------------------------------------------------------
// Pop
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum PopPhase {
    Start,
    Slide(TrackSlide),
    Settle(Frames),
    Morph(Morph),
    Beat(Wait),
    Finished,
}

#[derive(Debug)]
struct PopJob {
    popped: Option<NodeKey>,
    ghost: Option<GhostHandle>,
    phase: PopPhase,
}

impl PopJob {
    fn new() -> Self {
        Self {
            popped: None,
            ghost: None,
            phase: PopPhase::Start,
        }
    }

    fn poll<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> Poll<()> {
        loop {
            self.phase = match std::mem::replace(&mut self.phase, PopPhase::Finished) {
                PopPhase::Start => self.start(cx),
                PopPhase::Slide(mut slide) => {
                    if slide.poll(cx).is_pending() {
                        self.phase = PopPhase::Slide(slide);
                        return Poll::Pending;
                    }
                    PopPhase::Settle(Frames::new(1))
                }
                PopPhase::Settle(mut frames) => {
                    if frames.poll(cx).is_pending() {
                        self.phase = PopPhase::Settle(frames);
                        return Poll::Pending;
                    }
                    cx.view.skip_auto_track = false;
                    match (self.ghost.take(), self.popped.clone()) {
                        (Some(ghost), Some(key)) => PopPhase::Morph(Morph::to_list(key, ghost)),
                        _ => PopPhase::Beat(Wait::new(cx.timing.beat())),
                    }
                }
                PopPhase::Morph(mut morph) => {
                    if morph.poll(cx).is_pending() {
                        self.phase = PopPhase::Morph(morph);
                        return Poll::Pending;
                    }
                    self.finish(cx)
                }
                PopPhase::Beat(mut wait) => {
                    if wait.poll(cx).is_pending() {
                        self.phase = PopPhase::Beat(wait);
                        return Poll::Pending;
                    }
                    self.finish(cx)
                }
                PopPhase::Finished => return Poll::Ready(()),
            };
        }
    }

    fn start<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> PopPhase {
        cx.view.nav_direction = NavDirection::Back;
        let stack = cx.controller.stack();
        let Some((node, rest)) = stack.split_last().filter(|(_, rest)| !rest.is_empty()) else {
            debug!(target: "springstack.engine", "pop at the root ignored");
            return PopPhase::Finished;
        };
        cx.controller.set_transitioning(true);

        let width = cx.scene.viewport_width();
        let from = if width > 0.0 {
            depth_at(cx.scene.track_x(), width)
        } else {
            cx.view.display_depth
        };
        let key = node.key();
        let next_depth = rest.len() - 1;

        let crumb = Target::Crumb(key.clone());
        self.ghost = cx
            .scene
            .snapshot(&crumb)
            .map(|snapshot| GhostHandle::mount(cx.scene, crumb.clone(), &snapshot));
        cx.view.morphing = Some(Morphing {
            key: key.clone(),
            direction: MorphDirection::ToList,
        });
        cx.view.hidden_card = Some(HiddenCard {
            key: key.clone(),
            depth: next_depth,
        });
        self.popped = Some(key);
        cx.commit(rest.to_vec());
        cx.view.skip_auto_track = true;
        cx.controller.set_active_depth(next_depth);
        PopPhase::Slide(TrackSlide::new(from, next_depth))
    }

    fn finish<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> PopPhase {
        cx.view.hidden_card = None;
        cx.view.morphing = None;
        cx.controller.set_transitioning(false);
        PopPhase::Finished
    }
}

// ---------------------------------------------------------------------------
// Pop to index
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum PopToPhase {
    Check,
    Pop(PopJob),
    Pause(Wait),
    Finished,
}

#[derive(Debug)]
struct PopToJob {
    index: usize,
    phase: PopToPhase,
}

impl PopToJob {
    fn poll<D: Clone + 'static>(&mut self, cx: &mut Cx<'_, D>) -> Poll<()> {
        loop {
            self.phase = match std::mem::replace(&mut self.phase, PopToPhase::Finished) {
                PopToPhase::Check => {
                    if cx.controller.stack_len().saturating_sub(1) > self.index {
                        PopToPhase::Pop(PopJob::new())
                    } else {
                        PopToPhase::Finished
                    }
                }
                PopToPhase::Pop(mut pop) => {
                    if pop.poll(cx).is_pending() {
                        self.phase = PopToPhase::Pop(pop);
                        return Poll::Pending;
                    }
                    PopToPhase::Pause(Wait::new(cx.timing.pop_pause()))
                }
                PopToPhase::Pause(mut wait) => {
                    if wait.poll(cx).is_pending() {
                        self.phase = PopToPhase::Pause(wait);
                        return Poll::Pending;
                    }
                    PopToPhase::Check
                }
                PopToPhase::Finished => return Poll::Ready(()),
            };
        }
    }
}

// ---------------------------------------------------------------------------
// Drill
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum DrillPhase<D> {
    Start,
    Lead(Wait),
    TrackReady(TrackReady),
    Find(WaitFor),
    Push(PushJob<D>),
    Gap(Wait),
    Finished,
}

#[derive(Debug)]
struct DrillJob<D> {
    path: Vec<Node<D>>,
    index: usize,
    drill_depth: usize,
    phase: DrillPhase<D>,
}

impl<D: Clone + 'static> DrillJob<D> {
    fn new(path: Vec<Node<D>>) -> Self {
        Self {
            path,
            index: 1,
            drill_depth: 0,
            phase: DrillPhase::Start,
        }
    }

    fn poll(&mut self, cx: &mut Cx<'_, D>) -> Poll<()> {
        loop {
            self.phase = match std::mem::replace(&mut self.phase, DrillPhase::Finished) {
                DrillPhase::Start => self.start(cx),
                DrillPhase::Lead(mut wait) => {
                    if wait.poll(cx).is_pending() {
                        self.phase = DrillPhase::Lead(wait);
                        return Poll::Pending;
                    }
                    DrillPhase::TrackReady(TrackReady::default())
                }
                DrillPhase::TrackReady(mut ready) => {
                    if ready.poll(cx).is_pending() {
                        self.phase = DrillPhase::TrackReady(ready);
                        return Poll::Pending;
                    }
                    cx.snap_track(0);
                    self.next_target(cx)
                }
                DrillPhase::Find(mut wait) => match wait.poll(cx) {
                    Poll::Pending => {
                        self.phase = DrillPhase::Find(wait);
                        return Poll::Pending;
                    }
                    Poll::Ready(found) => self.on_card(cx, found.is_some()),
                },
                DrillPhase::Push(mut push) => {
                    if push.poll(cx).is_pending() {
                        self.phase = DrillPhase::Push(push);
                        return Poll::Pending;
                    }
                    self.drill_depth += 1;
                    self.index += 1;
                    DrillPhase::Gap(Wait::new(cx.timing.push_pause()))
                }
                DrillPhase::Gap(mut wait) => {
                    if wait.poll(cx).is_pending() {
                        self.phase = DrillPhase::Gap(wait);
                        return Poll::Pending;
                    }
                    self.next_target(cx)
                }
                DrillPhase::Finished => return Poll::Ready(()),
            };
        }
    }

    fn start(&mut self, cx: &mut Cx<'_, D>) -> DrillPhase<D> {
        let Some(first) = self.path.first().cloned() else {
            debug!(target: "springstack.engine", "empty drill path");
            return DrillPhase::Finished;
        };
        debug!(target: "springstack.engine", path = %describe_path(&self.path), "drill started");
        cx.view.deep_linking = true;
        cx.view.nav_direction = NavDirection::Forward;
        let at_first = cx
            .controller
            .with_stack(|s| s.len() == 1 && s[0].same_key(&first));
        if !at_first {
            cx.commit(vec![first]);
            cx.controller.set_active_depth(0);
            cx.view.hidden_card = None;
            cx.view.morphing = None;
            cx.view.pending_crumb = None;
            cx.clear_hidden_source();
        }
        cx.snap_track(0);
        DrillPhase::Lead(Wait::new(cx.timing.push_pause()))
    }

    fn next_target(&mut self, cx: &mut Cx<'_, D>) -> DrillPhase<D> {
        match self.path.get(self.index) {
            Some(node) => DrillPhase::Find(WaitFor::new(
                Target::Card(node.key()),
                cx.drill.card_timeout(),
            )),
            None => self.finish(cx),
        }
    }

    fn on_card(&mut self, cx: &mut Cx<'_, D>, found: bool) -> DrillPhase<D> {
        let Some(node) = self.path.get(self.index).cloned() else {
            return self.finish(cx);
        };
        let key = node.key();
        if found {
            return DrillPhase::Push(PushJob::new(node, Some(key), Some(self.drill_depth)));
        }
        match cx.drill.on_missing_card {
            MissingCardPolicy::Push => {
                debug!(target: "springstack.engine", key = %key, "card missing; pushing without a source");
                DrillPhase::Push(PushJob::new(node, None, Some(self.drill_depth)))
            }
            MissingCardPolicy::Abort | MissingCardPolicy::Wait => {
                warn!(target: "springstack.engine", key = %key, "card missing; drill aborted");
                cx.events.push(EngineEvent::DrillAborted { at: key });
                self.finish(cx)
            }
        }
    }

    fn finish(&mut self, cx: &mut Cx<'_, D>) -> DrillPhase<D> {
        cx.view.deep_linking = false;
        debug!(target: "springstack.engine", depth = cx.controller.stack_len(), "drill finished");
        DrillPhase::Finished
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Job<D> {
    Push(PushJob<D>),
    Pop(PopJob),
    PopTo(PopToJob),
    Drill(DrillJob<D>),
}

impl<D: Clone + 'static> Job<D> {
    fn from_operation(op: &Operation<D>) -> Self {
        match op {
            Operation::Push { node, source } => {
                Self::Push(PushJob::new(node.clone(), source.clone(), None))
            }
            Operation::Pop => Self::Pop(PopJob::new()),
            Operation::PopTo { index } => Self::PopTo(PopToJob {
                index: *index,
                phase: PopToPhase::Check,
            }),
            Operation::DrillTo { path, .. } => Self::Drill(DrillJob::new(path.clone())),
        }
    }

    fn poll(&mut self, cx: &mut Cx<'_, D>) -> Poll<()> {
        match self {
            Self::Push(job) => job.poll(cx),
            Self::Pop(job) => job.poll(cx),
            Self::PopTo(job) => job.poll(cx),
            Self::Drill(job) => job.poll(cx),
        }
    }
}

struct Running<D> {
    active: ActiveOperation<D>,
    origin: Option<DrillOrigin>,
    timing: TimingConfig,
    job: Job<D>,
}

/// Executes queued operations one at a time against a [`Scene`].
pub struct TransitionEngine<D> {
    view: ViewState,
    running: Option<Running<D>>,
    events: Vec<EngineEvent>,
    drill: DrillSettings,
    synced_version: u64,
    frame: u64,
}

impl<D> std::fmt::Debug for TransitionEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionEngine")
            .field("view", &self.view)
            .field("running", &self.running.as_ref().map(|r| r.active.kind()))
            .field("drill", &self.drill)
            .field("frame", &self.frame)
            .finish()
    }
}

impl<D: Clone + 'static> Default for TransitionEngine<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Clone + 'static> TransitionEngine<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            view: ViewState::default(),
            running: None,
            events: Vec::new(),
            drill: DrillSettings::default(),
            synced_version: u64::MAX,
            frame: 0,
        }
    }

    #[must_use]
    pub fn with_drill_settings(mut self, drill: DrillSettings) -> Self {
        self.drill = drill;
        self
    }

    pub fn set_drill_settings(&mut self, drill: DrillSettings) {
        self.drill = drill;
    }

    #[must_use]
    pub fn drill_settings(&self) -> DrillSettings {
        self.drill
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub(crate) fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// An operation is being executed.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    /// Events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Tell the scene about stack changes it has not seen yet.
    pub fn sync_scene<S: Scene>(&mut self, scene: &mut S, controller: &NavController<D>) {
        sync_scene(scene, controller, &mut self.synced_version);
    }

    /// React to a stack replaced outside the queue.
    ///
    /// While idle the visibility state belongs to no transition and is
    /// cleared; a running job keeps its own.
    pub fn apply_jump<S: Scene>(&mut self, scene: &mut S, controller: &NavController<D>) {
        sync_scene(scene, controller, &mut self.synced_version);
        if self.running.is_some() {
            return;
        }
        self.view.hidden_card = None;
        self.view.morphing = None;
        self.view.pending_crumb = None;
        if let Some(source) = self.view.hidden_source.take() {
            let target = Target::Card(source);
            scene.set_hidden(&target, false);
        }
        debug!(target: "springstack.engine", depth = controller.active_depth(), "jump applied");
    }

    /// Advance by one frame of `dt`.
    pub fn tick<S: Scene>(&mut self, dt: Duration, scene: &mut S, controller: &NavController<D>) {
        self.frame += 1;
        let mut dt = dt;
        loop {
            if self.running.is_none() {
                let Some(active) = controller.consume_next_operation() else {
                    break;
                };
                self.start(active, controller);
            }
            let Some(running) = self.running.as_mut() else {
                break;
            };
            let mut cx = Cx {
                scene: &mut *scene,
                controller,
                view: &mut self.view,
                timing: &running.timing,
                drill: self.drill,
                events: &mut self.events,
                synced_version: &mut self.synced_version,
                frame: self.frame,
                dt,
            };
            let poll = running.job.poll(&mut cx);
            dt = cx.dt;
            if poll.is_pending() {
                break;
            }
            if let Some(done) = self.running.take() {
                let (id, kind) = (done.active.id(), done.active.kind());
                self.events.push(EngineEvent::Finished {
                    id,
                    kind,
                    origin: done.origin,
                });
                debug!(target: "springstack.engine", id, op = %kind, frame = self.frame, "operation finished");
                done.active.resolve();
            }
        }
    }

    fn start(&mut self, active: ActiveOperation<D>, controller: &NavController<D>) {
        let origin = match active.operation() {
            Operation::DrillTo { origin, .. } => Some(*origin),
            _ => None,
        };
        let (id, kind) = (active.id(), active.kind());
        debug!(target: "springstack.engine", id, op = %kind, "operation started");
        self.events.push(EngineEvent::Started { id, kind, origin });
        self.running = Some(Running {
            job: Job::from_operation(active.operation()),
            active,
            origin,
            timing: controller.timing_config(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::headless::HeadlessScene;
    use crate::timing::TimingOverrides;

    const FRAME: Duration = Duration::from_millis(16);

    fn key(kind: &str, id: &str) -> NodeKey {
        NodeKey::new(kind, id)
    }

    fn scene() -> HeadlessScene {
        let mut scene = HeadlessScene::new(|k: &NodeKey| match k.id.as_str() {
            "root" => vec![key("folder", "a"), key("folder", "b")],
            "a" => vec![key("file", "x")],
            _ => Vec::new(),
        });
        scene.stack_committed(&[key("root", "root")]);
        scene
    }

    fn controller() -> NavController<()> {
        NavController::new(vec![Node::new("root", "root")]).unwrap()
    }

    fn run_until_idle(
        engine: &mut TransitionEngine<()>,
        scene: &mut HeadlessScene,
        controller: &NavController<()>,
    ) -> usize {
        let mut frames = 0;
        loop {
            scene.begin_frame(FRAME);
            engine.tick(FRAME, scene, controller);
            frames += 1;
            if !engine.is_busy() && controller.is_idle() {
                return frames;
            }
            assert!(frames < 10_000, "engine never went idle");
        }
    }

    #[test]
    fn should_hide_card_yields_to_an_active_to_list_morph() {
        let mut view = ViewState {
            hidden_card: Some(HiddenCard {
                key: key("folder", "a"),
                depth: 0,
            }),
            ..ViewState::default()
        };
        assert!(view.should_hide_card(&key("folder", "a")));
        assert!(!view.should_hide_card(&key("folder", "b")));
        view.morphing = Some(Morphing {
            key: key("folder", "a"),
            direction: MorphDirection::ToList,
        });
        assert!(view.should_hide_card(&key("folder", "a")));
        view.morph_active = true;
        assert!(!view.should_hide_card(&key("folder", "a")));
    }

    #[test]
    fn depth_is_read_from_the_track() {
        assert_eq!(depth_at(0.0, 400.0), 0);
        assert_eq!(depth_at(-790.0, 400.0), 2);
        assert_eq!(depth_at(30.0, 400.0), 0);
    }

    #[test]
    fn push_with_source_morphs_and_slides() {
        let mut scene = scene();
        let c = controller();
        let mut engine = TransitionEngine::new();
        let done = c.push(Node::new("folder", "a"), Some(key("folder", "a")));
        engine.tick(FRAME, &mut scene, &c);

        assert_eq!(c.stack_len(), 2);
        assert!(c.is_transitioning());
        assert_eq!(scene.live_ghosts(), 1);
        assert!(scene.is_hidden(&Target::Card(key("folder", "a"))));
        assert_eq!(engine.view().hidden_source, Some(key("folder", "a")));

        run_until_idle(&mut engine, &mut scene, &c);
        assert!(done.is_resolved());
        assert!(!c.is_transitioning());
        assert_eq!(c.active_depth(), 1);
        assert_eq!(engine.view().display_depth, 1);
        assert_eq!(scene.track_x(), -400.0);
        assert_eq!(scene.live_ghosts(), 0);
        assert_eq!(scene.max_live_ghosts(), 1);
        assert!(!scene.is_hidden(&Target::Card(key("folder", "a"))));
        assert_eq!(engine.view().pending_crumb, None);
        assert_eq!(engine.view().morphing, None);
        assert_eq!(
            engine.view().hidden_card,
            Some(HiddenCard {
                key: key("folder", "a"),
                depth: 0
            })
        );
    }

    #[test]
    fn pop_slides_then_morphs_and_unhides() {
        let mut scene = scene();
        let c = controller();
        let mut engine = TransitionEngine::new();
        c.push(Node::new("folder", "a"), Some(key("folder", "a")));
        run_until_idle(&mut engine, &mut scene, &c);

        let done = c.pop();
        engine.tick(FRAME, &mut scene, &c);
        assert_eq!(c.stack_len(), 1);
        assert_eq!(c.active_depth(), 0);
        assert!(engine.view().skip_auto_track);
        assert_eq!(scene.live_ghosts(), 1);

        run_until_idle(&mut engine, &mut scene, &c);
        assert!(done.is_resolved());
        assert_eq!(scene.track_x(), 0.0);
        assert_eq!(scene.live_ghosts(), 0);
        assert_eq!(engine.view().hidden_card, None);
        assert_eq!(engine.view().nav_direction, NavDirection::Back);
    }

    #[test]
    fn off_timing_settles_within_a_few_frames() {
        let mut scene = scene();
        let c = controller();
        c.set_timing_mode(crate::timing::TimingMode::Off);
        let mut engine = TransitionEngine::new();
        c.push(Node::new("folder", "a"), None);
        let frames = run_until_idle(&mut engine, &mut scene, &c);
        assert!(frames <= 3, "took {frames} frames");
        assert_eq!(c.active_depth(), 1);
    }

    #[test]
    fn drill_aborts_on_a_missing_card() {
        let mut scene = scene();
        let c = controller();
        c.set_timing_config(&TimingOverrides {
            beat_ms: Some(0),
            ..TimingOverrides::default()
        });
        let mut engine = TransitionEngine::new().with_drill_settings(DrillSettings {
            wait_for_card: Duration::from_millis(100),
            on_missing_card: MissingCardPolicy::Abort,
        });
        let done = c.drill_to(vec![
            Node::new("root", "root"),
            Node::new("folder", "a"),
            Node::new("file", "missing"),
        ]);
        run_until_idle(&mut engine, &mut scene, &c);
        assert!(done.is_resolved());
        assert_eq!(c.stack_len(), 2);
        assert!(!engine.view().deep_linking);
        assert!(
            engine
                .take_events()
                .contains(&EngineEvent::DrillAborted { at: key("file", "missing") })
        );
    }

    #[test]
    fn drill_push_policy_pushes_without_source() {
        let mut scene = scene();
        let c = controller();
        let mut engine = TransitionEngine::new().with_drill_settings(DrillSettings {
            wait_for_card: Duration::from_millis(50),
            on_missing_card: MissingCardPolicy::Push,
        });
        c.drill_to(vec![
            Node::new("root", "root"),
            Node::new("folder", "a"),
            Node::new("file", "missing"),
        ]);
        run_until_idle(&mut engine, &mut scene, &c);
        assert_eq!(c.stack_len(), 3);
        assert_eq!(c.active_depth(), 2);
        assert_eq!(scene.track_x(), -800.0);
    }

    #[test]
    fn detached_ghost_ends_the_morph_cleanly() {
        let mut scene = scene();
        let c = controller();
        let mut engine = TransitionEngine::new();
        c.push(Node::new("folder", "a"), Some(key("folder", "a")));
        engine.tick(FRAME, &mut scene, &c);
        scene.detach_ghosts();
        run_until_idle(&mut engine, &mut scene, &c);
        assert_eq!(scene.live_ghosts(), 0);
        assert_eq!(engine.view().pending_crumb, None);
        assert!(!engine.view().morph_active);
        assert_eq!(c.stack_len(), 2);
    }
}
