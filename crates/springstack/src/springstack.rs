#![forbid(unsafe_code)]

//! The Springstack component.
//!
//! [`Springstack`] owns a [`Scene`] and wires the controller, the transition
//! engine, the layout followers, the enter animation and (optionally) the
//! routing adapter into one frame loop. Drive it with [`Springstack::tick`];
//! read it with [`Springstack::render`].
//!
//! # Frame order
//!
//! 1. The scene starts the frame.
//! 2. A stack replaced with `set_stack` since the last frame is applied as a
//!    jump.
//! 3. The engine advances the running operation (or starts the next one).
//! 4. The routing adapter sees the engine's events, then the stack.
//! 5. The track follower and the breadcrumb row tween run.
//! 6. Panel-ready requests start enter animations; running ones advance.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut stack = Springstack::builder(vec![Node::new("root", "root")])
//!     .timing_mode(TimingMode::Reduced)
//!     .build(HeadlessScene::new(catalog))?;
//! let done = stack.push(Node::new("folder", "a"), Some(NodeKey::new("folder", "a")));
//! while !done.is_resolved() {
//!     stack.tick(Duration::from_millis(16));
//! }
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::animation::{Animation, Ease, Tween, stagger_offsets};
use crate::completion::Completion;
use crate::controller::NavController;
use crate::engine::{DrillSettings, EngineEvent, NavDirection, TransitionEngine, ViewState};
use crate::error::BuildError;
use crate::layout::{CrumbRowTween, TrackFollower};
use crate::node::{Node, NodeKey};
use crate::observable::Subscription;
use crate::render::{CardProps, Frame, PanelProps, RenderProps, Renderers, card_test_id};
use crate::routing::{History, MemoryHistory, RouteInitGuard, RoutingAdapter, RoutingConfig};
use crate::scene::{ENTER_ITEM_SELECTOR, Scene};
use crate::timing::{TimingConfig, TimingMode, TimingOverrides};

// ---------------------------------------------------------------------------
// Enter animation
// ---------------------------------------------------------------------------

/// Staggered entry of a panel's items after forward navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnterAnimationConfig {
    /// Selector for the items to animate.
    pub selector: String,
    pub duration_ms: u64,
    /// Delay between consecutive items.
    pub stagger_ms: u64,
}

impl Default for EnterAnimationConfig {
    fn default() -> Self {
        Self {
            selector: ENTER_ITEM_SELECTOR.to_owned(),
            duration_ms: 500,
            stagger_ms: 40,
        }
    }
}

#[derive(Debug)]
struct EnterItem {
    delay: Duration,
    tween: Tween,
}

#[derive(Debug)]
struct EnterRun {
    panel: NodeKey,
    from_y: f64,
    items: Vec<EnterItem>,
}

impl EnterRun {
    fn new(panel: NodeKey, count: usize, from_y: f64, config: &EnterAnimationConfig, ease: &Ease) -> Self {
        let duration = Duration::from_millis(config.duration_ms);
        let items = stagger_offsets(count, Duration::from_millis(config.stagger_ms))
            .into_iter()
            .map(|delay| EnterItem {
                delay,
                tween: Tween::progress(duration, ease.clone()),
            })
            .collect();
        Self {
            panel,
            from_y,
            items,
        }
    }

    fn place(&self, scene: &mut dyn Scene) {
        for (index, item) in self.items.iter().enumerate() {
            let p = item.tween.current();
            scene.place_enter_item(&self.panel, index, self.from_y * (1.0 - p), p);
        }
    }

    /// Advance by `dt`; `true` once every item has arrived.
    fn tick(&mut self, dt: Duration, scene: &mut dyn Scene) -> bool {
        for item in &mut self.items {
            let waited = item.delay.min(dt);
            item.delay -= waited;
            if item.delay.is_zero() {
                item.tween.tick(dt - waited);
            }
        }
        self.place(scene);
        self.items.iter().all(|item| item.tween.is_complete())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Snapshot of the component handed to render callbacks, with the
/// operations they may trigger.
pub struct Helpers<D> {
    controller: NavController<D>,
    stack: Vec<Node<D>>,
    active_depth: usize,
    transitioning: bool,
    view: ViewState,
    ready: Rc<RefCell<Vec<NodeKey>>>,
}

impl<D: Clone> Clone for Helpers<D> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            stack: self.stack.clone(),
            active_depth: self.active_depth,
            transitioning: self.transitioning,
            view: self.view.clone(),
            ready: Rc::clone(&self.ready),
        }
    }
}

impl<D> fmt::Debug for Helpers<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Helpers")
            .field("depth", &self.stack.len())
            .field("active_depth", &self.active_depth)
            .field("transitioning", &self.transitioning)
            .finish_non_exhaustive()
    }
}

impl<D: Clone + 'static> Helpers<D> {
    #[must_use]
    pub fn stack(&self) -> &[Node<D>] {
        &self.stack
    }

    #[must_use]
    pub fn active_depth(&self) -> usize {
        self.active_depth
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn push(&self, node: Node<D>, source: Option<NodeKey>) -> Completion {
        self.controller.push(node, source)
    }

    pub fn pop(&self) -> Completion {
        self.controller.pop()
    }

    pub fn pop_to(&self, index: usize) -> Completion {
        self.controller.pop_to(index)
    }

    pub fn drill_to(&self, path: Vec<Node<D>>) -> Completion {
        self.controller.drill_to(path)
    }

    pub fn set_stack(&self, next: Vec<Node<D>>) {
        self.controller.set_stack(next);
    }

    /// Push `node` with its own list card as the morph source.
    pub fn select(&self, node: &Node<D>) -> Completion {
        self.controller.push(node.clone(), Some(node.key()))
    }

    #[must_use]
    pub fn card_props(&self, node: &Node<D>) -> CardProps {
        card_props(&self.view, node)
    }

    #[must_use]
    pub fn panel_props(&self, key: &NodeKey) -> PanelProps {
        PanelProps { key: key.clone() }
    }

    /// Ask for the enter animation of `panel` on the next frame.
    pub fn notify_panel_ready(&self, panel: &NodeKey) {
        self.ready.borrow_mut().push(panel.clone());
    }
}

fn card_props<D>(view: &ViewState, node: &Node<D>) -> CardProps {
    let key = node.key();
    CardProps {
        test_id: card_test_id(&key),
        hidden: view.should_hide_card(&key),
        key,
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

type StackListener<D> = Rc<dyn Fn(&[Node<D>])>;

/// Builder for [`Springstack`].
#[must_use]
pub struct SpringstackBuilder<D, H = MemoryHistory> {
    initial: Vec<Node<D>>,
    timing_mode: TimingMode,
    timing: TimingOverrides,
    enter: EnterAnimationConfig,
    drill: DrillSettings,
    routing: Option<(RoutingConfig<D>, H, RouteInitGuard)>,
    listeners: Vec<StackListener<D>>,
}

impl<D, H> fmt::Debug for SpringstackBuilder<D, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpringstackBuilder")
            .field("initial_len", &self.initial.len())
            .field("timing_mode", &self.timing_mode)
            .field("enter", &self.enter)
            .field("routing", &self.routing.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<D: Clone + 'static, H: History> SpringstackBuilder<D, H> {
    pub fn timing_mode(mut self, mode: TimingMode) -> Self {
        self.timing_mode = mode;
        self
    }

    /// Overrides merged over the preset.
    pub fn timing_config(mut self, overrides: TimingOverrides) -> Self {
        self.timing = self.timing.merged(&overrides);
        self
    }

    pub fn enter_animation(mut self, enter: EnterAnimationConfig) -> Self {
        self.enter = enter;
        self
    }

    /// Called with the new stack after every change.
    pub fn on_stack_change(mut self, listener: impl Fn(&[Node<D>]) + 'static) -> Self {
        self.listeners.push(Rc::new(listener));
        self
    }

    /// How drills wait for cards. Routing sets these from its config; call
    /// this afterwards to override.
    pub fn drill_settings(mut self, drill: DrillSettings) -> Self {
        self.drill = drill;
        self
    }

    /// Sync the stack with `history`.
    pub fn routing<H2: History>(
        self,
        config: RoutingConfig<D>,
        history: H2,
        guard: RouteInitGuard,
    ) -> SpringstackBuilder<D, H2> {
        SpringstackBuilder {
            initial: self.initial,
            timing_mode: self.timing_mode,
            timing: self.timing,
            enter: self.enter,
            drill: DrillSettings {
                wait_for_card: Duration::from_millis(config.wait_for_card_ms),
                on_missing_card: config.on_missing_card,
            },
            routing: Some((config, history, guard)),
            listeners: self.listeners,
        }
    }

    /// Apply the timing and enter sections of a loaded configuration.
    #[cfg(feature = "config")]
    pub fn config(self, config: &crate::config::SpringstackConfig) -> Self {
        self.timing_mode(config.timing_mode)
            .timing_config(config.timing.clone())
            .enter_animation(config.enter.clone())
    }

    pub fn build<S: Scene>(self, scene: S) -> Result<Springstack<D, S, H>, BuildError> {
        let controller = NavController::with_timing(self.initial.clone(), self.timing_mode, self.timing)?;
        let subscriptions = self
            .listeners
            .into_iter()
            .map(|listener| controller.subscribe(move |stack: &Vec<Node<D>>| listener(stack)))
            .collect();

        let engine = TransitionEngine::new().with_drill_settings(self.drill);
        let routing = self
            .routing
            .map(|(config, history, guard)| RoutingAdapter::new(config, history, guard, self.initial.clone()));

        let mut stack = Springstack {
            controller,
            engine,
            scene,
            routing,
            follower: TrackFollower::new(),
            crumb_row: CrumbRowTween::new(),
            enter: self.enter,
            enter_runs: Vec::new(),
            attached: AHashSet::new(),
            ready: Rc::new(RefCell::new(Vec::new())),
            frame: 0,
            seen_version: 0,
            _subscriptions: subscriptions,
        };
        stack.mount();
        Ok(stack)
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// What a frame did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub frame: u64,
    pub events: Vec<EngineEvent>,
    /// The stack differs from the previous frame.
    pub stack_changed: bool,
    /// No operation running or queued.
    pub idle: bool,
}

/// A drill-down navigation stack rendered through a [`Scene`].
pub struct Springstack<D, S, H = MemoryHistory> {
    controller: NavController<D>,
    engine: TransitionEngine<D>,
    scene: S,
    routing: Option<RoutingAdapter<D, H>>,
    follower: TrackFollower,
    crumb_row: CrumbRowTween,
    enter: EnterAnimationConfig,
    enter_runs: Vec<EnterRun>,
    attached: AHashSet<NodeKey>,
    ready: Rc<RefCell<Vec<NodeKey>>>,
    frame: u64,
    seen_version: u64,
    _subscriptions: Vec<Subscription>,
}

impl<D, S: fmt::Debug, H: fmt::Debug> fmt::Debug for Springstack<D, S, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Springstack")
            .field("controller", &self.controller)
            .field("engine", &self.engine)
            .field("scene", &self.scene)
            .field("routing", &self.routing)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

impl<D: Clone + 'static> Springstack<D, (), MemoryHistory> {
    /// Start building a component showing `initial`.
    pub fn builder(initial: Vec<Node<D>>) -> SpringstackBuilder<D, MemoryHistory> {
        SpringstackBuilder {
            initial,
            timing_mode: TimingMode::Normal,
            timing: TimingOverrides::default(),
            enter: EnterAnimationConfig::default(),
            drill: DrillSettings::default(),
            routing: None,
            listeners: Vec::new(),
        }
    }

    /// Build from a loaded configuration, syncing with `history`.
    #[cfg(feature = "config")]
    pub fn from_config<S: Scene, H: History>(
        initial: Vec<Node<D>>,
        config: &crate::config::SpringstackConfig,
        scene: S,
        history: H,
        guard: RouteInitGuard,
    ) -> Result<Springstack<D, S, H>, BuildError> {
        Self::builder(initial)
            .config(config)
            .routing(config.routing.to_routing_config(), history, guard)
            .build(scene)
    }
}

impl<D: Clone + 'static, S: Scene, H: History> Springstack<D, S, H> {
    fn mount(&mut self) {
        self.engine.sync_scene(&mut self.scene, &self.controller);
        let depth = self.controller.active_depth();
        let width = self.scene.viewport_width();
        self.scene.set_track_x(-(depth as f64) * width);
        self.engine.view_mut().display_depth = depth;
        let timing = self.controller.timing_config();
        self.follower.tick(
            Duration::ZERO,
            &mut self.scene,
            self.engine.view_mut(),
            depth,
            false,
            &timing,
        );
        self.seen_version = self.controller.stack_version();
        if let Some(routing) = self.routing.as_mut() {
            routing.init(&self.controller);
        }
        debug!(target: "springstack.engine", depth, routing = self.routing.is_some(), "mounted");
    }

    /// Advance everything by one frame of `dt`.
    pub fn tick(&mut self, dt: Duration) -> TickReport {
        self.frame += 1;
        self.scene.begin_frame(dt);

        if self.controller.take_jump() {
            self.engine.apply_jump(&mut self.scene, &self.controller);
            if let Some(routing) = self.routing.as_mut() {
                routing.note_jump();
            }
        }

        self.engine.tick(dt, &mut self.scene, &self.controller);
        let events = self.engine.take_events();
        if let Some(routing) = self.routing.as_mut() {
            for event in &events {
                routing.on_engine_event(event, &self.controller);
            }
            routing.sync(&self.controller);
        }
        self.engine.sync_scene(&mut self.scene, &self.controller);

        let timing = self.controller.timing_config();
        self.follower.tick(
            dt,
            &mut self.scene,
            self.engine.view_mut(),
            self.controller.active_depth(),
            self.controller.is_transitioning(),
            &timing,
        );
        self.crumb_row.tick(dt, &mut self.scene, &timing);

        let requests = std::mem::take(&mut *self.ready.borrow_mut());
        for panel in requests {
            self.start_enter(&panel, &timing);
        }
        let scene = &mut self.scene;
        self.enter_runs.retain_mut(|run| !run.tick(dt, scene));

        let version = self.controller.stack_version();
        let stack_changed = version != self.seen_version;
        self.seen_version = version;
        TickReport {
            frame: self.frame,
            events,
            stack_changed,
            idle: self.is_idle(),
        }
    }

    /// Tick until idle or `max_frames` have run; the number of frames run.
    pub fn settle(&mut self, dt: Duration, max_frames: usize) -> usize {
        for frame in 1..=max_frames {
            if self.tick(dt).idle && self.enter_runs.is_empty() && !self.follower.is_animating() {
                return frame;
            }
        }
        max_frames
    }

    /// No operation running or queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.engine.is_busy() && self.controller.is_idle()
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    pub fn push(&self, node: Node<D>, source: Option<NodeKey>) -> Completion {
        self.controller.push(node, source)
    }

    pub fn pop(&self) -> Completion {
        self.controller.pop()
    }

    pub fn pop_to(&self, index: usize) -> Completion {
        self.controller.pop_to(index)
    }

    pub fn drill_to(&self, path: Vec<Node<D>>) -> Completion {
        self.controller.drill_to(path)
    }

    pub fn set_stack(&self, next: Vec<Node<D>>) {
        self.controller.set_stack(next);
    }

    pub fn set_timing_mode(&self, mode: TimingMode) {
        self.controller.set_timing_mode(mode);
    }

    pub fn set_timing_config(&self, overrides: &TimingOverrides) {
        self.controller.set_timing_config(overrides);
    }

    #[must_use]
    pub fn timing_config(&self) -> TimingConfig {
        self.controller.timing_config()
    }

    /// The location changed underneath (back, forward, fragment edit).
    pub fn handle_location_change(&mut self) {
        if let Some(routing) = self.routing.as_mut() {
            routing.handle_location_change(&self.controller);
        }
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn helpers(&self) -> Helpers<D> {
        Helpers {
            controller: self.controller.clone(),
            stack: self.controller.stack(),
            active_depth: self.controller.active_depth(),
            transitioning: self.controller.is_transitioning(),
            view: self.engine.view().clone(),
            ready: Rc::clone(&self.ready),
        }
    }

    #[must_use]
    pub fn card_props(&self, node: &Node<D>) -> CardProps {
        card_props(self.engine.view(), node)
    }

    #[must_use]
    pub fn panel_props(&self, key: &NodeKey) -> PanelProps {
        PanelProps { key: key.clone() }
    }

    /// Whether the list card of `node` is represented by its breadcrumb.
    #[must_use]
    pub fn should_hide_card(&self, node: &Node<D>) -> bool {
        self.engine.view().should_hide_card(&node.key())
    }

    /// Compose the current frame.
    pub fn render<V>(&self, renderers: &Renderers<D, V>, props: &RenderProps<D, V>) -> Frame<V> {
        Frame::compose(
            &self.helpers(),
            renderers,
            props,
            self.crumb_row.current(),
            self.scene.track_x(),
        )
    }

    // -----------------------------------------------------------------------
    // Panels
    // -----------------------------------------------------------------------

    /// A panel element for `key` is mounted.
    pub fn attach_panel(&mut self, key: NodeKey) {
        self.attached.insert(key);
    }

    pub fn detach_panel(&mut self, key: &NodeKey) {
        self.attached.remove(key);
        self.enter_runs.retain(|run| &run.panel != key);
    }

    /// Run the enter animation on `panel`'s items, if it is attached and the
    /// last navigation went forward.
    pub fn notify_panel_ready(&mut self, panel: &NodeKey) {
        let timing = self.controller.timing_config();
        self.start_enter(panel, &timing);
    }

    fn start_enter(&mut self, panel: &NodeKey, timing: &TimingConfig) {
        if !self.attached.contains(panel) {
            trace!(target: "springstack.layout", panel = %panel, "panel ready ignored; not attached");
            return;
        }
        if self.engine.view().nav_direction != NavDirection::Forward {
            return;
        }
        let count = self.scene.enter_item_count(panel, &self.enter.selector);
        if count == 0 {
            return;
        }
        debug!(target: "springstack.layout", panel = %panel, count, "enter animation");
        self.enter_runs.retain(|run| &run.panel != panel);
        let run = EnterRun::new(
            panel.clone(),
            count,
            self.scene.viewport_height(),
            &self.enter,
            &timing.enter_ease,
        );
        run.place(&mut self.scene);
        self.enter_runs.push(run);
    }

    /// Enter animations still running.
    #[must_use]
    pub fn entering_panels(&self) -> Vec<NodeKey> {
        self.enter_runs.iter().map(|run| run.panel.clone()).collect()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn controller(&self) -> &NavController<D> {
        &self.controller
    }

    #[must_use]
    pub fn stack(&self) -> Vec<Node<D>> {
        self.controller.stack()
    }

    #[must_use]
    pub fn view_state(&self) -> &ViewState {
        self.engine.view()
    }

    #[must_use]
    pub fn engine(&self) -> &TransitionEngine<D> {
        &self.engine
    }

    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    #[must_use]
    pub fn routing(&self) -> Option<&RoutingAdapter<D, H>> {
        self.routing.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> Option<&H> {
        self.routing.as_ref().map(RoutingAdapter::history)
    }

    pub fn history_mut(&mut self) -> Option<&mut H> {
        self.routing.as_mut().map(RoutingAdapter::history_mut)
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }
}
