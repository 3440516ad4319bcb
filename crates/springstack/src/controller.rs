#![forbid(unsafe_code)]

//! Navigation stack controller: the stack, the active depth, and a FIFO of
//! pending operations.
//!
//! [`NavController`] is a cheap handle over shared single-threaded state.
//! Navigation calls never mutate the stack directly; they enqueue an
//! [`Operation`] and hand back a [`Completion`]. The transition engine pulls
//! one operation at a time with [`NavController::consume_next_operation`]
//! and commits the stack at a single point of its state machine.
//!
//! # Invariants
//!
//! 1. At most one operation is in flight. `consume_next_operation` returns
//!    `None` until the current [`ActiveOperation`] is resolved or dropped.
//! 2. Operations start in enqueue order.
//! 3. Every completion handed out resolves exactly once, including those of
//!    coalesced drills (they share the original operation's completion).
//! 4. The stack is never empty; `set_stack(vec![])` is ignored.
//! 5. `active_depth <= stack.len() - 1` after every mutation.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `pop()` at the root while idle | Resolved completion, nothing queued |
//! | `pop_to(i)` with `i >= len - 1` while idle | Resolved completion, nothing queued |
//! | Duplicate `drill_to(path)` | Existing completion returned, `coalesced` bumped |
//! | `ActiveOperation` dropped unresolved | Resolved on drop, queue keeps moving |

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};
use web_time::Instant;

use crate::completion::{Completer, Completion};
use crate::error::BuildError;
use crate::node::{Node, NodeKey, describe_path, path_keys, same_stack};
use crate::observable::{Observable, Subscription};
use crate::timing::{TimingConfig, TimingMode, TimingOverrides, resolve_timing_config};

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Who asked for a drill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillOrigin {
    /// Application code or a helper.
    User,
    /// The routing adapter applying a location.
    Route,
}

/// A queued navigation request.
#[derive(Debug, Clone)]
pub enum Operation<D> {
    /// Append `node`; `source` names the card the ghost morphs from.
    Push {
        node: Node<D>,
        source: Option<NodeKey>,
    },
    Pop,
    /// Pop until the stack length is `index + 1`.
    PopTo { index: usize },
    /// Reach `path` from its first node, pushing one level at a time.
    DrillTo {
        path: Vec<Node<D>>,
        origin: DrillOrigin,
    },
}

/// Discriminant of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Push,
    Pop,
    PopTo,
    DrillTo,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pop => "pop",
            Self::PopTo => "popTo",
            Self::DrillTo => "drillTo",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<D> Operation<D> {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Push { .. } => OperationKind::Push,
            Self::Pop => OperationKind::Pop,
            Self::PopTo { .. } => OperationKind::PopTo,
            Self::DrillTo { .. } => OperationKind::DrillTo,
        }
    }

    fn drill_path(&self) -> Option<&[Node<D>]> {
        match self {
            Self::DrillTo { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Operations accepted into the queue.
    pub enqueued: u64,
    /// Operations handed to the engine.
    pub consumed: u64,
    /// Operations whose completion fired.
    pub resolved: u64,
    /// Duplicate drills folded into an existing operation.
    pub coalesced: u64,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct QueuedOperation<D> {
    id: u64,
    created_at: Instant,
    op: Operation<D>,
    completion: Completion,
    completer: Completer,
}

struct InFlight {
    id: u64,
    kind: OperationKind,
    drill_path: Option<Vec<NodeKey>>,
    completion: Completion,
}

struct ControllerState<D> {
    active_depth: usize,
    transitioning: bool,
    timing_mode: TimingMode,
    overrides: TimingOverrides,
    timing: TimingConfig,
    queue: VecDeque<QueuedOperation<D>>,
    in_flight: Option<InFlight>,
    next_id: u64,
    queue_tick: u64,
    stats: QueueStats,
    jump_pending: bool,
}

impl<D> ControllerState<D> {
    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_none()
    }

    fn refresh_timing(&mut self) {
        self.timing = resolve_timing_config(self.timing_mode, Some(&self.overrides));
    }
}

/// Shared handle to the navigation stack and its operation queue.
///
/// Cloning yields another handle to the same controller.
pub struct NavController<D> {
    stack: Observable<Vec<Node<D>>>,
    state: Rc<RefCell<ControllerState<D>>>,
}

impl<D> Clone for NavController<D> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            state: Rc::clone(&self.state),
        }
    }
}

impl<D> fmt::Debug for NavController<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("NavController")
            .field("active_depth", &state.active_depth)
            .field("transitioning", &state.transitioning)
            .field("queue_len", &state.queue.len())
            .field("in_flight", &state.in_flight.as_ref().map(|op| op.kind))
            .field("stats", &state.stats)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Construction and accessors
// ---------------------------------------------------------------------------

impl<D: Clone + 'static> NavController<D> {
    /// A controller showing `initial`, with the active depth on its last node.
    pub fn new(initial: Vec<Node<D>>) -> Result<Self, BuildError> {
        Self::with_timing(initial, TimingMode::Normal, TimingOverrides::default())
    }

    /// Like [`new`](Self::new) with an explicit timing mode and overrides.
    pub fn with_timing(
        initial: Vec<Node<D>>,
        timing_mode: TimingMode,
        overrides: TimingOverrides,
    ) -> Result<Self, BuildError> {
        if initial.is_empty() {
            return Err(BuildError::EmptyInitialStack);
        }
        let active_depth = initial.len() - 1;
        let timing = resolve_timing_config(timing_mode, Some(&overrides));
        Ok(Self {
            stack: Observable::with_equality(initial, same_stack),
            state: Rc::new(RefCell::new(ControllerState {
                active_depth,
                transitioning: false,
                timing_mode,
                overrides,
                timing,
                queue: VecDeque::new(),
                in_flight: None,
                next_id: 1,
                queue_tick: 0,
                stats: QueueStats::default(),
                jump_pending: false,
            })),
        })
    }

    /// Clone of the current stack.
    #[must_use]
    pub fn stack(&self) -> Vec<Node<D>> {
        self.stack.get()
    }

    /// Borrow the current stack.
    pub fn with_stack<R>(&self, f: impl FnOnce(&[Node<D>]) -> R) -> R {
        self.stack.with(|s| f(s))
    }

    #[must_use]
    pub fn stack_len(&self) -> usize {
        self.stack.with(Vec::len)
    }

    /// Bumps once per committed stack change.
    #[must_use]
    pub fn stack_version(&self) -> u64 {
        self.stack.version()
    }

    /// Call `callback` with the new stack after every change.
    pub fn subscribe(&self, callback: impl Fn(&Vec<Node<D>>) + 'static) -> Subscription {
        self.stack.subscribe(callback)
    }

    #[must_use]
    pub fn active_depth(&self) -> usize {
        self.state.borrow().active_depth
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.state.borrow().transitioning
    }

    /// Operations waiting to start (the in-flight one excluded).
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Bumps each time an operation resolves.
    #[must_use]
    pub fn queue_tick(&self) -> u64 {
        self.state.borrow().queue_tick
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.state.borrow().stats
    }

    /// Nothing queued and nothing in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state.borrow().is_idle()
    }

    /// Kind of the operation currently held by the engine.
    #[must_use]
    pub fn in_flight(&self) -> Option<OperationKind> {
        self.state.borrow().in_flight.as_ref().map(|op| op.kind)
    }

    /// True while a drill is queued or running.
    #[must_use]
    pub fn drill_pending(&self) -> bool {
        let state = self.state.borrow();
        state
            .in_flight
            .as_ref()
            .is_some_and(|op| op.kind == OperationKind::DrillTo)
            || state
                .queue
                .iter()
                .any(|q| q.op.kind() == OperationKind::DrillTo)
    }

    // -----------------------------------------------------------------------
    // Timing
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn timing_mode(&self) -> TimingMode {
        self.state.borrow().timing_mode
    }

    /// Effective configuration: the mode's preset with overrides applied.
    #[must_use]
    pub fn timing_config(&self) -> TimingConfig {
        self.state.borrow().timing.clone()
    }

    pub fn set_timing_mode(&self, mode: TimingMode) {
        let mut state = self.state.borrow_mut();
        if state.timing_mode != mode {
            debug!(target: "springstack.queue", from = %state.timing_mode, to = %mode, "timing mode changed");
            state.timing_mode = mode;
            state.refresh_timing();
        }
    }

    /// Merge `overrides` over the current ones.
    pub fn set_timing_config(&self, overrides: &TimingOverrides) {
        let mut state = self.state.borrow_mut();
        state.overrides = state.overrides.merged(overrides);
        state.refresh_timing();
    }
}

// ---------------------------------------------------------------------------
// Enqueue
// ---------------------------------------------------------------------------

impl<D: Clone + 'static> NavController<D> {
    /// Queue a push of `node`, morphing from the card `source` if given.
    pub fn push(&self, node: Node<D>, source: Option<NodeKey>) -> Completion {
        self.enqueue(Operation::Push { node, source })
    }

    /// Queue a pop. Resolves at once when idle at the root.
    pub fn pop(&self) -> Completion {
        if self.is_idle() && self.stack_len() <= 1 {
            debug!(target: "springstack.queue", op = "pop", reason = "at-root", "operation skipped");
            return Completion::resolved();
        }
        self.enqueue(Operation::Pop)
    }

    /// Queue pops down to `index`. Resolves at once when idle and there is
    /// nothing above `index`.
    pub fn pop_to(&self, index: usize) -> Completion {
        if self.is_idle() && index >= self.stack_len().saturating_sub(1) {
            debug!(target: "springstack.queue", op = "popTo", index, reason = "nothing-above", "operation skipped");
            return Completion::resolved();
        }
        self.enqueue(Operation::PopTo { index })
    }

    /// Queue a drill to `path`.
    ///
    /// When the same `(kind, id)` path is already queued or running, nothing
    /// is queued and the returned completion is the existing operation's.
    pub fn drill_to(&self, path: Vec<Node<D>>) -> Completion {
        self.enqueue_drill(path, DrillOrigin::User)
    }

    pub(crate) fn drill_to_route(&self, path: Vec<Node<D>>) -> Completion {
        self.enqueue_drill(path, DrillOrigin::Route)
    }

    fn enqueue_drill(&self, path: Vec<Node<D>>, origin: DrillOrigin) -> Completion {
        let keys = path_keys(&path);
        {
            let mut state = self.state.borrow_mut();
            let queued = state.queue.iter().find_map(|q| {
                q.op.drill_path()
                    .filter(|p| path_keys(*p) == keys)
                    .map(|_| q.completion.clone())
            });
            let (existing, reason) = match queued {
                Some(c) => (Some(c), "queued-duplicate"),
                None => (
                    state
                        .in_flight
                        .as_ref()
                        .filter(|op| op.drill_path.as_ref() == Some(&keys))
                        .map(|op| op.completion.clone()),
                    "active-duplicate",
                ),
            };
            if let Some(completion) = existing {
                state.stats.coalesced += 1;
                debug!(
                    target: "springstack.queue",
                    op = "drillTo",
                    reason,
                    path = %describe_path(&path),
                    "operation skipped"
                );
                return completion;
            }
        }
        self.enqueue(Operation::DrillTo { path, origin })
    }

    fn enqueue(&self, op: Operation<D>) -> Completion {
        let (completion, completer) = Completion::pair();
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.stats.enqueued += 1;
        debug!(
            target: "springstack.queue",
            id,
            op = %op.kind(),
            queue_len = state.queue.len() + 1,
            "operation enqueued"
        );
        state.queue.push_back(QueuedOperation {
            id,
            created_at: Instant::now(),
            op,
            completion: completion.clone(),
            completer,
        });
        completion
    }

    /// Replace the stack immediately, outside the queue.
    ///
    /// The active depth moves to the new top unless a transition or a drill
    /// is running, in which case it is only clamped. The change is flagged
    /// as a jump for the engine and the routing adapter.
    pub fn set_stack(&self, next: Vec<Node<D>>) {
        if next.is_empty() {
            warn!(target: "springstack.queue", "set_stack with an empty stack ignored");
            return;
        }
        let len = next.len();
        {
            let mut state = self.state.borrow_mut();
            let drilling = state
                .in_flight
                .as_ref()
                .is_some_and(|op| op.kind == OperationKind::DrillTo);
            state.active_depth = if state.transitioning || drilling {
                state.active_depth.min(len - 1)
            } else {
                len - 1
            };
            state.jump_pending = true;
        }
        debug!(target: "springstack.queue", path = %describe_path(&next), "stack replaced");
        self.stack.set(next);
    }
}

// ---------------------------------------------------------------------------
// Engine-facing API
// ---------------------------------------------------------------------------

impl<D: Clone + 'static> NavController<D> {
    /// Take the next queued operation, unless one is already in flight.
    #[must_use]
    pub fn consume_next_operation(&self) -> Option<ActiveOperation<D>> {
        let mut state = self.state.borrow_mut();
        if state.in_flight.is_some() {
            return None;
        }
        let queued = state.queue.pop_front()?;
        let kind = queued.op.kind();
        state.stats.consumed += 1;
        state.in_flight = Some(InFlight {
            id: queued.id,
            kind,
            drill_path: queued.op.drill_path().map(path_keys),
            completion: queued.completion,
        });
        let age_ms = u64::try_from(queued.created_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            target: "springstack.queue",
            id = queued.id,
            op = %kind,
            age_ms,
            remaining = state.queue.len(),
            "operation consumed"
        );
        Some(ActiveOperation {
            id: queued.id,
            op: queued.op,
            completer: Some(queued.completer),
            state: Rc::clone(&self.state),
        })
    }

    /// Commit a stack produced by the engine. Not a jump.
    pub fn commit_stack(&self, next: Vec<Node<D>>) -> bool {
        if next.is_empty() {
            warn!(target: "springstack.queue", "empty commit ignored");
            return false;
        }
        let len = next.len();
        {
            let mut state = self.state.borrow_mut();
            state.active_depth = state.active_depth.min(len - 1);
        }
        trace!(target: "springstack.queue", path = %describe_path(&next), "stack committed");
        self.stack.set(next)
    }

    /// Set the active depth, clamped to the stack.
    pub fn set_active_depth(&self, depth: usize) {
        let max = self.stack_len().saturating_sub(1);
        self.state.borrow_mut().active_depth = depth.min(max);
    }

    pub fn set_transitioning(&self, transitioning: bool) {
        self.state.borrow_mut().transitioning = transitioning;
    }

    /// Whether `set_stack` ran since the last call; clears the flag.
    pub fn take_jump(&self) -> bool {
        std::mem::take(&mut self.state.borrow_mut().jump_pending)
    }
}

// ---------------------------------------------------------------------------
// ActiveOperation
// ---------------------------------------------------------------------------

/// The operation the engine is executing.
///
/// Resolving (or dropping) it fires the caller's completion, frees the
/// in-flight slot and bumps the queue tick.
pub struct ActiveOperation<D> {
    id: u64,
    op: Operation<D>,
    completer: Option<Completer>,
    state: Rc<RefCell<ControllerState<D>>>,
}

impl<D> fmt::Debug for ActiveOperation<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveOperation")
            .field("id", &self.id)
            .field("kind", &self.op.kind())
            .finish_non_exhaustive()
    }
}

impl<D> ActiveOperation<D> {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.op.kind()
    }

    #[must_use]
    pub fn operation(&self) -> &Operation<D> {
        &self.op
    }

    /// Complete the operation.
    pub fn resolve(self) {
        drop(self);
    }

    fn finish(&mut self) {
        let Some(completer) = self.completer.take() else {
            return;
        };
        {
            let mut state = self.state.borrow_mut();
            if state.in_flight.as_ref().is_some_and(|op| op.id == self.id) {
                state.in_flight = None;
            }
            state.queue_tick += 1;
            state.stats.resolved += 1;
            debug!(
                target: "springstack.queue",
                id = self.id,
                op = %self.op.kind(),
                tick = state.queue_tick,
                "operation resolved"
            );
        }
        completer.resolve();
    }
}

impl<D> Drop for ActiveOperation<D> {
    fn drop(&mut self) {
        self.finish();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
