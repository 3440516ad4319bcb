#![forbid(unsafe_code)]

//! Springstack
//!
//! A drill-down navigation stack with animated handoff between panels.
//!
//! # Key Components
//!
//! - [`NavController`] - Stack, active depth, and the serialized operation queue
//! - [`TransitionEngine`] - Frame-driven push/pop/pop-to/drill-to state machines
//! - [`Scene`] - Render-layer contract the engine measures and mutates
//! - [`RoutingAdapter`] - Keeps the stack and a [`History`] location in sync
//! - [`NodeTypeRegistry`] - Kind-keyed icons, detail lines, and renderers
//! - [`Springstack`] - The component tying the pieces together
//!
//! # How it fits together
//! Callers enqueue operations on the controller and get a [`Completion`]
//! back. Each [`Springstack::tick`] advances the engine by one frame: the
//! engine pulls at most one operation at a time, commits the stack at a
//! single point, animates the ghost and the track through the scene, and
//! resolves the completion. The routing adapter watches the stack version
//! to write locations and turns location changes into queued drills.

pub mod animation;
pub mod completion;
#[cfg(feature = "config")]
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod node;
pub mod observable;
pub mod registry;
pub mod render;
pub mod routing;
pub mod scene;
pub mod springstack;
pub mod timing;

pub use animation::{Animation, Ease, EaseDirection, Timeline, Tween};
pub use completion::Completion;
#[cfg(feature = "config")]
pub use config::SpringstackConfig;
pub use controller::{ActiveOperation, DrillOrigin, NavController, Operation, OperationKind, QueueStats};
pub use engine::{
    DrillSettings, EngineEvent, HiddenCard, MorphDirection, Morphing, NavDirection, TransitionEngine,
    ViewState,
};
pub use error::{BuildError, ConfigError, EaseError};
pub use geometry::{Insets, Offset, Rect};
pub use node::{Node, NodeKey, NodeSlots};
pub use observable::{Observable, Subscription};
pub use registry::{
    ContentView, DetailLine, FileInfo, FileTypeContent, FileTypeContentProps, GenericContent, Link,
    NodeTypeDefinition, NodeTypeRegistry, ResolvedNodeType, Summary,
};
pub use render::{
    CardProps, CrumbView, Frame, OverlayPlacement, OverlayView, Panel, PanelProps, PanelView, RenderProps,
    Renderers, Slot, SlotMap,
};
pub use routing::{
    History, Location, MemoryHistory, MissingCardPolicy, RouteInitGuard, RoutingAdapter,
    RoutingConfig, UpdateMode, default_parse, default_serialize, slugify,
};
pub use scene::{GhostFrame, GhostId, GhostSpec, Part, Scene, Snapshot, Target};
pub use scene::headless::HeadlessScene;
pub use springstack::{EnterAnimationConfig, Helpers, Springstack, SpringstackBuilder, TickReport};
pub use timing::{TimingConfig, TimingMode, TimingOverrides, resolve_timing_config};
