#![forbid(unsafe_code)]

//! The render-layer contract.
//!
//! The transition engine never touches a widget tree directly. Everything it
//! needs from the presentation layer (measuring cards and crumbs, hiding
//! them, driving the ghost overlay, moving the panel track) goes through
//! [`Scene`]. A DOM binding implements it against real elements located by
//! the attribute names below; [`headless::HeadlessScene`] implements it with
//! a deterministic layout for tests and the demo.
//!
//! # Invariants
//!
//! 1. Flags set with [`Scene::set_hidden`] and [`Scene::set_opacity`] persist
//!    until changed again; the scene never clears them on its own.
//! 2. A ghost lives from [`Scene::mount_ghost`] until [`Scene::remove_ghost`].
//! 3. Geometry is reported in viewport coordinates.
//!
//! # Failure Modes
//!
//! - A target that is not (or no longer) laid out yields `None` from
//!   [`Scene::snapshot`]; callers poll again on a later frame.
//! - [`Scene::place_ghost`] returns `false` when the ghost was detached
//!   underneath the engine; the running morph ends early.

pub mod headless;

use std::fmt;
use std::time::Duration;

use crate::geometry::{Insets, Offset, Rect};
use crate::node::NodeKey;

/// Marks a list entry's outer element.
pub const ATTR_ITEM_CARD: &str = "data-item-card";
/// Kind of the node a list entry represents.
pub const ATTR_ITEM_TYPE: &str = "data-item-type";
/// Id of the node a list entry represents.
pub const ATTR_ITEM_ID: &str = "data-item-id";
/// The visual shell of a card; ghosts copy this element.
pub const ATTR_CARD_SHELL: &str = "data-card-shell";
/// The content inside a card shell.
pub const ATTR_CARD_CONTENT: &str = "data-card-content";
/// `kind:id` of the node a breadcrumb represents.
pub const ATTR_CRUMB_TARGET: &str = "data-crumb-target";
/// Key of the node a panel shows.
pub const ATTR_PANEL_KEY: &str = "data-panel-key";
/// Default selector for items staggered in by the enter animation.
pub const ENTER_ITEM_SELECTOR: &str = "[data-enter-item]";

/// Something the engine can measure or hide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// The list card of a node, inside its parent's panel.
    Card(NodeKey),
    /// The breadcrumb of a node.
    Crumb(NodeKey),
}

impl Target {
    #[must_use]
    pub fn key(&self) -> &NodeKey {
        match self {
            Self::Card(key) | Self::Crumb(key) => key,
        }
    }

    /// Attribute selector a DOM binding would use to find this target.
    #[must_use]
    pub fn selector(&self) -> String {
        match self {
            Self::Card(key) => format!(
                "[{ATTR_ITEM_CARD}][{ATTR_ITEM_TYPE}=\"{}\"][{ATTR_ITEM_ID}=\"{}\"]",
                key.kind, key.id
            ),
            Self::Crumb(key) => format!("[{ATTR_CRUMB_TARGET}=\"{key}\"]"),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card(key) => write!(f, "card({key})"),
            Self::Crumb(key) => write!(f, "crumb({key})"),
        }
    }
}

/// Part of a card or crumb whose opacity can be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    Shell,
    Content,
}

/// Measured geometry of a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Bounds of the outer element.
    pub outer: Rect,
    /// Bounds of the visual shell.
    pub shell: Rect,
    /// Padding inside the shell.
    pub padding: Insets,
    /// Whether the shell carries a content element.
    pub has_content: bool,
}

impl Snapshot {
    /// Where the shell's content box starts.
    #[must_use]
    pub fn content_origin(&self) -> (f64, f64) {
        self.shell.content_origin(self.padding)
    }
}

/// Handle to a mounted ghost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GhostId(pub u64);

/// What a ghost is cloned from and where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct GhostSpec {
    pub source: Target,
    /// Fixed-position bounds at mount time.
    pub origin: Rect,
    pub padding: Insets,
    pub has_content: bool,
}

/// Per-frame placement of a ghost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostFrame {
    /// Translation from the ghost's origin.
    pub offset: Offset,
    pub opacity: f64,
    pub content_opacity: f64,
    /// Ghost drawn in the muted list style (to-list morphs).
    pub muted: bool,
}

impl GhostFrame {
    /// Untranslated, fully opaque.
    #[must_use]
    pub fn at_origin(muted: bool) -> Self {
        Self {
            offset: Offset::ZERO,
            opacity: 1.0,
            content_opacity: 1.0,
            muted,
        }
    }
}

/// Operations the engine and layout helpers need from the presentation
/// layer.
pub trait Scene {
    /// Called once at the start of every frame.
    fn begin_frame(&mut self, _dt: Duration) {}

    /// Measure `target`, or `None` when it is not laid out.
    fn snapshot(&self, target: &Target) -> Option<Snapshot>;

    /// Persistently hide or show `target` (visibility, layout kept).
    fn set_hidden(&mut self, target: &Target, hidden: bool);

    /// Override the opacity of one part of `target`; `None` clears it.
    fn set_opacity(&mut self, target: &Target, part: Part, opacity: Option<f64>);

    fn mount_ghost(&mut self, spec: GhostSpec) -> GhostId;

    /// Position the ghost; `false` when it is no longer attached.
    fn place_ghost(&mut self, id: GhostId, frame: GhostFrame) -> bool;

    fn remove_ghost(&mut self, id: GhostId);

    fn viewport_width(&self) -> f64;

    fn viewport_height(&self) -> f64;

    /// Horizontal offset of the panel track.
    fn track_x(&self) -> f64;

    fn set_track_x(&mut self, x: f64);

    /// The stack changed; re-render panels and crumbs for `keys`.
    fn stack_committed(&mut self, keys: &[NodeKey]);

    /// Natural height of the breadcrumb row.
    fn crumb_row_height(&self) -> f64;

    /// Height of the wrapper clipping the breadcrumb row.
    fn set_crumb_wrapper_height(&mut self, height: f64);

    /// Number of items in `panel` matching `selector`.
    fn enter_item_count(&self, panel: &NodeKey, selector: &str) -> usize;

    /// Position one enter item of `panel`.
    fn place_enter_item(&mut self, panel: &NodeKey, index: usize, y: f64, opacity: f64);
}
