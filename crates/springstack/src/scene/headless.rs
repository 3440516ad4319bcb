#![forbid(unsafe_code)]

//! Deterministic in-memory [`Scene`].
//!
//! Lays panels out side by side on a horizontal track and cards in a
//! single column inside each panel. Breadcrumbs wrap across rows above the
//! panels. Which cards a panel shows comes from a catalog closure, so tests
//! and the demo decide the content without a widget tree.
//!
//! Besides layout, the scene records what the engine did to it (hidden
//! flags, opacity overrides, ghost lifecycle, track writes) so tests can
//! assert on the choreography.
//!
//! # Failure injection
//!
//! - [`HeadlessScene::set_mount_latency`]: cards in a freshly committed
//!   panel appear only after the given number of frames.
//! - [`HeadlessScene::withhold_card`]: a card that never appears.
//! - [`HeadlessScene::remove_element`]: a target removed from layout.
//! - [`HeadlessScene::detach_ghosts`]: live ghosts report as orphaned.

use std::time::Duration;

use ahash::{AHashMap, AHashSet};
use tracing::trace;

use super::{GhostFrame, GhostId, GhostSpec, Part, Scene, Snapshot, Target};
use crate::geometry::{Insets, Rect};
use crate::node::NodeKey;

/// Breadcrumb geometry.
pub const CRUMB_WIDTH: f64 = 120.0;
pub const CRUMB_HEIGHT: f64 = 32.0;
pub const CRUMB_GAP: f64 = 8.0;
/// Padding around the breadcrumb row.
pub const CRUMB_ROW_PADDING: f64 = 8.0;
/// Card geometry.
pub const CARD_HEIGHT: f64 = 56.0;
pub const CARD_GAP: f64 = 8.0;
pub const PANEL_PADDING: f64 = 12.0;

const CRUMB_INSETS: Insets = Insets {
    top: 4.0,
    right: 8.0,
    bottom: 4.0,
    left: 8.0,
};
const CARD_INSETS: Insets = Insets {
    top: 12.0,
    right: 12.0,
    bottom: 12.0,
    left: 12.0,
};

type Catalog = Box<dyn Fn(&NodeKey) -> Vec<NodeKey>>;

/// Ghost lifecycle record.
#[derive(Debug, Clone, PartialEq)]
pub enum GhostEvent {
    Mounted { id: GhostId, source: Target },
    Removed { id: GhostId },
}

#[derive(Debug)]
struct Ghost {
    spec: GhostSpec,
    frame: GhostFrame,
    placements: usize,
    detached: bool,
}

#[derive(Debug, Clone)]
struct Panel {
    key: NodeKey,
    frames_until_mounted: u32,
}

/// Scene with a fixed, computed layout.
pub struct HeadlessScene {
    catalog: Catalog,
    width: f64,
    height: f64,
    track_x: f64,
    track_writes: usize,
    panels: Vec<Panel>,
    latency: AHashMap<NodeKey, u32>,
    withheld: AHashSet<NodeKey>,
    removed: AHashSet<Target>,
    hidden: AHashSet<Target>,
    opacity: AHashMap<(Target, Part), f64>,
    ghosts: AHashMap<GhostId, Ghost>,
    ghost_log: Vec<GhostEvent>,
    next_ghost: u64,
    max_live_ghosts: usize,
    crumb_wrapper_height: f64,
    enter_items: AHashMap<NodeKey, usize>,
    enter_placements: AHashMap<(NodeKey, usize), (f64, f64)>,
    frames: u64,
}

impl std::fmt::Debug for HeadlessScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessScene")
            .field("viewport", &(self.width, self.height))
            .field("track_x", &self.track_x)
            .field("panels", &self.panels.len())
            .field("live_ghosts", &self.ghosts.len())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl HeadlessScene {
    /// Default viewport size.
    pub const DEFAULT_VIEWPORT: (f64, f64) = (400.0, 600.0);

    /// A scene whose panel for node `k` lists the cards `catalog(k)`.
    #[must_use]
    pub fn new(catalog: impl Fn(&NodeKey) -> Vec<NodeKey> + 'static) -> Self {
        let (width, height) = Self::DEFAULT_VIEWPORT;
        Self {
            catalog: Box::new(catalog),
            width,
            height,
            track_x: 0.0,
            track_writes: 0,
            panels: Vec::new(),
            latency: AHashMap::new(),
            withheld: AHashSet::new(),
            removed: AHashSet::new(),
            hidden: AHashSet::new(),
            opacity: AHashMap::new(),
            ghosts: AHashMap::new(),
            ghost_log: Vec::new(),
            next_ghost: 1,
            max_live_ghosts: 0,
            crumb_wrapper_height: 0.0,
            enter_items: AHashMap::new(),
            enter_placements: AHashMap::new(),
            frames: 0,
        }
    }

    #[must_use]
    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.set_viewport(width, height);
        self
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    // -----------------------------------------------------------------------
    // Failure injection
    // -----------------------------------------------------------------------

    /// Cards of `panel` appear `frames` frames after it is committed.
    pub fn set_mount_latency(&mut self, panel: NodeKey, frames: u32) {
        self.latency.insert(panel, frames);
    }

    /// The card for `key` never appears in any panel.
    pub fn withhold_card(&mut self, key: NodeKey) {
        self.withheld.insert(key);
    }

    /// Take `target` out of layout until [`restore_element`](Self::restore_element).
    pub fn remove_element(&mut self, target: Target) {
        self.removed.insert(target);
    }

    pub fn restore_element(&mut self, target: &Target) {
        self.removed.remove(target);
    }

    /// Mark every live ghost as detached from the overlay.
    pub fn detach_ghosts(&mut self) {
        for ghost in self.ghosts.values_mut() {
            ghost.detached = true;
        }
    }

    /// Items matching the enter selector inside `panel`.
    pub fn set_enter_items(&mut self, panel: NodeKey, count: usize) {
        self.enter_items.insert(panel, count);
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn is_hidden(&self, target: &Target) -> bool {
        self.hidden.contains(target)
    }

    #[must_use]
    pub fn opacity(&self, target: &Target, part: Part) -> Option<f64> {
        self.opacity.get(&(target.clone(), part)).copied()
    }

    #[must_use]
    pub fn live_ghosts(&self) -> usize {
        self.ghosts.len()
    }

    /// Most ghosts alive at the same time so far.
    #[must_use]
    pub fn max_live_ghosts(&self) -> usize {
        self.max_live_ghosts
    }

    #[must_use]
    pub fn ghost_log(&self) -> &[GhostEvent] {
        &self.ghost_log
    }

    /// Last frame placed for a live ghost.
    #[must_use]
    pub fn ghost_frame(&self, id: GhostId) -> Option<GhostFrame> {
        self.ghosts.get(&id).map(|g| g.frame)
    }

    #[must_use]
    pub fn ghost_placements(&self, id: GhostId) -> usize {
        self.ghosts.get(&id).map_or(0, |g| g.placements)
    }

    /// Current bounds of a live ghost.
    #[must_use]
    pub fn ghost_rect(&self, id: GhostId) -> Option<Rect> {
        self.ghosts
            .get(&id)
            .map(|g| g.spec.origin.translate(g.frame.offset))
    }

    #[must_use]
    pub fn track_writes(&self) -> usize {
        self.track_writes
    }

    #[must_use]
    pub fn crumb_wrapper_height(&self) -> f64 {
        self.crumb_wrapper_height
    }

    #[must_use]
    pub fn enter_item(&self, panel: &NodeKey, index: usize) -> Option<(f64, f64)> {
        self.enter_placements.get(&(panel.clone(), index)).copied()
    }

    /// Keys of the committed panels, root first.
    #[must_use]
    pub fn panel_keys(&self) -> Vec<NodeKey> {
        self.panels.iter().map(|p| p.key.clone()).collect()
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    fn crumbs_per_row(&self) -> usize {
        let usable = (self.width - 2.0 * CRUMB_ROW_PADDING + CRUMB_GAP).max(0.0);
        ((usable / (CRUMB_WIDTH + CRUMB_GAP)).floor() as usize).max(1)
    }

    fn crumb_rect(&self, index: usize) -> Rect {
        let per_row = self.crumbs_per_row();
        let (row, col) = (index / per_row, index % per_row);
        Rect::new(
            CRUMB_ROW_PADDING + col as f64 * (CRUMB_WIDTH + CRUMB_GAP),
            CRUMB_ROW_PADDING + row as f64 * (CRUMB_HEIGHT + CRUMB_GAP),
            CRUMB_WIDTH,
            CRUMB_HEIGHT,
        )
    }

    fn row_height_for(&self, crumbs: usize) -> f64 {
        if crumbs == 0 {
            return 0.0;
        }
        let rows = crumbs.div_ceil(self.crumbs_per_row());
        2.0 * CRUMB_ROW_PADDING + rows as f64 * CRUMB_HEIGHT + (rows - 1) as f64 * CRUMB_GAP
    }

    fn card_rect(&self, depth: usize, index: usize) -> Rect {
        let top = self.row_height_for(self.panels.len()) + PANEL_PADDING;
        Rect::new(
            depth as f64 * self.width + self.track_x + PANEL_PADDING,
            top + index as f64 * (CARD_HEIGHT + CARD_GAP),
            (self.width - 2.0 * PANEL_PADDING).max(0.0),
            CARD_HEIGHT,
        )
    }

    fn locate_card(&self, key: &NodeKey) -> Option<Rect> {
        if self.withheld.contains(key) {
            return None;
        }
        self.panels
            .iter()
            .enumerate()
            .filter(|(_, panel)| panel.frames_until_mounted == 0)
            .find_map(|(depth, panel)| {
                (self.catalog)(&panel.key)
                    .iter()
                    .position(|k| k == key)
                    .map(|index| self.card_rect(depth, index))
            })
    }
}

impl Scene for HeadlessScene {
    fn begin_frame(&mut self, _dt: Duration) {
        self.frames += 1;
        for panel in &mut self.panels {
            panel.frames_until_mounted = panel.frames_until_mounted.saturating_sub(1);
        }
    }

    fn snapshot(&self, target: &Target) -> Option<Snapshot> {
        if self.removed.contains(target) {
            return None;
        }
        match target {
            Target::Card(key) => self.locate_card(key).map(|rect| Snapshot {
                outer: rect,
                shell: rect,
                padding: CARD_INSETS,
                has_content: true,
            }),
            Target::Crumb(key) => self
                .panels
                .iter()
                .position(|p| &p.key == key)
                .map(|index| {
                    let rect = self.crumb_rect(index);
                    Snapshot {
                        outer: rect,
                        shell: rect,
                        padding: CRUMB_INSETS,
                        has_content: true,
                    }
                }),
        }
    }

    fn set_hidden(&mut self, target: &Target, hidden: bool) {
        if hidden {
            self.hidden.insert(target.clone());
        } else {
            self.hidden.remove(target);
        }
    }

    fn set_opacity(&mut self, target: &Target, part: Part, opacity: Option<f64>) {
        let slot = (target.clone(), part);
        match opacity {
            Some(value) => {
                self.opacity.insert(slot, value);
            }
            None => {
                self.opacity.remove(&slot);
            }
        }
    }

    fn mount_ghost(&mut self, spec: GhostSpec) -> GhostId {
        let id = GhostId(self.next_ghost);
        self.next_ghost += 1;
        self.ghost_log.push(GhostEvent::Mounted {
            id,
            source: spec.source.clone(),
        });
        self.ghosts.insert(
            id,
            Ghost {
                spec,
                frame: GhostFrame::at_origin(false),
                placements: 0,
                detached: false,
            },
        );
        self.max_live_ghosts = self.max_live_ghosts.max(self.ghosts.len());
        id
    }

    fn place_ghost(&mut self, id: GhostId, frame: GhostFrame) -> bool {
        match self.ghosts.get_mut(&id) {
            Some(ghost) if !ghost.detached => {
                ghost.frame = frame;
                ghost.placements += 1;
                true
            }
            _ => false,
        }
    }

    fn remove_ghost(&mut self, id: GhostId) {
        if self.ghosts.remove(&id).is_some() {
            self.ghost_log.push(GhostEvent::Removed { id });
        }
    }

    fn viewport_width(&self) -> f64 {
        self.width
    }

    fn viewport_height(&self) -> f64 {
        self.height
    }

    fn track_x(&self) -> f64 {
        self.track_x
    }

    fn set_track_x(&mut self, x: f64) {
        self.track_x = x;
        self.track_writes += 1;
    }

    fn stack_committed(&mut self, keys: &[NodeKey]) {
        let previous: Vec<Panel> = std::mem::take(&mut self.panels);
        self.panels = keys
            .iter()
            .map(|key| match previous.iter().find(|p| &p.key == key) {
                Some(existing) => existing.clone(),
                None => Panel {
                    key: key.clone(),
                    frames_until_mounted: self.latency.get(key).copied().unwrap_or(0),
                },
            })
            .collect();
        trace!(target: "springstack.scene", panels = self.panels.len(), "stack committed");
    }

    fn crumb_row_height(&self) -> f64 {
        self.row_height_for(self.panels.len())
    }

    fn set_crumb_wrapper_height(&mut self, height: f64) {
        self.crumb_wrapper_height = height;
    }

    fn enter_item_count(&self, panel: &NodeKey, _selector: &str) -> usize {
        self.enter_items.get(panel).copied().unwrap_or(0)
    }

    fn place_enter_item(&mut self, panel: &NodeKey, index: usize, y: f64, opacity: f64) {
        self.enter_placements
            .insert((panel.clone(), index), (y, opacity));
    }
}
