#![forbid(unsafe_code)]

//! Renderer maps and frame composition.
//!
//! The component does not own a widget type. Callers choose a view type `V`
//! and register slot renderers that turn a [`Node`] into a `V`. A frame is
//! composed from those renderers and the caller's [`RenderProps`], with the
//! attributes and test ids a DOM binding (or a test) needs to find cards,
//! crumbs, panels and the track.
//!
//! # Resolution order
//!
//! For a node and a slot: the renderer named by the node's own slot key,
//! then the renderer registered for the node's kind, then the slot default.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::completion::Completion;
use crate::node::{Node, NodeKey};
use crate::scene::{ATTR_ITEM_CARD, ATTR_ITEM_ID, ATTR_ITEM_TYPE, ATTR_PANEL_KEY};
use crate::springstack::Helpers;

/// Test id of the panel track.
pub const TRACK_TEST_ID: &str = "springstack-track";
/// Attribute carrying test ids.
pub const ATTR_TEST_ID: &str = "data-testid";

#[must_use]
pub fn card_test_id(key: &NodeKey) -> String {
    format!("springstack-card-{}-{}", key.kind, key.id)
}

#[must_use]
pub fn crumb_test_id(key: &NodeKey) -> String {
    format!("springstack-crumb-{}-{}", key.kind, key.id)
}

#[must_use]
pub fn panel_test_id(index: usize) -> String {
    format!("springstack-panel-{index}")
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// Where a node is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// A card in its parent's list.
    List,
    /// A breadcrumb.
    Crumb,
    /// The node's own panel.
    Panel,
}

impl Slot {
    fn node_key<D>(self, node: &Node<D>) -> Option<&str> {
        match self {
            Self::List => node.slots.list.as_deref(),
            Self::Crumb => node.slots.crumb.as_deref(),
            Self::Panel => node.slots.panel.as_deref(),
        }
    }
}

/// Turns a node into a view.
pub type SlotRenderer<D, V> = Rc<dyn Fn(&Node<D>) -> V>;

/// Renderers for one slot, keyed by kind or by a node's slot key.
pub struct SlotMap<D, V> {
    by_key: AHashMap<String, SlotRenderer<D, V>>,
    default: Option<SlotRenderer<D, V>>,
}

impl<D, V> Default for SlotMap<D, V> {
    fn default() -> Self {
        Self {
            by_key: AHashMap::new(),
            default: None,
        }
    }
}

impl<D, V> Clone for SlotMap<D, V> {
    fn clone(&self) -> Self {
        Self {
            by_key: self.by_key.clone(),
            default: self.default.clone(),
        }
    }
}

impl<D, V> fmt::Debug for SlotMap<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.by_key.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("SlotMap")
            .field("keys", &keys)
            .field("default", &self.default.is_some())
            .finish()
    }
}

impl<D, V> SlotMap<D, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, render: impl Fn(&Node<D>) -> V + 'static) -> Self {
        self.insert(key, render);
        self
    }

    #[must_use]
    pub fn with_default(mut self, render: impl Fn(&Node<D>) -> V + 'static) -> Self {
        self.set_default(render);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, render: impl Fn(&Node<D>) -> V + 'static) {
        self.by_key.insert(key.into(), Rc::new(render));
    }

    pub fn insert_rc(&mut self, key: impl Into<String>, render: SlotRenderer<D, V>) {
        self.by_key.insert(key.into(), render);
    }

    pub fn set_default(&mut self, render: impl Fn(&Node<D>) -> V + 'static) {
        self.default = Some(Rc::new(render));
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SlotRenderer<D, V>> {
        self.by_key.get(key)
    }

    #[must_use]
    pub fn default_renderer(&self) -> Option<&SlotRenderer<D, V>> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty() && self.default.is_none()
    }

    fn resolve(&self, node: &Node<D>, slot_key: Option<&str>) -> Option<&SlotRenderer<D, V>> {
        slot_key
            .and_then(|key| self.by_key.get(key))
            .or_else(|| self.by_key.get(&node.kind))
            .or(self.default.as_ref())
    }
}

/// Slot renderers for list cards, crumbs and panels.
pub struct Renderers<D, V> {
    pub list: SlotMap<D, V>,
    pub crumb: SlotMap<D, V>,
    pub panel: SlotMap<D, V>,
}

impl<D, V> Default for Renderers<D, V> {
    fn default() -> Self {
        Self {
            list: SlotMap::default(),
            crumb: SlotMap::default(),
            panel: SlotMap::default(),
        }
    }
}

impl<D, V> Clone for Renderers<D, V> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
            crumb: self.crumb.clone(),
            panel: self.panel.clone(),
        }
    }
}

impl<D, V> fmt::Debug for Renderers<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderers")
            .field("list", &self.list)
            .field("crumb", &self.crumb)
            .field("panel", &self.panel)
            .finish()
    }
}

impl<D, V> Renderers<D, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_list(mut self, list: SlotMap<D, V>) -> Self {
        self.list = list;
        self
    }

    #[must_use]
    pub fn with_crumb(mut self, crumb: SlotMap<D, V>) -> Self {
        self.crumb = crumb;
        self
    }

    #[must_use]
    pub fn with_panel(mut self, panel: SlotMap<D, V>) -> Self {
        self.panel = panel;
        self
    }

    #[must_use]
    pub fn slot(&self, slot: Slot) -> &SlotMap<D, V> {
        match slot {
            Slot::List => &self.list,
            Slot::Crumb => &self.crumb,
            Slot::Panel => &self.panel,
        }
    }

    pub fn slot_mut(&mut self, slot: Slot) -> &mut SlotMap<D, V> {
        match slot {
            Slot::List => &mut self.list,
            Slot::Crumb => &mut self.crumb,
            Slot::Panel => &mut self.panel,
        }
    }

    /// The renderer `node` uses in `slot`, if any.
    #[must_use]
    pub fn resolve(&self, node: &Node<D>, slot: Slot) -> Option<&SlotRenderer<D, V>> {
        self.slot(slot).resolve(node, slot.node_key(node))
    }

    #[must_use]
    pub fn render(&self, node: &Node<D>, slot: Slot) -> Option<V> {
        self.resolve(node, slot).map(|render| render(node))
    }
}

// ---------------------------------------------------------------------------
// Props
// ---------------------------------------------------------------------------

/// Attributes for a list card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardProps {
    pub key: NodeKey,
    pub test_id: String,
    /// The card is represented by a breadcrumb and must not be drawn.
    pub hidden: bool,
}

impl CardProps {
    #[must_use]
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            (ATTR_ITEM_CARD, "true".to_owned()),
            (ATTR_ITEM_TYPE, self.key.kind.clone()),
            (ATTR_ITEM_ID, self.key.id.clone()),
            (ATTR_TEST_ID, self.test_id.clone()),
        ]
    }
}

/// Attributes for a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelProps {
    pub key: NodeKey,
}

impl PanelProps {
    #[must_use]
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![(ATTR_PANEL_KEY, self.key.to_string())]
    }
}

type HelperView<D, V> = Box<dyn Fn(&Helpers<D>) -> V>;

/// One panel returned by [`RenderProps`]; its test id defaults to its index.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel<V> {
    pub content: V,
    pub test_id: Option<String>,
}

impl<V> Panel<V> {
    #[must_use]
    pub fn new(content: V) -> Self {
        Self {
            content,
            test_id: None,
        }
    }

    #[must_use]
    pub fn with_test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }
}

impl<V> From<V> for Panel<V> {
    fn from(content: V) -> Self {
        Self::new(content)
    }
}

/// Caller-supplied parts of a frame.
pub struct RenderProps<D, V> {
    panels: Box<dyn Fn(&Helpers<D>) -> Vec<Panel<V>>>,
    header: Option<HelperView<D, V>>,
    footer: Option<HelperView<D, V>>,
    overlay: Option<HelperView<D, V>>,
    overlay_portal: bool,
}

impl<D, V> fmt::Debug for RenderProps<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderProps")
            .field("header", &self.header.is_some())
            .field("footer", &self.footer.is_some())
            .field("overlay", &self.overlay.is_some())
            .field("overlay_portal", &self.overlay_portal)
            .finish_non_exhaustive()
    }
}

impl<D, V> RenderProps<D, V> {
    #[must_use]
    pub fn new(panels: impl Fn(&Helpers<D>) -> Vec<Panel<V>> + 'static) -> Self {
        Self {
            panels: Box::new(panels),
            header: None,
            footer: None,
            overlay: None,
            overlay_portal: true,
        }
    }

    #[must_use]
    pub fn header(mut self, render: impl Fn(&Helpers<D>) -> V + 'static) -> Self {
        self.header = Some(Box::new(render));
        self
    }

    #[must_use]
    pub fn footer(mut self, render: impl Fn(&Helpers<D>) -> V + 'static) -> Self {
        self.footer = Some(Box::new(render));
        self
    }

    #[must_use]
    pub fn overlay(mut self, render: impl Fn(&Helpers<D>) -> V + 'static) -> Self {
        self.overlay = Some(Box::new(render));
        self
    }

    /// Render the overlay above the whole document (`true`, the default)
    /// or inline over the component.
    #[must_use]
    pub fn overlay_portal(mut self, portal: bool) -> Self {
        self.overlay_portal = portal;
        self
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One breadcrumb of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CrumbView<V> {
    pub key: NodeKey,
    pub index: usize,
    pub test_id: String,
    /// Value of the crumb-target attribute.
    pub target: String,
    /// The last crumb.
    pub selected: bool,
    /// Not yet revealed by its morph; drawn invisible and inert.
    pub pending: bool,
    pub content: Option<V>,
}

impl<V> CrumbView<V> {
    /// Activate the crumb: pop back to its depth.
    pub fn activate<D: Clone + 'static>(&self, helpers: &Helpers<D>) -> Completion {
        helpers.pop_to(self.index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView<V> {
    pub test_id: String,
    pub content: V,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPlacement {
    /// Fixed over the whole document.
    Portal,
    /// Absolutely positioned over the component.
    Inline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayView<V> {
    pub placement: OverlayPlacement,
    pub content: V,
}

/// A composed frame, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<V> {
    pub header: Option<V>,
    pub crumbs: Vec<CrumbView<V>>,
    /// Height of the wrapper clipping the breadcrumb row.
    pub crumb_wrapper_height: f64,
    pub track_test_id: &'static str,
    pub track_x: f64,
    pub panels: Vec<PanelView<V>>,
    pub footer: Option<V>,
    pub overlay: Option<OverlayView<V>>,
}

impl<V> Frame<V> {
    pub(crate) fn compose<D: Clone + 'static>(
        helpers: &Helpers<D>,
        renderers: &Renderers<D, V>,
        props: &RenderProps<D, V>,
        crumb_wrapper_height: f64,
        track_x: f64,
    ) -> Self {
        let stack = helpers.stack();
        let last = stack.len().saturating_sub(1);
        let crumbs = stack
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let key = node.key();
                CrumbView {
                    test_id: crumb_test_id(&key),
                    target: key.to_string(),
                    selected: index == last,
                    pending: helpers.view().is_crumb_pending(&key),
                    content: renderers.render(node, Slot::Crumb),
                    index,
                    key,
                }
            })
            .collect();

        let panels = (props.panels)(helpers)
            .into_iter()
            .enumerate()
            .map(|(index, panel)| PanelView {
                test_id: panel.test_id.unwrap_or_else(|| panel_test_id(index)),
                content: panel.content,
            })
            .collect();

        let placement = if props.overlay_portal {
            OverlayPlacement::Portal
        } else {
            OverlayPlacement::Inline
        };

        Self {
            header: props.header.as_ref().map(|render| render(helpers)),
            crumbs,
            crumb_wrapper_height,
            track_test_id: TRACK_TEST_ID,
            track_x,
            panels,
            footer: props.footer.as_ref().map(|render| render(helpers)),
            overlay: props.overlay.as_ref().map(|render| OverlayView {
                placement,
                content: render(helpers),
            }),
        }
    }

    /// The crumb with `test_id`.
    #[must_use]
    pub fn crumb(&self, test_id: &str) -> Option<&CrumbView<V>> {
        self.crumbs.iter().find(|c| c.test_id == test_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSlots;

    fn renderers() -> Renderers<(), String> {
        Renderers::new().with_list(
            SlotMap::new()
                .with("folder", |n: &Node| format!("folder {}", n.id))
                .with("fancy", |n: &Node| format!("fancy {}", n.id))
                .with_default(|n: &Node| format!("default {}", n.id)),
        )
    }

    #[test]
    fn kind_renderer_beats_default() {
        let r = renderers();
        assert_eq!(r.render(&Node::new("folder", "a"), Slot::List).as_deref(), Some("folder a"));
        assert_eq!(r.render(&Node::new("file", "b"), Slot::List).as_deref(), Some("default b"));
    }

    #[test]
    fn node_slot_key_beats_kind() {
        let r = renderers();
        let node: Node = Node::new("folder", "a").with_slots(NodeSlots {
            list: Some("fancy".into()),
            ..NodeSlots::default()
        });
        assert_eq!(r.render(&node, Slot::List).as_deref(), Some("fancy a"));
    }

    #[test]
    fn unknown_slot_key_falls_through_to_kind() {
        let r = renderers();
        let node: Node = Node::new("folder", "a").with_slots(NodeSlots {
            list: Some("missing".into()),
            ..NodeSlots::default()
        });
        assert_eq!(r.render(&node, Slot::List).as_deref(), Some("folder a"));
    }

    #[test]
    fn empty_slot_renders_nothing() {
        let r = renderers();
        assert!(r.render(&Node::new("folder", "a"), Slot::Panel).is_none());
        assert!(r.panel.is_empty());
    }

    #[test]
    fn test_ids_follow_the_dom_contract() {
        let key = NodeKey::new("application/x-folder", "c-docs");
        assert_eq!(card_test_id(&key), "springstack-card-application/x-folder-c-docs");
        assert_eq!(crumb_test_id(&key), "springstack-crumb-application/x-folder-c-docs");
        assert_eq!(panel_test_id(2), "springstack-panel-2");
    }

    #[test]
    fn card_attributes() {
        let props = CardProps {
            key: NodeKey::new("file", "x"),
            test_id: "springstack-card-file-x".into(),
            hidden: false,
        };
        let attrs = props.attributes();
        assert!(attrs.contains(&("data-item-card", "true".to_owned())));
        assert!(attrs.contains(&("data-item-type", "file".to_owned())));
        assert!(attrs.contains(&("data-item-id", "x".to_owned())));
        assert_eq!(
            PanelProps { key: NodeKey::new("file", "x") }.attributes(),
            vec![("data-panel-key", "file:x".to_owned())]
        );
    }
}
