#![forbid(unsafe_code)]

//! Navigation nodes and their `(kind, id)` identity.
//!
//! # Invariants
//!
//! 1. A node is identified by `(kind, id)`; titles, slots and data never
//!    participate in path comparisons.
//! 2. Within one stack no two nodes share the same key.

use std::fmt;

/// Identity of a node: its kind and its id.
///
/// Displays as `kind:id`, the form used for crumb targets and log fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub kind: String,
    pub id: String,
}

impl NodeKey {
    #[must_use]
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Per-node renderer overrides.
///
/// Each entry names a renderer registered in [`Renderers`](crate::Renderers)
/// and wins over the renderer registered for the node's kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSlots {
    pub list: Option<String>,
    pub crumb: Option<String>,
    pub panel: Option<String>,
}

/// One entry of the navigation stack.
#[derive(Debug, Clone)]
pub struct Node<D = ()> {
    pub id: String,
    pub kind: String,
    pub title: Option<String>,
    pub data: Option<D>,
    pub slots: NodeSlots,
}

impl<D> Node<D> {
    /// Create a node with no title, data or slots.
    #[must_use]
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            title: None,
            data: None,
            slots: NodeSlots::default(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: D) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_slots(mut self, slots: NodeSlots) -> Self {
        self.slots = slots;
        self
    }

    #[must_use]
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.kind.clone(), self.id.clone())
    }

    /// True when `key` names this node.
    #[must_use]
    pub fn is(&self, key: &NodeKey) -> bool {
        self.kind == key.kind && self.id == key.id
    }

    /// Same `(kind, id)` as `other`.
    #[must_use]
    pub fn same_key<E>(&self, other: &Node<E>) -> bool {
        self.kind == other.kind && self.id == other.id
    }

    /// Title if present, otherwise the id.
    #[must_use]
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// Compare two stacks (or paths) by their `(kind, id)` sequence.
#[must_use]
pub fn same_path<A, B>(a: &[Node<A>], b: &[Node<B>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_key(y))
}

/// Key sequence of a stack.
#[must_use]
pub fn path_keys<D>(nodes: &[Node<D>]) -> Vec<NodeKey> {
    nodes.iter().map(Node::key).collect()
}

/// `kind:id/kind:id` rendering used in log fields.
#[must_use]
pub fn describe_path<D>(nodes: &[Node<D>]) -> String {
    nodes
        .iter()
        .map(|n| format!("{}:{}", n.kind, n.id))
        .collect::<Vec<_>>()
        .join("/")
}

/// Stack equality used to decide whether a commit is a change: keys and
/// titles, never the opaque payload.
#[allow(clippy::ptr_arg)]
pub(crate) fn same_stack<D>(a: &Vec<Node<D>>, b: &Vec<Node<D>>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x.same_key(y) && x.title == y.title && x.slots == y.slots)
}
