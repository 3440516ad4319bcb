#![forbid(unsafe_code)]

//! Node-type registry: icons, detail lines, summaries and content previews
//! keyed by node kind.
//!
//! Kinds are media-type-like strings. A lookup tries the exact kind, then the
//! wildcard for its major part (`text/markdown` falls back to `text/*`), then
//! the registry's fallback definition, so every kind resolves.
//!
//! Registries are persistent: [`NodeTypeRegistry::register`] and
//! [`NodeTypeRegistry::register_all`] return a new registry and leave the
//! receiver untouched.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::node::Node;
use crate::render::{Renderers, SlotMap, SlotRenderer};
use crate::springstack::Helpers;

/// Key reported by [`ResolvedNodeType::matched_key`] when nothing matched.
pub const FALLBACK_KEY: &str = "fallback";

/// A definition's secondary line under the title.
pub enum DetailLine<D> {
    Static(String),
    Computed(Rc<dyn Fn(&Node<D>) -> Option<String>>),
}

impl<D> DetailLine<D> {
    pub fn computed(f: impl Fn(&Node<D>) -> Option<String> + 'static) -> Self {
        Self::Computed(Rc::new(f))
    }

    #[must_use]
    pub fn for_node(&self, node: &Node<D>) -> Option<String> {
        match self {
            Self::Static(line) => Some(line.clone()),
            Self::Computed(f) => f(node),
        }
    }
}

impl<D> Clone for DetailLine<D> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(line) => Self::Static(line.clone()),
            Self::Computed(f) => Self::Computed(Rc::clone(f)),
        }
    }
}

impl<D> fmt::Debug for DetailLine<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(line) => f.debug_tuple("Static").field(line).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<D> From<&str> for DetailLine<D> {
    fn from(line: &str) -> Self {
        Self::Static(line.to_owned())
    }
}

/// The default list and crumb view: icon, title (or id) and detail line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub icon: String,
    pub title: String,
    pub detail_line: Option<String>,
}

/// Renders a summary for a node once its type is resolved.
pub type SummaryRenderer<D, V> = Rc<dyn Fn(&Node<D>, &ResolvedNodeType<D, V>) -> V>;

/// Renders a node's panel content.
pub type ContentRenderer<D, V> =
    Rc<dyn Fn(&Node<D>, &ResolvedNodeType<D, V>, Option<&Helpers<D>>) -> V>;

/// How one kind (or `major/*` family) is presented.
pub struct NodeTypeDefinition<D, V = Summary> {
    pub icon: String,
    pub detail_line: Option<DetailLine<D>>,
    pub summary: Option<SummaryRenderer<D, V>>,
    pub content: Option<ContentRenderer<D, V>>,
}

impl<D, V> Clone for NodeTypeDefinition<D, V> {
    fn clone(&self) -> Self {
        Self {
            icon: self.icon.clone(),
            detail_line: self.detail_line.clone(),
            summary: self.summary.clone(),
            content: self.content.clone(),
        }
    }
}

impl<D, V> fmt::Debug for NodeTypeDefinition<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTypeDefinition")
            .field("icon", &self.icon)
            .field("detail_line", &self.detail_line)
            .field("summary", &self.summary.is_some())
            .field("content", &self.content.is_some())
            .finish()
    }
}

impl<D, V> NodeTypeDefinition<D, V> {
    #[must_use]
    pub fn new(icon: impl Into<String>) -> Self {
        Self {
            icon: icon.into(),
            detail_line: None,
            summary: None,
            content: None,
        }
    }

    #[must_use]
    pub fn detail_line(mut self, line: impl Into<String>) -> Self {
        self.detail_line = Some(DetailLine::Static(line.into()));
        self
    }

    #[must_use]
    pub fn detail_line_with(mut self, f: impl Fn(&Node<D>) -> Option<String> + 'static) -> Self {
        self.detail_line = Some(DetailLine::computed(f));
        self
    }

    #[must_use]
    pub fn summary(mut self, f: impl Fn(&Node<D>, &ResolvedNodeType<D, V>) -> V + 'static) -> Self {
        self.summary = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn content(
        mut self,
        f: impl Fn(&Node<D>, &ResolvedNodeType<D, V>, Option<&Helpers<D>>) -> V + 'static,
    ) -> Self {
        self.content = Some(Rc::new(f));
        self
    }

    fn resolved(&self, matched_key: &str, detail_line: Option<String>) -> ResolvedNodeType<D, V> {
        ResolvedNodeType {
            matched_key: matched_key.to_owned(),
            icon: self.icon.clone(),
            detail_line,
            summary: self.summary.clone(),
            content: self.content.clone(),
        }
    }
}

impl<D: 'static, V: 'static> NodeTypeDefinition<D, V> {
    /// Use a [`FileTypeContent`] preview as the content renderer.
    #[must_use]
    pub fn file_content(self, preview: impl FileTypeContent<D> + 'static) -> Self
    where
        V: From<ContentView>,
    {
        self.content(move |node, resolved, helpers| {
            let detail_line = resolved.detail_line.as_deref();
            V::from(preview.render(&FileTypeContentProps {
                node,
                icon: Some(resolved.icon.as_str()),
                detail_line,
                helpers,
            }))
        })
    }
}

/// Outcome of a lookup.
pub struct ResolvedNodeType<D, V = Summary> {
    /// The registry key that matched, or [`FALLBACK_KEY`].
    pub matched_key: String,
    pub icon: String,
    /// Filled in when rendering for a specific node; `None` from
    /// [`NodeTypeRegistry::resolve`].
    pub detail_line: Option<String>,
    pub summary: Option<SummaryRenderer<D, V>>,
    pub content: Option<ContentRenderer<D, V>>,
}

impl<D, V> fmt::Debug for ResolvedNodeType<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedNodeType")
            .field("matched_key", &self.matched_key)
            .field("icon", &self.icon)
            .field("detail_line", &self.detail_line)
            .field("summary", &self.summary.is_some())
            .field("content", &self.content.is_some())
            .finish()
    }
}

impl<D, V> ResolvedNodeType<D, V> {
    /// Render the content preview, if the type has one.
    pub fn render_content(&self, node: &Node<D>, helpers: Option<&Helpers<D>>) -> Option<V> {
        self.content.as_ref().map(|render| render(node, self, helpers))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Kind-keyed node presentation with wildcard and fallback lookup.
pub struct NodeTypeRegistry<D, V = Summary> {
    definitions: Rc<AHashMap<String, NodeTypeDefinition<D, V>>>,
    fallback: Rc<NodeTypeDefinition<D, V>>,
}

impl<D, V> Clone for NodeTypeRegistry<D, V> {
    fn clone(&self) -> Self {
        Self {
            definitions: Rc::clone(&self.definitions),
            fallback: Rc::clone(&self.fallback),
        }
    }
}

impl<D, V> fmt::Debug for NodeTypeRegistry<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("NodeTypeRegistry")
            .field("keys", &keys)
            .field("fallback", &self.fallback.icon)
            .finish()
    }
}

fn is_wildcard(key: &str) -> bool {
    key.contains('*')
}

impl<D, V> NodeTypeRegistry<D, V> {
    /// An empty registry; every kind resolves to `fallback`.
    #[must_use]
    pub fn new(fallback: NodeTypeDefinition<D, V>) -> Self {
        Self {
            definitions: Rc::new(AHashMap::new()),
            fallback: Rc::new(fallback),
        }
    }

    /// A registry with `definition` registered under `kind`.
    #[must_use]
    pub fn register(&self, kind: impl Into<String>, definition: NodeTypeDefinition<D, V>) -> Self {
        self.register_all([(kind.into(), definition)])
    }

    /// A registry with every `(kind, definition)` pair registered; later
    /// pairs replace earlier ones.
    #[must_use]
    pub fn register_all<K: Into<String>>(
        &self,
        definitions: impl IntoIterator<Item = (K, NodeTypeDefinition<D, V>)>,
    ) -> Self {
        let mut next = (*self.definitions).clone();
        for (kind, definition) in definitions {
            next.insert(kind.into(), definition);
        }
        Self {
            definitions: Rc::new(next),
            fallback: Rc::clone(&self.fallback),
        }
    }

    /// The definition registered under exactly `kind`.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&NodeTypeDefinition<D, V>> {
        self.definitions.get(kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn lookup<'a>(&'a self, kind: &str) -> (&'a str, &'a NodeTypeDefinition<D, V>) {
        if let Some((key, definition)) = self.definitions.get_key_value(kind) {
            return (key, definition);
        }
        let major = kind.split('/').next().unwrap_or_default();
        if !major.is_empty() {
            if let Some((key, definition)) = self.definitions.get_key_value(&format!("{major}/*")) {
                return (key, definition);
            }
        }
        (FALLBACK_KEY, self.fallback.as_ref())
    }

    /// Resolve `kind` without a node; the detail line is left empty.
    #[must_use]
    pub fn resolve(&self, kind: &str) -> ResolvedNodeType<D, V> {
        let (key, definition) = self.lookup(kind);
        definition.resolved(key, None)
    }

    /// Resolve `node`'s kind and compute its detail line.
    #[must_use]
    pub fn resolve_node(&self, node: &Node<D>) -> ResolvedNodeType<D, V> {
        let (key, definition) = self.lookup(&node.kind);
        let detail_line = definition.detail_line.as_ref().and_then(|d| d.for_node(node));
        definition.resolved(key, detail_line)
    }

    #[must_use]
    pub fn icon_for(&self, kind: &str) -> &str {
        &self.lookup(kind).1.icon
    }

    #[must_use]
    pub fn detail_line_for(&self, node: &Node<D>) -> Option<String> {
        self.lookup(&node.kind)
            .1
            .detail_line
            .as_ref()
            .and_then(|d| d.for_node(node))
    }
}

fn default_summary<D, V: From<Summary>>(node: &Node<D>, resolved: &ResolvedNodeType<D, V>) -> V {
    V::from(Summary {
        icon: resolved.icon.clone(),
        title: node.label().to_owned(),
        detail_line: resolved.detail_line.clone(),
    })
}

fn summarize<D, V: From<Summary>>(
    node: &Node<D>,
    key: &str,
    definition: &NodeTypeDefinition<D, V>,
) -> V {
    let detail_line = definition.detail_line.as_ref().and_then(|d| d.for_node(node));
    let resolved = definition.resolved(key, detail_line);
    match &definition.summary {
        Some(render) => render(node, &resolved),
        None => default_summary(node, &resolved),
    }
}

impl<D: 'static, V: From<Summary> + 'static> NodeTypeRegistry<D, V> {
    /// List and crumb renderers: one per registered non-wildcard kind, and a
    /// default that resolves wildcards and the fallback per node.
    #[must_use]
    pub fn to_renderers(&self) -> Renderers<D, V> {
        let mut list = SlotMap::new();
        let mut crumb = SlotMap::new();
        for (key, definition) in self.definitions.iter() {
            if is_wildcard(key) {
                continue;
            }
            let matched = key.clone();
            let definition = definition.clone();
            let render: SlotRenderer<D, V> =
                Rc::new(move |node: &Node<D>| summarize(node, &matched, &definition));
            list.insert_rc(key.clone(), Rc::clone(&render));
            crumb.insert_rc(key.clone(), render);
        }

        let registry = self.clone();
        let fallback: SlotRenderer<D, V> = Rc::new(move |node: &Node<D>| {
            let (key, definition) = registry.lookup(&node.kind);
            summarize(node, key, definition)
        });
        let default = Rc::clone(&fallback);
        list.set_default(move |node| fallback(node));
        crumb.set_default(move |node| default(node));
        Renderers::new().with_list(list).with_crumb(crumb)
    }
}

// ---------------------------------------------------------------------------
// File-type content
// ---------------------------------------------------------------------------

/// Inputs of a file-type preview.
pub struct FileTypeContentProps<'a, D> {
    pub node: &'a Node<D>,
    pub icon: Option<&'a str>,
    pub detail_line: Option<&'a str>,
    pub helpers: Option<&'a Helpers<D>>,
}

/// A download link offered by a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub label: String,
}

/// A rendered content preview.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentView {
    pub icon: Option<String>,
    pub title: String,
    pub detail_line: Option<String>,
    /// Label/value rows.
    pub fields: Vec<(String, String)>,
    pub message: Option<String>,
    pub link: Option<Link>,
    /// Preview-local failure, shown inline instead of the preview.
    pub error: Option<String>,
}

impl ContentView {
    /// Header shared by every preview: icon, title and detail line.
    #[must_use]
    pub fn base<D>(props: &FileTypeContentProps<'_, D>) -> Self {
        Self {
            icon: props.icon.map(str::to_owned),
            title: props.node.label().to_owned(),
            detail_line: props.detail_line.map(str::to_owned),
            ..Self::default()
        }
    }
}

/// A pluggable preview for one family of files.
pub trait FileTypeContent<D> {
    fn render(&self, props: &FileTypeContentProps<'_, D>) -> ContentView;
}

/// File facts the generic preview reads from node data.
pub trait FileInfo {
    fn url(&self) -> Option<&str> {
        None
    }

    fn size_kb(&self) -> Option<u64> {
        None
    }
}

/// Preview for files without a dedicated renderer: type, size, and a
/// download link when the node has a URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericContent;

impl<D: FileInfo> FileTypeContent<D> for GenericContent {
    fn render(&self, props: &FileTypeContentProps<'_, D>) -> ContentView {
        let data = props.node.data.as_ref();
        let size = data
            .and_then(FileInfo::size_kb)
            .filter(|kb| *kb > 0)
            .map_or_else(|| "Unknown size".to_owned(), |kb| format!("{kb} KB"));
        let mut view = ContentView::base(props);
        view.fields = vec![
            ("Type".to_owned(), props.node.kind.clone()),
            ("Size".to_owned(), size),
        ];
        view.message = Some("No preview available for this file type.".to_owned());
        view.link = data.and_then(FileInfo::url).map(|href| Link {
            href: href.to_owned(),
            label: "Download file".to_owned(),
        });
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Slot;

    #[derive(Debug, Clone, Default)]
    struct File {
        url: Option<String>,
        size_kb: Option<u64>,
    }

    impl FileInfo for File {
        fn url(&self) -> Option<&str> {
            self.url.as_deref()
        }

        fn size_kb(&self) -> Option<u64> {
            self.size_kb
        }
    }

    fn registry() -> NodeTypeRegistry<File> {
        NodeTypeRegistry::new(NodeTypeDefinition::new("file"))
            .register("text/*", NodeTypeDefinition::new("file-text").detail_line("Text"))
            .register(
                "text/markdown",
                NodeTypeDefinition::new("file-markdown")
                    .detail_line_with(|n: &Node<File>| n.data.as_ref()?.size_kb.map(|kb| format!("{kb} KB"))),
            )
    }

    #[test]
    fn resolves_exact_then_wildcard_then_fallback() {
        let r = registry();
        assert_eq!(r.resolve("text/markdown").matched_key, "text/markdown");
        assert_eq!(r.resolve("text/plain").matched_key, "text/*");
        assert_eq!(r.resolve("image/png").matched_key, FALLBACK_KEY);
        assert_eq!(r.icon_for("text/csv"), "file-text");
        assert_eq!(r.icon_for("application/zip"), "file");
        assert!(r.resolve("text/plain").detail_line.is_none());
    }

    #[test]
    fn register_leaves_the_original_untouched() {
        let base = registry();
        let more = base.register("image/*", NodeTypeDefinition::new("image"));
        assert_eq!(base.len(), 2);
        assert_eq!(more.len(), 3);
        assert_eq!(base.resolve("image/png").matched_key, FALLBACK_KEY);
        assert_eq!(more.resolve("image/png").matched_key, "image/*");
        assert!(more.get("image/*").is_some());
        assert!(more.get("image/png").is_none());
    }

    #[test]
    fn detail_lines_are_static_or_computed() {
        let r = registry();
        let md = Node::new("text/markdown", "a").with_data(File {
            size_kb: Some(12),
            ..File::default()
        });
        assert_eq!(r.detail_line_for(&md).as_deref(), Some("12 KB"));
        assert_eq!(r.detail_line_for(&Node::new("text/plain", "b")).as_deref(), Some("Text"));
        assert_eq!(r.detail_line_for(&Node::new("text/markdown", "c")), None);
        assert_eq!(r.detail_line_for(&Node::new("image/png", "d")), None);
    }

    #[test]
    fn renderers_cover_registered_kinds_and_default() {
        let r = registry();
        let renderers = r.to_renderers();
        assert!(renderers.list.get("text/markdown").is_some());
        assert!(renderers.list.get("text/*").is_none());
        assert!(renderers.crumb.get("text/markdown").is_some());
        assert!(renderers.panel.is_empty());

        let plain = Node::new("text/plain", "notes").with_title("Notes");
        assert_eq!(
            renderers.render(&plain, Slot::List),
            Some(Summary {
                icon: "file-text".into(),
                title: "Notes".into(),
                detail_line: Some("Text".into()),
            })
        );
        let unknown = Node::new("image/png", "pic");
        let summary = renderers.render(&unknown, Slot::Crumb);
        assert_eq!(summary.map(|s| (s.icon, s.title)), Some(("file".into(), "pic".into())));
    }

    #[test]
    fn custom_summary_wins() {
        let r: NodeTypeRegistry<File> = NodeTypeRegistry::new(NodeTypeDefinition::new("file")).register(
            "application/x-folder",
            NodeTypeDefinition::new("folder").summary(|n: &Node<File>, resolved: &ResolvedNodeType<File>| Summary {
                icon: resolved.icon.clone(),
                title: format!("[{}]", n.label()),
                detail_line: None,
            }),
        );
        let node = Node::new("application/x-folder", "docs");
        let summary = r.to_renderers().render(&node, Slot::List);
        assert_eq!(summary.map(|s| s.title), Some("[docs]".to_owned()));
    }

    #[test]
    fn generic_content_reports_type_size_and_link() {
        let node = Node::new("application/x-thing", "t").with_data(File {
            url: Some("/files/t.bin".into()),
            size_kb: Some(42),
        });
        let view = GenericContent.render(&FileTypeContentProps {
            node: &node,
            icon: Some("file"),
            detail_line: None,
            helpers: None,
        });
        assert_eq!(view.title, "t");
        assert!(view.fields.contains(&("Type".to_owned(), "application/x-thing".to_owned())));
        assert!(view.fields.contains(&("Size".to_owned(), "42 KB".to_owned())));
        assert_eq!(view.message.as_deref(), Some("No preview available for this file type."));
        assert_eq!(view.link.map(|l| l.href), Some("/files/t.bin".to_owned()));
        assert!(view.error.is_none());

        let bare: Node<File> = Node::new("application/x-thing", "u");
        let view = GenericContent.render(&FileTypeContentProps {
            node: &bare,
            icon: None,
            detail_line: None,
            helpers: None,
        });
        assert!(view.fields.contains(&("Size".to_owned(), "Unknown size".to_owned())));
        assert!(view.link.is_none());
    }

    #[test]
    fn file_content_plugs_into_a_definition() {
        let def: NodeTypeDefinition<File, ContentView> =
            NodeTypeDefinition::new("file").file_content(GenericContent);
        let r = NodeTypeRegistry::new(def);
        let node = Node::new("x/y", "n");
        let view = r.resolve_node(&node).render_content(&node, None);
        assert_eq!(view.map(|v| v.title), Some("n".to_owned()));
    }
}
