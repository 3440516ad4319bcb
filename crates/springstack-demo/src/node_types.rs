#![forbid(unsafe_code)]

//! Icons, detail lines and previews for the demo's kinds.

use springstack::{
    ContentView, GenericContent, NodeTypeDefinition, NodeTypeRegistry, Summary,
};

use crate::data::{DemoNode, DemoNodeData, VML_KIND, format_vml_line};

/// What the demo renders a node as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoView {
    Summary(Summary),
    Content(ContentView),
}

impl From<Summary> for DemoView {
    fn from(summary: Summary) -> Self {
        Self::Summary(summary)
    }
}

impl From<ContentView> for DemoView {
    fn from(content: ContentView) -> Self {
        Self::Content(content)
    }
}

impl DemoView {
    /// One line of text for a trail or a log.
    #[must_use]
    pub fn headline(&self) -> String {
        let (icon, title, detail) = match self {
            Self::Summary(s) => (s.icon.as_str(), s.title.as_str(), s.detail_line.as_deref()),
            Self::Content(c) => (
                c.icon.as_deref().unwrap_or_default(),
                c.title.as_str(),
                c.detail_line.as_deref(),
            ),
        };
        match detail {
            Some(detail) => format!("[{icon}] {title} ({detail})"),
            None => format!("[{icon}] {title}"),
        }
    }
}

pub type DemoRegistry = NodeTypeRegistry<DemoNodeData, DemoView>;

fn diagram_line(node: &DemoNode) -> Option<String> {
    let data = node.data.as_ref()?;
    match node.kind.as_str() {
        "text/vnd.graphviz" => match (data.node_count, data.edge_count) {
            (Some(nodes), Some(edges)) if nodes > 0 && edges > 0 => {
                Some(format!("{nodes} nodes · {edges} edges"))
            }
            _ => None,
        },
        "application/x-excalidraw+json" | "text/x-plantuml" => data
            .element_count
            .filter(|n| *n > 0)
            .map(|n| format!("{n} elements")),
        "text/x-mermaid" => data.diagram_type.clone().filter(|t| !t.is_empty()),
        _ => None,
    }
}

/// The demo's detail line: VML facts, diagram counts, the stored meta line,
/// then table shape, then counts, then media type and size.
#[must_use]
pub fn detail_line_for(node: &DemoNode) -> Option<String> {
    let data = node.data.as_ref();
    if node.kind == VML_KIND {
        let vml = data.and_then(|d| format_vml_line(d.width, d.height, d.fps, d.scene_count, d.duration_sec));
        if vml.is_some() {
            return vml;
        }
    }
    if let Some(line) = diagram_line(node) {
        return Some(line);
    }
    if let Some(meta) = data.and_then(|d| d.meta_line.clone()) {
        return Some(meta);
    }
    if let Some((rows, cols)) = data.and_then(|d| d.row_count.zip(d.column_count)) {
        return Some(format!("{rows} rows · {cols} cols"));
    }
    if let Some(tables) = data.and_then(|d| d.table_count) {
        return Some(format!("{tables} tables"));
    }
    if let Some(items) = data.and_then(|d| d.item_count) {
        return Some(format!("{items} items"));
    }

    let mut parts = vec![
        data.and_then(|d| d.media_type.clone())
            .unwrap_or_else(|| node.kind.clone()),
    ];
    parts.extend(data.and_then(|d| d.size_kb).map(|kb| format!("{kb} KB")));
    let line = parts.into_iter().filter(|p| !p.is_empty()).collect::<Vec<_>>().join(" · ");
    (!line.is_empty()).then_some(line)
}

fn kind(icon: &str) -> NodeTypeDefinition<DemoNodeData, DemoView> {
    NodeTypeDefinition::new(icon).detail_line_with(detail_line_for)
}

fn file(icon: &str) -> NodeTypeDefinition<DemoNodeData, DemoView> {
    kind(icon).file_content(GenericContent)
}

/// The registry the demo renders with.
#[must_use]
pub fn registry() -> DemoRegistry {
    NodeTypeRegistry::new(file("file")).register_all([
        ("application/x-root", kind("book-open")),
        ("application/x-folder", kind("folder")),
        ("application/x-detail", kind("link-2")),
        ("text/markdown", file("file-text")),
        ("application/pdf", file("file-text")),
        ("image/svg+xml", file("shapes")),
        ("application/x-sqlite3", file("database")),
        ("application/x-sqlite3-table", file("table-2")),
        ("application/json", file("braces")),
        ("application/x-vml+xml", file("clapperboard")),
        ("text/vnd.graphviz", file("git-fork")),
        ("text/x-mermaid", file("git-branch")),
        ("application/x-parquet", file("columns")),
        ("application/x-excalidraw+json", file("pen-tool")),
        ("text/x-plantuml", file("workflow")),
        ("text/csv", file("table-2")),
        (
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            file("table-2"),
        ),
        ("text/typescript", file("terminal")),
        ("application/zip", file("archive")),
        ("image/*", file("image")),
        ("audio/*", file("music-2")),
        ("video/*", file("square-play")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{corpus, corpus_node, detail_node, item, item_node, root_node};

    fn item_of(corpus_id: &str, item_id: &str) -> DemoNode {
        let corpus = corpus(corpus_id).unwrap();
        item_node(item(corpus_id, item_id).unwrap(), corpus)
    }

    #[test]
    fn icons_resolve_through_wildcards() {
        let r = registry();
        assert_eq!(r.icon_for("image/png"), "image");
        assert_eq!(r.icon_for("image/svg+xml"), "shapes");
        assert_eq!(r.icon_for("audio/wav"), "music-2");
        assert_eq!(r.icon_for("text/plain"), "file");
        assert_eq!(r.icon_for("application/x-folder"), "folder");
    }

    #[test]
    fn detail_lines_follow_the_demo_rules() {
        let r = registry();
        assert_eq!(
            r.detail_line_for(&item_of("c-diagrams", "service-map")).as_deref(),
            Some("5 nodes · 6 edges")
        );
        assert_eq!(
            r.detail_line_for(&item_of("c-diagrams", "ops-flow")).as_deref(),
            Some("Flowchart")
        );
        assert_eq!(
            r.detail_line_for(&item_of("c-media", "composition")).as_deref(),
            Some("1920×1080 · 30fps · 3 scenes · 0:45")
        );
        assert_eq!(r.detail_line_for(&root_node()).as_deref(), Some("4 corpora"));
        let docs = corpus("c-docs").unwrap();
        assert_eq!(r.detail_line_for(&corpus_node(docs)).as_deref(), Some("3 files · 498 KB"));
        let notes = item("c-docs", "notes").unwrap();
        assert_eq!(r.detail_line_for(&detail_node(notes)).as_deref(), Some("Evidence pack"));
    }

    #[test]
    fn bare_nodes_fall_back_to_kind_and_size() {
        let node = DemoNode::new("text/plain", "x").with_data(DemoNodeData {
            size_kb: Some(7),
            ..DemoNodeData::default()
        });
        assert_eq!(detail_line_for(&node).as_deref(), Some("text/plain · 7 KB"));
        let shaped = DemoNode::new("text/csv", "y").with_data(DemoNodeData {
            row_count: Some(2),
            column_count: Some(3),
            ..DemoNodeData::default()
        });
        assert_eq!(detail_line_for(&shaped).as_deref(), Some("2 rows · 3 cols"));
    }

    #[test]
    fn files_render_the_generic_preview() {
        let r = registry();
        let node = item_of("c-docs", "notes");
        let resolved = r.resolve_node(&node);
        let Some(DemoView::Content(view)) = resolved.render_content(&node, None) else {
            panic!("expected a content view");
        };
        assert_eq!(view.title, "Meeting Notes");
        assert_eq!(view.icon.as_deref(), Some("file"));
        assert_eq!(view.detail_line.as_deref(), Some("text/plain · 2 KB"));
        assert!(view.fields.contains(&("Size".to_owned(), "2 KB".to_owned())));
        assert_eq!(view.link.map(|l| l.href).as_deref(), Some("/samples/notes.txt"));
        assert!(r.resolve("application/x-folder").content.is_none());
    }

    #[test]
    fn list_renderers_summarize_with_the_registry() {
        let renderers = registry().to_renderers();
        let node = item_of("c-data", "stack-db");
        let view = renderers.render(&node, springstack::Slot::List).unwrap();
        assert_eq!(view.headline(), "[database] Stack Records (4 tables · 20 KB)");
    }
}
