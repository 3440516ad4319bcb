#![forbid(unsafe_code)]

//! Sample library: four corpora of files, and the node builders the demo
//! navigates with.
//!
//! Everything here is static so sessions and snapshots are reproducible.

use serde::{Deserialize, Serialize};
use springstack::{FileInfo, Node};

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

pub const ROOT_KIND: &str = "application/x-root";
pub const FOLDER_KIND: &str = "application/x-folder";
pub const DETAIL_KIND: &str = "application/x-detail";
pub const TABLE_KIND: &str = "application/x-sqlite3-table";
pub const SQLITE_KIND: &str = "application/x-sqlite3";
pub const PARQUET_KIND: &str = "application/x-parquet";
pub const VML_KIND: &str = "application/x-vml+xml";

pub type DemoNode = Node<DemoNodeData>;

// ---------------------------------------------------------------------------
// Corpora
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corpus {
    pub id: &'static str,
    pub name: &'static str,
    pub meta_line: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorpusItem {
    pub id: &'static str,
    pub title: &'static str,
    pub media_type: &'static str,
    pub size_kb: u64,
    pub url: Option<&'static str>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub duration_sec: Option<f64>,
    pub scene_count: Option<u32>,
    pub node_count: Option<u32>,
    pub edge_count: Option<u32>,
    pub element_count: Option<u32>,
    pub diagram_type: Option<&'static str>,
    pub page_count: Option<u32>,
    pub row_count: Option<u32>,
    pub column_count: Option<u32>,
    pub language: Option<&'static str>,
    pub line_count: Option<u32>,
    pub item_count: Option<u32>,
    pub table_count: Option<u32>,
    pub file_size: Option<u64>,
    pub compression_codec: Option<&'static str>,
}

const fn file(
    id: &'static str,
    title: &'static str,
    media_type: &'static str,
    size_kb: u64,
    url: &'static str,
) -> CorpusItem {
    CorpusItem {
        id,
        title,
        media_type,
        size_kb,
        url: Some(url),
        width: None,
        height: None,
        fps: None,
        duration_sec: None,
        scene_count: None,
        node_count: None,
        edge_count: None,
        element_count: None,
        diagram_type: None,
        page_count: None,
        row_count: None,
        column_count: None,
        language: None,
        line_count: None,
        item_count: None,
        table_count: None,
        file_size: None,
        compression_codec: None,
    }
}

pub const CORPORA: [Corpus; 4] = [
    Corpus {
        id: "c-docs",
        name: "Documents",
        meta_line: "3 files · 498 KB",
    },
    Corpus {
        id: "c-media",
        name: "Media",
        meta_line: "5 files · 2.8 MB",
    },
    Corpus {
        id: "c-data",
        name: "Data & Code",
        meta_line: "7 files · 177 KB",
    },
    Corpus {
        id: "c-diagrams",
        name: "Diagrams",
        meta_line: "4 files · 10 KB",
    },
];

const DOCS: [CorpusItem; 3] = [
    file("md-report", "Field Report", "text/markdown", 84, "/samples/report.md"),
    CorpusItem {
        page_count: Some(2),
        ..file("pdf-dossier", "Access Dossier", "application/pdf", 412, "/samples/dossier.pdf")
    },
    file("notes", "Meeting Notes", "text/plain", 2, "/samples/notes.txt"),
];

const MEDIA: [CorpusItem; 5] = [
    CorpusItem {
        width: Some(1024),
        height: Some(640),
        ..file(
            "blur-photo",
            "Photograph That Refuses to Focus",
            "image/png",
            1240,
            "/samples/blur.png",
        )
    },
    CorpusItem {
        duration_sec: Some(1.2),
        ..file("footsteps", "Footsteps with No Source", "audio/wav", 520, "/samples/footsteps.wav")
    },
    CorpusItem {
        duration_sec: Some(2.0),
        ..file("hallway-loop", "Looped Hallway", "video/mp4", 980, "/samples/hallway.mp4")
    },
    CorpusItem {
        width: Some(640),
        height: Some(480),
        ..file("glyph", "Vector Sigil", "image/svg+xml", 34, "/samples/sigil.svg")
    },
    CorpusItem {
        width: Some(1920),
        height: Some(1080),
        fps: Some(30),
        scene_count: Some(3),
        duration_sec: Some(45.0),
        ..file("composition", "Intro Sequence", VML_KIND, 8, "/samples/demo.vml")
    },
];

const DATA: [CorpusItem; 7] = [
    CorpusItem {
        row_count: Some(6),
        column_count: Some(3),
        ..file("crowd-log", "Crowd Log", "text/csv", 18, "/samples/log.csv")
    },
    CorpusItem {
        row_count: Some(5),
        column_count: Some(4),
        ..file(
            "roster-matrix",
            "Roster Matrix",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            45,
            "/samples/roster.xlsx",
        )
    },
    CorpusItem {
        item_count: Some(4),
        ..file("roster-json", "Roster Snapshot", "application/json", 3, "/samples/roster.json")
    },
    CorpusItem {
        language: Some("typescript"),
        line_count: Some(18),
        ..file("beacon-driver", "Beacon Driver", "text/typescript", 12, "/samples/beacon.ts")
    },
    CorpusItem {
        item_count: Some(3),
        ..file("asset-bundle", "Asset Bundle", "application/zip", 76, "/samples/assets.zip")
    },
    CorpusItem {
        table_count: Some(4),
        file_size: Some(20_480),
        ..file("stack-db", "Stack Records", SQLITE_KIND, 20, "/samples/stack.db")
    },
    CorpusItem {
        row_count: Some(50),
        column_count: Some(6),
        file_size: Some(2_765),
        compression_codec: Some("snappy"),
        ..file(
            "sensor-parquet",
            "Sensor Readings",
            PARQUET_KIND,
            3,
            "/samples/data/sensors.parquet",
        )
    },
];

const DIAGRAMS: [CorpusItem; 4] = [
    CorpusItem {
        node_count: Some(5),
        edge_count: Some(6),
        ..file(
            "service-map",
            "Service Map",
            "text/vnd.graphviz",
            2,
            "/samples/diagrams/network.dot",
        )
    },
    CorpusItem {
        element_count: Some(6),
        ..file(
            "handoff-flow",
            "Handoff Flow",
            "text/x-plantuml",
            3,
            "/samples/diagrams/sequence.puml",
        )
    },
    CorpusItem {
        element_count: Some(4),
        ..file(
            "scene-sketch",
            "Scene Sketch",
            "application/x-excalidraw+json",
            4,
            "/samples/diagrams/story.excalidraw.json",
        )
    },
    CorpusItem {
        diagram_type: Some("Flowchart"),
        line_count: Some(12),
        language: Some("mermaid"),
        ..file("ops-flow", "Ops Flow", "text/x-mermaid", 1, "/samples/diagrams/flow.mmd")
    },
];

/// Tables inside the sample SQLite database.
pub const STACK_DB_TABLES: [&str; 4] = ["nodes", "edges", "crumbs", "sessions"];

#[must_use]
pub fn corpus(id: &str) -> Option<&'static Corpus> {
    CORPORA.iter().find(|c| c.id == id)
}

#[must_use]
pub fn items(corpus_id: &str) -> &'static [CorpusItem] {
    match corpus_id {
        "c-docs" => &DOCS,
        "c-media" => &MEDIA,
        "c-data" => &DATA,
        "c-diagrams" => &DIAGRAMS,
        _ => &[],
    }
}

#[must_use]
pub fn item(corpus_id: &str, item_id: &str) -> Option<&'static CorpusItem> {
    items(corpus_id).iter().find(|i| i.id == item_id)
}

/// Tables an item exposes; empty for anything but the database.
#[must_use]
pub fn tables(item: &CorpusItem) -> &'static [&'static str] {
    if item.media_type == SQLITE_KIND {
        &STACK_DB_TABLES
    } else {
        &[]
    }
}

// ---------------------------------------------------------------------------
// Node data
// ---------------------------------------------------------------------------

/// Payload carried by every demo node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DemoNodeData {
    pub corpus_id: Option<String>,
    pub item_id: Option<String>,
    pub media_type: Option<String>,
    pub size_kb: Option<u64>,
    pub meta_line: Option<String>,
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub duration_sec: Option<f64>,
    pub scene_count: Option<u32>,
    pub node_count: Option<u32>,
    pub edge_count: Option<u32>,
    pub element_count: Option<u32>,
    pub diagram_type: Option<String>,
    pub page_count: Option<u32>,
    pub row_count: Option<u32>,
    pub column_count: Option<u32>,
    pub language: Option<String>,
    pub line_count: Option<u32>,
    pub item_count: Option<u32>,
    pub file_size: Option<u64>,
    pub compression_codec: Option<String>,
    pub table_count: Option<u32>,
    pub table_id: Option<String>,
    pub db_url: Option<String>,
}

impl FileInfo for DemoNodeData {
    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn size_kb(&self) -> Option<u64> {
        self.size_kb
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// `m:ss`, or `None` for a missing or non-positive duration.
#[must_use]
pub fn format_duration(duration_sec: Option<f64>) -> Option<String> {
    let secs = duration_sec.filter(|d| *d > 0.0)?.round() as u64;
    Some(format!("{}:{:02}", secs / 60, secs % 60))
}

/// `1920×1080 · 30fps · 3 scenes · 0:45`, skipping what is unknown.
#[must_use]
pub fn format_vml_line(
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    scene_count: Option<u32>,
    duration_sec: Option<f64>,
) -> Option<String> {
    let mut parts = Vec::new();
    if let (Some(w), Some(h)) = (width.filter(|w| *w > 0), height.filter(|h| *h > 0)) {
        parts.push(format!("{w}×{h}"));
    }
    if let Some(fps) = fps.filter(|f| *f > 0) {
        parts.push(format!("{fps}fps"));
    }
    if let Some(scenes) = scene_count.filter(|s| *s > 0) {
        parts.push(format!("{scenes} scenes"));
    }
    parts.extend(format_duration(duration_sec));
    (!parts.is_empty()).then(|| parts.join(" · "))
}

fn item_meta_line(item: &CorpusItem) -> Option<String> {
    if let Some(tables) = item.table_count.filter(|t| *t > 0) {
        return Some(format!("{tables} tables · {} KB", item.size_kb));
    }
    match item.media_type {
        PARQUET_KIND => Some(format!(
            "{} rows · {} cols",
            item.row_count.unwrap_or(0),
            item.column_count.unwrap_or(0)
        )),
        VML_KIND => format_vml_line(
            item.width,
            item.height,
            item.fps,
            item.scene_count,
            item.duration_sec,
        ),
        other => Some(format!("{other} · {} KB", item.size_kb)),
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

#[must_use]
pub fn root_node() -> DemoNode {
    Node::new(ROOT_KIND, "root")
        .with_title("Library")
        .with_data(DemoNodeData {
            meta_line: Some(format!("{} corpora", CORPORA.len())),
            ..DemoNodeData::default()
        })
}

#[must_use]
pub fn corpus_node(corpus: &Corpus) -> DemoNode {
    Node::new(FOLDER_KIND, corpus.id)
        .with_title(corpus.name)
        .with_data(DemoNodeData {
            corpus_id: Some(corpus.id.to_owned()),
            meta_line: Some(corpus.meta_line.to_owned()),
            ..DemoNodeData::default()
        })
}

#[must_use]
pub fn item_node(item: &CorpusItem, corpus: &Corpus) -> DemoNode {
    let owned = |s: Option<&str>| s.map(str::to_owned);
    Node::new(item.media_type, item.id)
        .with_title(item.title)
        .with_data(DemoNodeData {
            corpus_id: Some(corpus.id.to_owned()),
            item_id: Some(item.id.to_owned()),
            media_type: Some(item.media_type.to_owned()),
            size_kb: Some(item.size_kb),
            meta_line: item_meta_line(item),
            url: owned(item.url),
            width: item.width,
            height: item.height,
            fps: item.fps,
            duration_sec: item.duration_sec,
            scene_count: item.scene_count,
            node_count: item.node_count,
            edge_count: item.edge_count,
            element_count: item.element_count,
            diagram_type: owned(item.diagram_type),
            page_count: item.page_count,
            row_count: item.row_count,
            column_count: item.column_count,
            language: owned(item.language),
            line_count: item.line_count,
            item_count: item.item_count,
            file_size: item.file_size,
            compression_codec: owned(item.compression_codec),
            table_count: item.table_count,
            table_id: None,
            db_url: None,
        })
}

#[must_use]
pub fn detail_node(item: &CorpusItem) -> DemoNode {
    Node::new(DETAIL_KIND, format!("detail-{}", item.id))
        .with_title("Detail View")
        .with_data(DemoNodeData {
            item_id: Some(item.id.to_owned()),
            meta_line: Some("Evidence pack".to_owned()),
            ..DemoNodeData::default()
        })
}

#[must_use]
pub fn table_node(item: &CorpusItem, table_id: &str) -> DemoNode {
    Node::new(TABLE_KIND, format!("table-{}-{table_id}", item.id))
        .with_title(table_id)
        .with_data(DemoNodeData {
            item_id: Some(item.id.to_owned()),
            table_id: Some(table_id.to_owned()),
            db_url: item.url.map(str::to_owned),
            meta_line: Some("SQLite table".to_owned()),
            ..DemoNodeData::default()
        })
}

// ---------------------------------------------------------------------------
// Stack queries
// ---------------------------------------------------------------------------

/// The corpus the stack is inside, if any.
#[must_use]
pub fn current_corpus(stack: &[DemoNode]) -> Option<&'static Corpus> {
    stack
        .iter()
        .filter(|n| n.kind == FOLDER_KIND)
        .find_map(|n| n.data.as_ref()?.corpus_id.as_deref())
        .and_then(corpus)
}

/// The file the stack is inside, if any.
#[must_use]
pub fn current_item(stack: &[DemoNode]) -> Option<&'static CorpusItem> {
    let corpus = current_corpus(stack)?;
    stack
        .iter()
        .filter(|n| is_item_kind(&n.kind))
        .find_map(|n| n.data.as_ref()?.item_id.as_deref())
        .and_then(|id| item(corpus.id, id))
}

/// Whether `kind` is a file rather than one of the structural kinds.
#[must_use]
pub fn is_item_kind(kind: &str) -> bool {
    ![ROOT_KIND, FOLDER_KIND, DETAIL_KIND, TABLE_KIND].contains(&kind)
}
