#![forbid(unsafe_code)]

//! Routing: keeps the navigation stack and a location in sync.
//!
//! The adapter works against a [`History`] (the browser's history object in
//! a web binding, [`MemoryHistory`] elsewhere). Stack changes are written as
//! new entries when the user navigates and as replacements after jumps and
//! route application; location changes (back/forward, hash edits) become
//! queued drills that replay the parsed path.
//!
//! # Default codec
//!
//! Every node after the root becomes `/{kind}/{slug}--{id}`, both parts
//! percent-encoded; the slug is derived from the title. A root-only stack is
//! `/`. Parsing reads `kind/segment` pairs and takes the id after the first
//! `--` of each segment.
//!
//! # Invariants
//!
//! 1. Nothing is written while a route is being applied or a drill runs.
//! 2. A path equal to the last written (or observed) path is never written
//!    again.
//! 3. The write mode returns to push after every write.
//!
//! # Failure Modes
//!
//! - A location that does not parse (malformed encoding, no pairs) maps to
//!   the initial stack.
//! - Re-initializing with a guard key already seen is skipped when the
//!   parsed stack matches the current one.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use web_time::Instant;

use crate::controller::{DrillOrigin, NavController, OperationKind};
use crate::engine::EngineEvent;
use crate::node::{Node, describe_path, same_path};

/// Maximum slug length in the default codec.
pub const MAX_SLUG_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// What a drill does when a card on its path does not appear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCardPolicy {
    /// Stop the drill where it is.
    #[default]
    Abort,
    /// Push the node without a source card.
    Push,
    /// Keep waiting for the card.
    Wait,
}

impl MissingCardPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Push => "push",
            Self::Wait => "wait",
        }
    }
}

impl fmt::Display for MissingCardPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissingCardPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "push" => Ok(Self::Push),
            "wait" => Ok(Self::Wait),
            other => Err(format!("unknown missing-card policy `{other}`")),
        }
    }
}

/// How the next location write lands in the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    #[default]
    Push,
    Replace,
}

type ParseFn<D> = Rc<dyn Fn(&str) -> Option<Vec<Node<D>>>>;
type SerializeFn<D> = Rc<dyn Fn(&[Node<D>]) -> String>;

/// Routing options.
pub struct RoutingConfig<D> {
    pub enabled: bool,
    /// Keep the path in the fragment (`#/...`) instead of the pathname.
    pub use_hash: bool,
    pub base_path: Option<String>,
    /// Custom path parser; the default codec when `None`.
    pub parse: Option<ParseFn<D>>,
    /// Custom stack serializer; the default codec when `None`.
    pub serialize: Option<SerializeFn<D>>,
    pub wait_for_card_ms: u64,
    pub on_missing_card: MissingCardPolicy,
}

impl<D> Default for RoutingConfig<D> {
    fn default() -> Self {
        Self {
            enabled: true,
            use_hash: false,
            base_path: None,
            parse: None,
            serialize: None,
            wait_for_card_ms: 15_000,
            on_missing_card: MissingCardPolicy::Abort,
        }
    }
}

impl<D> Clone for RoutingConfig<D> {
    fn clone(&self) -> Self {
        Self {
            enabled: self.enabled,
            use_hash: self.use_hash,
            base_path: self.base_path.clone(),
            parse: self.parse.clone(),
            serialize: self.serialize.clone(),
            wait_for_card_ms: self.wait_for_card_ms,
            on_missing_card: self.on_missing_card,
        }
    }
}

impl<D> fmt::Debug for RoutingConfig<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingConfig")
            .field("enabled", &self.enabled)
            .field("use_hash", &self.use_hash)
            .field("base_path", &self.base_path)
            .field("parse", &self.parse.is_some())
            .field("serialize", &self.serialize.is_some())
            .field("wait_for_card_ms", &self.wait_for_card_ms)
            .field("on_missing_card", &self.on_missing_card)
            .finish()
    }
}

impl<D> RoutingConfig<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn use_hash(mut self, use_hash: bool) -> Self {
        self.use_hash = use_hash;
        self
    }

    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    #[must_use]
    pub fn parse(mut self, parse: impl Fn(&str) -> Option<Vec<Node<D>>> + 'static) -> Self {
        self.parse = Some(Rc::new(parse));
        self
    }

    #[must_use]
    pub fn serialize(mut self, serialize: impl Fn(&[Node<D>]) -> String + 'static) -> Self {
        self.serialize = Some(Rc::new(serialize));
        self
    }

    #[must_use]
    pub fn wait_for_card_ms(mut self, ms: u64) -> Self {
        self.wait_for_card_ms = ms;
        self
    }

    #[must_use]
    pub fn on_missing_card(mut self, policy: MissingCardPolicy) -> Self {
        self.on_missing_card = policy;
        self
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Default codec
// ---------------------------------------------------------------------------

/// Lowercase, runs of anything but `[a-z0-9]` collapsed to `-`, trimmed,
/// at most [`MAX_SLUG_LEN`] characters.
#[must_use]
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn format_segment<D>(node: &Node<D>) -> String {
    let slug = node.title.as_deref().map(slugify).unwrap_or_default();
    match (slug.is_empty(), node.id.is_empty()) {
        // A bare `--` reads back as the empty id.
        (_, true) => "--".to_owned(),
        (false, false) => format!("{slug}--{}", node.id),
        (true, false) if node.id.contains("--") => format!("--{}", node.id),
        (true, false) => node.id.clone(),
    }
}

/// Serialize every node after the root as `/{kind}/{slug}--{id}`.
#[must_use]
pub fn default_serialize<D>(stack: &[Node<D>]) -> String {
    let path: String = stack
        .iter()
        .skip(1)
        .map(|node| {
            format!(
                "/{}/{}",
                urlencoding::encode(&node.kind),
                urlencoding::encode(&format_segment(node))
            )
        })
        .collect();
    if path.is_empty() { "/".to_owned() } else { path }
}

/// Parse a path written by [`default_serialize`].
///
/// Query and fragment are ignored, as is a trailing unpaired segment.
/// Returns `None` when a component does not decode to UTF-8.
#[must_use]
pub fn default_parse<D>(path: &str) -> Option<Vec<Node<D>>> {
    let clean = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = clean.split('/').filter(|s| !s.is_empty()).collect();
    let mut nodes = Vec::with_capacity(segments.len() / 2);
    for pair in segments.chunks_exact(2) {
        let kind = urlencoding::decode(pair[0]).ok()?.into_owned();
        let segment = urlencoding::decode(pair[1]).ok()?.into_owned();
        let node = match segment.split_once("--") {
            Some(("", "")) => Node::new(kind, ""),
            Some((_, "")) => Node::new(kind, segment.clone()),
            Some(("", id)) => Node::new(kind, id),
            Some((slug, id)) => Node::new(kind, id).with_title(slug),
            None => Node::new(kind, segment.clone()),
        };
        nodes.push(node);
    }
    Some(nodes)
}

/// `""` for no base, otherwise `/base` without a trailing slash.
#[must_use]
pub fn normalize_base_path(base: Option<&str>) -> String {
    match base {
        None | Some("" | "/") => String::new(),
        Some(base) => {
            let mut out = if base.starts_with('/') {
                base.to_owned()
            } else {
                format!("/{base}")
            };
            if out.ends_with('/') {
                out.pop();
            }
            out
        }
    }
}

/// Remove a normalized base path from the front of `path`.
#[must_use]
pub fn strip_base_path(path: &str, base: &str) -> String {
    if base.is_empty() {
        return path.to_owned();
    }
    match path.strip_prefix(base) {
        Some("") => "/".to_owned(),
        Some(rest) if rest.starts_with('/') => rest.to_owned(),
        Some(rest) => format!("/{rest}"),
        None => path.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// A location: pathname, query and fragment (with its `#`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    /// Resolve `url` against `self` the way a browser resolves a relative
    /// URL: a bare fragment keeps the pathname and query.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Self {
        if url.starts_with('#') {
            return Self {
                hash: url.to_owned(),
                ..self.clone()
            };
        }
        let (rest, hash) = match url.find('#') {
            Some(at) => (&url[..at], url[at..].to_owned()),
            None => (url, String::new()),
        };
        let (pathname, search) = match rest.find('?') {
            Some(at) => (&rest[..at], rest[at..].to_owned()),
            None => (rest, String::new()),
        };
        Self {
            pathname: if pathname.is_empty() {
                self.pathname.clone()
            } else {
                pathname.to_owned()
            },
            search,
            hash,
        }
    }

    #[must_use]
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

/// The session history the adapter reads and writes.
pub trait History {
    fn location(&self) -> Location;

    /// Add an entry for `url`.
    fn push_state(&mut self, url: &str);

    /// Replace the current entry with `url`.
    fn replace_state(&mut self, url: &str);

    /// Set the fragment, adding an entry when it changes.
    fn set_hash(&mut self, hash: &str) {
        let hash = if hash.starts_with('#') {
            hash.to_owned()
        } else {
            format!("#{hash}")
        };
        if self.location().hash != hash {
            self.push_state(&hash);
        }
    }
}

/// In-memory session history with back and forward.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<Location>,
    index: usize,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryHistory {
    #[must_use]
    pub fn new(url: &str) -> Self {
        let start = Location {
            pathname: "/".to_owned(),
            ..Location::default()
        };
        Self {
            entries: vec![start.resolve(url)],
            index: 0,
        }
    }

    /// Step back one entry; `false` at the first entry.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Step forward one entry; `false` at the last entry.
    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Navigate to `url` as a user typing it would: a new entry.
    pub fn navigate(&mut self, url: &str) {
        self.push_state(url);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn entries(&self) -> &[Location] {
        &self.entries
    }

    fn current(&self) -> &Location {
        &self.entries[self.index]
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Location {
        self.current().clone()
    }

    fn push_state(&mut self, url: &str) {
        let next = self.current().resolve(url);
        self.entries.truncate(self.index + 1);
        self.entries.push(next);
        self.index = self.entries.len() - 1;
    }

    fn replace_state(&mut self, url: &str) {
        let next = self.current().resolve(url);
        self.entries[self.index] = next;
    }
}

// ---------------------------------------------------------------------------
// Init guard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    InFlight,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitRecord {
    pub status: InitStatus,
    pub at: Instant,
}

/// Remembers which routing setups have already initialized.
///
/// Share one guard between component instances that may mount the same
/// routing setup twice; the second initialization is skipped when it would
/// not change the stack.
#[derive(Debug, Clone, Default)]
pub struct RouteInitGuard {
    records: Rc<RefCell<AHashMap<String, InitRecord>>>,
}

impl RouteInitGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<InitRecord> {
        self.records.borrow().get(key).copied()
    }

    pub fn mark(&self, key: &str, status: InitStatus) {
        self.records.borrow_mut().insert(
            key.to_owned(),
            InitRecord {
                status,
                at: Instant::now(),
            },
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Two-way sync between a [`NavController`] and a [`History`].
pub struct RoutingAdapter<D, H> {
    config: RoutingConfig<D>,
    base_path: String,
    history: H,
    guard: RouteInitGuard,
    initial: Vec<Node<D>>,
    mode: UpdateMode,
    applying: bool,
    last_path: Option<String>,
    synced_version: Option<u64>,
}

impl<D, H: fmt::Debug> fmt::Debug for RoutingAdapter<D, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingAdapter")
            .field("config", &self.config)
            .field("history", &self.history)
            .field("mode", &self.mode)
            .field("applying", &self.applying)
            .field("last_path", &self.last_path)
            .finish_non_exhaustive()
    }
}

impl<D: Clone + 'static, H: History> RoutingAdapter<D, H> {
    #[must_use]
    pub fn new(
        config: RoutingConfig<D>,
        history: H,
        guard: RouteInitGuard,
        initial: Vec<Node<D>>,
    ) -> Self {
        let base_path = normalize_base_path(config.base_path.as_deref());
        Self {
            config,
            base_path,
            history,
            guard,
            initial,
            mode: UpdateMode::Push,
            applying: false,
            last_path: None,
            synced_version: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RoutingConfig<D> {
        &self.config
    }

    #[must_use]
    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    #[must_use]
    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    /// A route is being replayed.
    #[must_use]
    pub fn is_applying(&self) -> bool {
        self.applying
    }

    #[must_use]
    pub fn last_path(&self) -> Option<&str> {
        self.last_path.as_deref()
    }

    /// The path the current location represents.
    #[must_use]
    pub fn location_path(&self) -> String {
        let location = self.history.location();
        let path = if self.config.use_hash {
            location.hash.trim_start_matches('#').to_owned()
        } else {
            location.pathname
        };
        if path.is_empty() { "/".to_owned() } else { path }
    }

    /// Serialize `stack` and prefix the base path.
    #[must_use]
    pub fn serialize_stack(&self, stack: &[Node<D>]) -> String {
        let raw = match &self.config.serialize {
            Some(serialize) => serialize(stack),
            None => default_serialize(stack),
        };
        let prefixed = if self.base_path.is_empty() {
            raw
        } else if raw == "/" {
            self.base_path.clone()
        } else {
            format!("{}{raw}", self.base_path)
        };
        if prefixed.is_empty() { "/".to_owned() } else { prefixed }
    }

    /// Parse `path` into a full stack rooted at the initial root.
    #[must_use]
    pub fn parse_location(&self, path: &str) -> Vec<Node<D>> {
        let stripped = strip_base_path(path, &self.base_path);
        let parsed = match &self.config.parse {
            Some(parse) => parse(&stripped),
            None => default_parse(&stripped),
        };
        let Some(parsed) = parsed.filter(|p| !p.is_empty()) else {
            return self.initial.clone();
        };
        let Some(root) = self.initial.first() else {
            return parsed;
        };
        let skip = parsed
            .first()
            .is_some_and(|first| first.same_key(root) || first.kind == "root");
        std::iter::once(root.clone())
            .chain(parsed.into_iter().skip(usize::from(skip)))
            .collect()
    }

    fn guard_key(&self, path: &str) -> String {
        let root = self
            .initial
            .first()
            .map_or_else(|| "no-root".to_owned(), |r| format!("{}:{}", r.kind, r.id));
        let base = if self.base_path.is_empty() {
            "/"
        } else {
            self.base_path.as_str()
        };
        let mode = if self.config.use_hash { "hash" } else { "path" };
        format!("{mode}|{base}|{root}|{path}")
    }

    /// Read the initial location and replay it when it names a deeper stack.
    pub fn init(&mut self, controller: &NavController<D>) {
        if !self.config.enabled {
            return;
        }
        let path = self.location_path();
        self.last_path = Some(path.clone());
        let parsed = self.parse_location(&path);
        let key = self.guard_key(&path);
        debug!(target: "springstack.routing", path = %path, parsed = %describe_path(&parsed), "routing init");

        if let Some(existing) = self.guard.get(&key) {
            if controller.with_stack(|stack| same_path(&parsed, stack)) {
                debug!(target: "springstack.routing", key = %key, status = ?existing.status, "routing init skipped");
                return;
            }
        }
        self.guard.mark(&key, InitStatus::InFlight);
        if same_path(&parsed, &self.initial) {
            self.guard.mark(&key, InitStatus::Done);
            return;
        }
        self.applying = true;
        self.mode = UpdateMode::Replace;
        debug!(target: "springstack.routing", path = %describe_path(&parsed), "routing init drill");
        drop(controller.drill_to_route(parsed));
        self.guard.mark(&key, InitStatus::Done);
    }

    /// React to a back/forward or fragment change.
    pub fn handle_location_change(&mut self, controller: &NavController<D>) {
        if !self.config.enabled {
            return;
        }
        let path = self.location_path();
        let parsed = self.parse_location(&path);
        debug!(target: "springstack.routing", path = %path, parsed = %describe_path(&parsed), "location changed");
        self.last_path = Some(path);
        if controller.with_stack(|stack| same_path(&parsed, stack)) {
            return;
        }
        self.applying = true;
        self.mode = UpdateMode::Replace;
        drop(controller.drill_to_route(parsed));
    }

    /// The stack was replaced outside the queue; write the next path as a
    /// replacement.
    pub fn note_jump(&mut self) {
        self.mode = UpdateMode::Replace;
    }

    /// Feed an engine event.
    pub fn on_engine_event(&mut self, event: &EngineEvent, controller: &NavController<D>) {
        match event {
            EngineEvent::Started { kind, .. } if *kind != OperationKind::DrillTo => {
                self.applying = false;
                self.mode = UpdateMode::Push;
            }
            EngineEvent::Finished {
                kind: OperationKind::DrillTo,
                origin,
                ..
            } => {
                self.applying = false;
                self.synced_version = Some(controller.stack_version());
                match origin {
                    Some(DrillOrigin::User) => {
                        let path = controller.with_stack(|stack| self.serialize_stack(stack));
                        self.write(path, UpdateMode::Push);
                    }
                    _ => {
                        self.last_path = Some(self.location_path());
                    }
                }
            }
            _ => {}
        }
    }

    /// Write the stack if it changed since the last call.
    pub fn sync(&mut self, controller: &NavController<D>) {
        if !self.config.enabled {
            return;
        }
        let version = controller.stack_version();
        if self.synced_version == Some(version) {
            return;
        }
        if self.applying || controller.in_flight() == Some(OperationKind::DrillTo) {
            return;
        }
        self.synced_version = Some(version);
        let path = controller.with_stack(|stack| self.serialize_stack(stack));
        self.write(path, self.mode);
    }

    fn write(&mut self, path: String, mode: UpdateMode) {
        if self.last_path.as_deref() == Some(path.as_str()) {
            return;
        }
        debug!(target: "springstack.routing", path = %path, mode = ?mode, "location written");
        match (self.config.use_hash, mode) {
            (true, UpdateMode::Replace) => self.history.replace_state(&format!("#{path}")),
            (true, UpdateMode::Push) => self.history.set_hash(&path),
            (false, UpdateMode::Replace) => self.history.replace_state(&path),
            (false, UpdateMode::Push) => self.history.push_state(&path),
        }
        self.last_path = Some(path);
        self.mode = UpdateMode::Push;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(config: RoutingConfig<()>, url: &str) -> RoutingAdapter<(), MemoryHistory> {
        RoutingAdapter::new(
            config,
            MemoryHistory::new(url),
            RouteInitGuard::new(),
            vec![Node::new("root", "root")],
        )
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("Q3 -- Report (final)"), "q3-report-final");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(&"a".repeat(80)).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn serialize_skips_the_root_and_encodes() {
        let stack: Vec<Node> = vec![
            Node::new("root", "root"),
            Node::new("application/x-folder", "c-docs").with_title("Documents"),
            Node::new("text/markdown", "md-report"),
        ];
        assert_eq!(
            default_serialize(&stack),
            "/application%2Fx-folder/documents--c-docs/text%2Fmarkdown/md-report"
        );
        assert_eq!(default_serialize(&stack[..1]), "/");
    }

    #[test]
    fn parse_reads_pairs_and_ignores_query() {
        let nodes: Vec<Node> =
            default_parse("/application%2Fx-folder/documents--c-docs/text%2Fmarkdown/md-report?x=1#frag")
                .unwrap_or_default();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind, "application/x-folder");
        assert_eq!(nodes[0].id, "c-docs");
        assert_eq!(nodes[0].title.as_deref(), Some("documents"));
        assert_eq!(nodes[1].id, "md-report");
        assert_eq!(nodes[1].title, None);
        let trailing: Option<Vec<Node>> = default_parse("/a/b/c");
        assert_eq!(trailing.map(|n| n.len()), Some(1));
    }

    #[test]
    fn parse_rejects_invalid_utf8() {
        let nodes: Option<Vec<Node>> = default_parse("/kind/%FF%FE");
        assert!(nodes.is_none());
    }

    #[test]
    fn ids_with_double_dashes_survive() {
        let stack: Vec<Node> = vec![Node::new("root", "r"), Node::new("k", "a--b")];
        let parsed: Vec<Node> = default_parse(&default_serialize(&stack)).unwrap_or_default();
        assert_eq!(parsed[0].id, "a--b");
    }

    #[test]
    fn empty_ids_survive_with_or_without_a_title() {
        let stack: Vec<Node> = vec![
            Node::new("root", "r"),
            Node::new("k", ""),
            Node::new("k", "").with_title("Untitled"),
            Node::new("k", "--"),
        ];
        let path = default_serialize(&stack);
        assert_eq!(path, "/k/--/k/--/k/----");
        let parsed: Vec<Node> = default_parse(&path).unwrap_or_default();
        let ids: Vec<&str> = parsed.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["", "", "--"]);
    }

    #[test]
    fn base_path_normalization() {
        assert_eq!(normalize_base_path(None), "");
        assert_eq!(normalize_base_path(Some("/")), "");
        assert_eq!(normalize_base_path(Some("app/")), "/app");
        assert_eq!(strip_base_path("/app/x/y", "/app"), "/x/y");
        assert_eq!(strip_base_path("/app", "/app"), "/");
        assert_eq!(strip_base_path("/other", "/app"), "/other");
    }

    #[test]
    fn location_resolves_fragments_against_the_path() {
        let here = Location {
            pathname: "/app".into(),
            ..Location::default()
        };
        let next = here.resolve("#/folder/x");
        assert_eq!(next.pathname, "/app");
        assert_eq!(next.hash, "#/folder/x");
        let full = here.resolve("/a/b?q=1#h");
        assert_eq!(full.pathname, "/a/b");
        assert_eq!(full.search, "?q=1");
        assert_eq!(full.hash, "#h");
    }

    #[test]
    fn memory_history_back_and_forward() {
        let mut history = MemoryHistory::new("/");
        history.push_state("/a");
        history.push_state("/b");
        assert!(history.back());
        assert_eq!(history.location().pathname, "/a");
        history.push_state("/c");
        assert!(!history.forward());
        assert_eq!(history.len(), 3);
        assert_eq!(history.location().pathname, "/c");
    }

    #[test]
    fn parse_location_prefixes_the_root() {
        let a = adapter(RoutingConfig::new().base_path("/app"), "/");
        let stack = a.parse_location("/app/folder/x");
        assert_eq!(stack.len(), 2);
        assert_eq!(stack[0].id, "root");
        assert_eq!(stack[1].id, "x");
        assert_eq!(a.parse_location("/app").len(), 1);
        assert_eq!(a.parse_location("/app/root/root/folder/x").len(), 2);
    }

    #[test]
    fn serialize_stack_prefixes_the_base() {
        let a = adapter(RoutingConfig::new().base_path("app"), "/");
        let root: Vec<Node> = vec![Node::new("root", "root")];
        assert_eq!(a.serialize_stack(&root), "/app");
        let deeper = vec![Node::new("root", "root"), Node::new("f", "x")];
        assert_eq!(a.serialize_stack(&deeper), "/app/f/x");
    }

    #[test]
    fn hash_mode_reads_the_fragment() {
        let a = adapter(RoutingConfig::new().use_hash(true), "/index.html#/f/x");
        assert_eq!(a.location_path(), "/f/x");
        let b = adapter(RoutingConfig::new().use_hash(true), "/index.html");
        assert_eq!(b.location_path(), "/");
    }

    #[test]
    fn init_guard_skips_a_repeated_init() {
        let guard = RouteInitGuard::new();
        let controller: NavController<()> = match NavController::new(vec![Node::new("root", "root")]) {
            Ok(c) => c,
            Err(e) => panic!("{e}"),
        };
        let mut first = RoutingAdapter::new(
            RoutingConfig::new(),
            MemoryHistory::new("/"),
            guard.clone(),
            vec![Node::new("root", "root")],
        );
        first.init(&controller);
        assert_eq!(guard.get("path|/|root:root|/").map(|r| r.status), Some(InitStatus::Done));

        let mut second = RoutingAdapter::new(
            RoutingConfig::new(),
            MemoryHistory::new("/"),
            guard.clone(),
            vec![Node::new("root", "root")],
        );
        second.init(&controller);
        assert_eq!(guard.len(), 1);
        assert!(controller.is_idle());
    }

    #[test]
    fn init_with_a_deep_location_queues_a_route_drill() {
        let controller: NavController<()> = match NavController::new(vec![Node::new("root", "root")]) {
            Ok(c) => c,
            Err(e) => panic!("{e}"),
        };
        let mut a = adapter(RoutingConfig::new(), "/folder/x");
        a.init(&controller);
        assert!(a.is_applying());
        assert_eq!(a.mode(), UpdateMode::Replace);
        assert_eq!(controller.queue_len(), 1);
        assert!(controller.drill_pending());
    }

    #[test]
    fn disabled_routing_does_nothing() {
        let controller: NavController<()> = match NavController::new(vec![Node::new("root", "root")]) {
            Ok(c) => c,
            Err(e) => panic!("{e}"),
        };
        let mut a = adapter(RoutingConfig::disabled(), "/folder/x");
        a.init(&controller);
        controller.set_stack(vec![Node::new("root", "root"), Node::new("f", "y")]);
        a.sync(&controller);
        assert!(controller.is_idle());
        assert_eq!(a.history().len(), 1);
    }

    #[test]
    fn sync_writes_push_then_replace_after_a_jump() {
        let controller: NavController<()> = match NavController::new(vec![Node::new("root", "root")]) {
            Ok(c) => c,
            Err(e) => panic!("{e}"),
        };
        let mut a = adapter(RoutingConfig::new(), "/");
        a.init(&controller);
        a.sync(&controller);
        assert_eq!(a.history().len(), 1);

        controller.commit_stack(vec![Node::new("root", "root"), Node::new("f", "x")]);
        a.sync(&controller);
        assert_eq!(a.history().len(), 2);
        assert_eq!(a.history().location().pathname, "/f/x");

        controller.set_stack(vec![Node::new("root", "root"), Node::new("f", "y")]);
        a.note_jump();
        a.sync(&controller);
        assert_eq!(a.history().len(), 2);
        assert_eq!(a.history().location().pathname, "/f/y");
        assert_eq!(a.mode(), UpdateMode::Push);
    }
}
