#![forbid(unsafe_code)]

//! Routing adapter driven through the full component: user navigation adds
//! history entries, jumps replace them, and location changes replay as
//! drills.
//!
//! Run:
//!   cargo test -p springstack --test routing_integration

use std::time::Duration;

use springstack::{
    HeadlessScene, History, MemoryHistory, Node, NodeKey, RouteInitGuard, RoutingConfig,
    Springstack, TimingMode,
};

const FRAME: Duration = Duration::from_millis(16);

type Routed = Springstack<(), HeadlessScene, MemoryHistory>;

fn key(kind: &str, id: &str) -> NodeKey {
    NodeKey::new(kind, id)
}

fn node(kind: &str, id: &str) -> Node {
    Node::new(kind, id)
}

fn root() -> Node {
    node("root", "root")
}

fn catalog(panel: &NodeKey) -> Vec<NodeKey> {
    match panel.id.as_str() {
        "root" => vec![key("folder", "a"), key("folder", "b")],
        "a" => vec![key("folder", "c")],
        _ => Vec::new(),
    }
}

fn routed(config: RoutingConfig<()>, url: &str, guard: RouteInitGuard) -> Routed {
    Springstack::builder(vec![root()])
        .timing_mode(TimingMode::Reduced)
        .routing(config, MemoryHistory::new(url), guard)
        .build(HeadlessScene::new(catalog))
        .unwrap()
}

fn ids(stack: &Routed) -> Vec<String> {
    stack.stack().iter().map(|n| n.id.clone()).collect()
}

fn history(stack: &Routed) -> &MemoryHistory {
    stack.history().unwrap()
}

fn pathname(stack: &Routed) -> String {
    history(stack).location().pathname
}

#[test]
fn user_navigation_pushes_history_entries() {
    let mut stack = routed(RoutingConfig::new(), "/", RouteInitGuard::new());
    stack.settle(FRAME, 100);
    assert_eq!(history(&stack).len(), 1);

    stack.push(node("folder", "a"), Some(key("folder", "a")));
    stack.settle(FRAME, 1_000);
    assert_eq!(pathname(&stack), "/folder/a");

    stack.push(node("folder", "c"), Some(key("folder", "c")));
    stack.settle(FRAME, 1_000);
    assert_eq!(pathname(&stack), "/folder/a/folder/c");
    assert_eq!(history(&stack).len(), 3);

    stack.pop();
    stack.settle(FRAME, 1_000);
    assert_eq!(pathname(&stack), "/folder/a");
    assert_eq!(history(&stack).len(), 4);
}

#[test]
fn user_drill_writes_one_entry_when_it_finishes() {
    let mut stack = routed(RoutingConfig::new(), "/", RouteInitGuard::new());
    stack.drill_to(vec![root(), node("folder", "a"), node("folder", "c")]);
    stack.settle(FRAME, 2_000);

    assert_eq!(ids(&stack), vec!["root", "a", "c"]);
    assert_eq!(history(&stack).len(), 2);
    assert_eq!(pathname(&stack), "/folder/a/folder/c");
}

#[test]
fn set_stack_replaces_the_current_entry() {
    let mut stack = routed(RoutingConfig::new(), "/", RouteInitGuard::new());
    stack.push(node("folder", "a"), None);
    stack.settle(FRAME, 1_000);
    assert_eq!(history(&stack).len(), 2);

    stack.set_stack(vec![root(), node("folder", "b")]);
    stack.settle(FRAME, 1_000);
    assert_eq!(history(&stack).len(), 2);
    assert_eq!(pathname(&stack), "/folder/b");
}

#[test]
fn back_replays_the_previous_location_as_a_drill() {
    let mut stack = routed(RoutingConfig::new(), "/", RouteInitGuard::new());
    stack.push(node("folder", "a"), Some(key("folder", "a")));
    stack.settle(FRAME, 1_000);
    stack.push(node("folder", "c"), Some(key("folder", "c")));
    stack.settle(FRAME, 1_000);
    assert_eq!(history(&stack).len(), 3);

    assert!(stack.history_mut().unwrap().back());
    stack.handle_location_change();
    stack.settle(FRAME, 2_000);

    assert_eq!(ids(&stack), vec!["root", "a"]);
    assert_eq!(history(&stack).len(), 3);
    assert_eq!(history(&stack).index(), 1);
    assert_eq!(pathname(&stack), "/folder/a");

    assert!(stack.history_mut().unwrap().forward());
    stack.handle_location_change();
    stack.settle(FRAME, 2_000);
    assert_eq!(ids(&stack), vec!["root", "a", "c"]);
    assert_eq!(history(&stack).len(), 3);
}

#[test]
fn a_deep_initial_location_is_rebuilt_without_new_entries() {
    let mut stack = routed(
        RoutingConfig::new(),
        "/folder/a/folder/c",
        RouteInitGuard::new(),
    );
    assert!(stack.routing().unwrap().is_applying());
    stack.settle(FRAME, 2_000);

    assert_eq!(ids(&stack), vec!["root", "a", "c"]);
    assert_eq!(history(&stack).len(), 1);
    assert!(!stack.routing().unwrap().is_applying());
    assert_eq!(stack.routing().unwrap().last_path(), Some("/folder/a/folder/c"));
}

#[test]
fn hash_mode_writes_the_fragment() {
    let mut stack = routed(
        RoutingConfig::new().use_hash(true),
        "/index.html",
        RouteInitGuard::new(),
    );
    stack.push(node("folder", "a"), None);
    stack.settle(FRAME, 1_000);

    let location = history(&stack).location();
    assert_eq!(location.pathname, "/index.html");
    assert_eq!(location.hash, "#/folder/a");
    assert_eq!(history(&stack).len(), 2);
}

#[test]
fn base_path_prefixes_written_locations() {
    let mut stack = routed(
        RoutingConfig::new().base_path("/app"),
        "/app",
        RouteInitGuard::new(),
    );
    stack.push(node("folder", "a"), None);
    stack.settle(FRAME, 1_000);
    assert_eq!(pathname(&stack), "/app/folder/a");
}

#[test]
fn disabled_routing_leaves_history_alone() {
    let mut stack = routed(RoutingConfig::disabled(), "/folder/a", RouteInitGuard::new());
    stack.push(node("folder", "b"), None);
    stack.settle(FRAME, 1_000);
    assert_eq!(ids(&stack), vec!["root", "b"]);
    assert_eq!(history(&stack).len(), 1);
    assert_eq!(pathname(&stack), "/folder/a");
}

#[test]
fn a_shared_guard_records_one_entry_per_location() {
    let guard = RouteInitGuard::new();
    let mut first = routed(RoutingConfig::new(), "/folder/a", guard.clone());
    first.settle(FRAME, 2_000);
    let mut second = routed(RoutingConfig::new(), "/folder/a", guard.clone());
    second.settle(FRAME, 2_000);

    assert_eq!(guard.len(), 1);
    assert_eq!(ids(&first), vec!["root", "a"]);
    assert_eq!(ids(&second), vec!["root", "a"]);
}
