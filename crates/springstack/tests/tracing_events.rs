#![forbid(unsafe_code)]

//! Structured log events emitted by the queue, the engine and the routing
//! adapter.
//!
//! Run:
//!   cargo test -p springstack --test tracing_events

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use springstack::{
    HeadlessScene, MemoryHistory, Node, NodeKey, RouteInitGuard, RoutingConfig, Springstack,
    TimingMode,
};
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Capture layer
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    target: String,
    message: String,
    fields: HashMap<String, String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let mut fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.remove("message").unwrap_or_default();
        self.events.lock().unwrap().push(CapturedEvent {
            target: event.metadata().target().to_string(),
            message,
            fields,
        });
    }
}

fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedEvent>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: Arc::clone(&events),
    });
    let result = tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    (result, captured)
}

// ============================================================================
// Fixtures
// ============================================================================

const FRAME: Duration = Duration::from_millis(16);

fn catalog(panel: &NodeKey) -> Vec<NodeKey> {
    match panel.id.as_str() {
        "root" => vec![NodeKey::new("folder", "a")],
        _ => Vec::new(),
    }
}

fn path() -> Vec<Node> {
    vec![Node::new("root", "root"), Node::new("folder", "a")]
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn duplicate_drill_is_logged_as_skipped() {
    let (_, events) = capture(|| {
        let mut stack: Springstack<(), HeadlessScene> = Springstack::builder(vec![Node::new("root", "root")])
            .timing_mode(TimingMode::Off)
            .build(HeadlessScene::new(catalog))
            .unwrap();
        stack.drill_to(path());
        stack.drill_to(path());
        stack.settle(FRAME, 500);
    });

    let skipped: Vec<&CapturedEvent> = events
        .iter()
        .filter(|e| e.target == "springstack.queue" && e.message == "operation skipped")
        .collect();
    assert_eq!(skipped.len(), 1, "{events:#?}");
    assert_eq!(skipped[0].fields.get("op").map(String::as_str), Some("drillTo"));
    assert_eq!(
        skipped[0].fields.get("reason").map(String::as_str),
        Some("queued-duplicate")
    );
}

#[test]
fn operations_log_start_and_finish() {
    let (_, events) = capture(|| {
        let mut stack: Springstack<(), HeadlessScene> = Springstack::builder(vec![Node::new("root", "root")])
            .timing_mode(TimingMode::Off)
            .build(HeadlessScene::new(catalog))
            .unwrap();
        stack.push(Node::new("folder", "a"), None);
        stack.settle(FRAME, 500);
    });

    let engine: Vec<&str> = events
        .iter()
        .filter(|e| e.target == "springstack.engine")
        .map(|e| e.message.as_str())
        .collect();
    let started = engine.iter().position(|m| *m == "operation started");
    let finished = engine.iter().position(|m| *m == "operation finished");
    assert!(started.is_some() && finished.is_some(), "{engine:?}");
    assert!(started < finished);
}

#[test]
fn repeated_init_on_a_rebuilt_stack_is_skipped() {
    let guard = RouteInitGuard::new();
    let (_, events) = capture(|| {
        let mut first: Springstack<(), HeadlessScene, MemoryHistory> =
            Springstack::builder(vec![Node::new("root", "root")])
                .timing_mode(TimingMode::Off)
                .routing(RoutingConfig::new(), MemoryHistory::new("/folder/a"), guard.clone())
                .build(HeadlessScene::new(catalog))
                .unwrap();
        first.settle(FRAME, 500);

        let _second: Springstack<(), HeadlessScene, MemoryHistory> = Springstack::builder(path())
            .timing_mode(TimingMode::Off)
            .routing(RoutingConfig::new(), MemoryHistory::new("/folder/a"), guard.clone())
            .build(HeadlessScene::new(catalog))
            .unwrap();
    });

    let routing: Vec<&str> = events
        .iter()
        .filter(|e| e.target == "springstack.routing")
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(routing.iter().filter(|m| **m == "routing init drill").count(), 1, "{routing:?}");
    assert_eq!(routing.iter().filter(|m| **m == "routing init skipped").count(), 1, "{routing:?}");
}
