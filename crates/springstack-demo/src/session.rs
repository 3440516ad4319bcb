#![forbid(unsafe_code)]

//! A scripted headless session through the sample library.
//!
//! The script opens the first card three times, pops back to the library,
//! follows a deep link and then presses back. Each step records the trail
//! of crumbs and the address bar after the stack settles.

use std::time::Duration;

use serde::Serialize;
use springstack::{
    BuildError, HeadlessScene, History, MemoryHistory, MissingCardPolicy, RouteInitGuard,
    Slot, Springstack, TimingMode,
};
use tracing::{info, warn};

use crate::catalog;
use crate::data::{self, DemoNode, DemoNodeData, root_node};
use crate::node_types::{self, DemoRegistry};
use crate::routes;

/// The deep link the script follows: the second media file.
const DEEP_LINK_CORPUS: &str = "c-media";
const DEEP_LINK_ITEM: usize = 1;

/// Frames a step may take before it is reported as unsettled.
const MAX_FRAMES: usize = 2_000;

type DemoStack = Springstack<DemoNodeData, HeadlessScene, MemoryHistory>;

/// How to run the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub timing: TimingMode,
    /// Address the session starts at.
    pub url: String,
    pub use_hash: bool,
    pub base_path: Option<String>,
    pub missing_card: MissingCardPolicy,
    pub fps: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timing: TimingMode::Normal,
            url: "/".to_owned(),
            use_hash: false,
            base_path: None,
            missing_card: MissingCardPolicy::Abort,
            fps: 60,
        }
    }
}

impl SessionOptions {
    fn frame(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

/// The state after one scripted step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub label: String,
    /// One headline per crumb, root first.
    pub trail: Vec<String>,
    /// The address bar.
    pub location: String,
    pub frames: usize,
    pub settled: bool,
}

struct Session {
    stack: DemoStack,
    registry: DemoRegistry,
    frame: Duration,
    steps: Vec<Step>,
}

impl Session {
    fn new(options: &SessionOptions) -> Result<Self, BuildError> {
        let mut routing = routes::routing_config()
            .use_hash(options.use_hash)
            .on_missing_card(options.missing_card);
        if let Some(base) = &options.base_path {
            routing = routing.base_path(base.clone());
        }
        let stack = Springstack::builder(vec![root_node()])
            .timing_mode(options.timing)
            .routing(routing, MemoryHistory::new(&options.url), RouteInitGuard::new())
            .build(catalog::scene())?;
        Ok(Self {
            stack,
            registry: node_types::registry(),
            frame: options.frame(),
            steps: Vec::new(),
        })
    }

    fn settle(&mut self, label: &str) {
        let frames = self.stack.settle(self.frame, MAX_FRAMES);
        let settled = self.stack.is_idle();
        if !settled {
            warn!(target: "springstack.demo", step = label, frames, "step did not settle");
        }

        let renderers = self.registry.to_renderers();
        let trail = self
            .stack
            .stack()
            .iter()
            .filter_map(|node| renderers.render(node, Slot::Crumb))
            .map(|view| view.headline())
            .collect();
        let location = self
            .stack
            .history()
            .map(|h| h.location().href())
            .unwrap_or_default();
        info!(target: "springstack.demo", step = label, location = %location, frames, "step settled");
        self.steps.push(Step {
            label: label.to_owned(),
            trail,
            location,
            frames,
            settled,
        });
    }

    /// Open the first card of the top panel; `false` when it has none.
    fn open_first(&mut self) -> bool {
        let stack = self.stack.stack();
        let Some(top) = stack.last() else {
            return false;
        };
        let Some(card) = catalog::children(&top.key()).into_iter().next() else {
            return false;
        };
        let Some(node) = catalog::open(&stack, &card) else {
            return false;
        };
        let label = format!("open {}", node.label());
        let _ = self.stack.push(node, Some(card));
        self.settle(&label);
        true
    }

    fn deep_link(&self) -> Option<String> {
        let corpus = data::corpus(DEEP_LINK_CORPUS)?;
        let item = data::items(corpus.id).get(DEEP_LINK_ITEM)?;
        let path: Vec<DemoNode> = vec![
            root_node(),
            data::corpus_node(corpus),
            data::item_node(item, corpus),
        ];
        let serialized = self.stack.routing()?.serialize_stack(&path);
        Some(serialized)
    }

    fn navigate(&mut self, label: &str, url: &str) {
        if let Some(history) = self.stack.history_mut() {
            history.navigate(url);
        }
        self.stack.handle_location_change();
        self.settle(label);
    }

    fn back(&mut self) {
        let moved = self.stack.history_mut().is_some_and(MemoryHistory::back);
        if moved {
            self.stack.handle_location_change();
        }
        self.settle("back");
    }
}

/// Run the scripted session and return every step, starting with the
/// mounted state.
pub fn run(options: &SessionOptions) -> Result<Vec<Step>, BuildError> {
    let mut session = Session::new(options)?;
    session.settle("mount");

    for _ in 0..3 {
        if !session.open_first() {
            break;
        }
    }

    let _ = session.stack.pop_to(0);
    session.settle("back to library");

    if let Some(url) = session.deep_link() {
        let url = if options.use_hash { format!("#{url}") } else { url };
        session.navigate("deep link", &url);
    }

    session.back();
    Ok(session.steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn off() -> SessionOptions {
        SessionOptions {
            timing: TimingMode::Off,
            ..SessionOptions::default()
        }
    }

    #[test]
    fn frame_length_follows_fps() {
        let options = SessionOptions {
            fps: 50,
            ..SessionOptions::default()
        };
        assert_eq!(options.frame(), Duration::from_millis(20));
        let zero = SessionOptions {
            fps: 0,
            ..SessionOptions::default()
        };
        assert_eq!(zero.frame(), Duration::from_secs(1));
    }

    #[test]
    fn script_visits_the_expected_labels() {
        let steps = run(&off()).unwrap();
        let labels: Vec<&str> = steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "mount",
                "open Documents",
                "open Field Report",
                "open Detail View",
                "back to library",
                "deep link",
                "back",
            ]
        );
        assert!(steps.iter().all(|s| s.settled), "{steps:#?}");
    }
}
