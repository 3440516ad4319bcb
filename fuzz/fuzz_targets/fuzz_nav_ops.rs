#![no_main]

use std::collections::HashSet;
use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use springstack::{HeadlessScene, Node, NodeKey, Springstack, TimingMode};

#[derive(Debug, Arbitrary)]
enum Op {
    Push(u8),
    Pop,
    PopTo(u8),
    Drill(Vec<u8>),
    SetStack(Vec<u8>),
    Tick(u8),
}

fn node(id: u8) -> Node {
    Node::new("item", format!("n{}", id % 8))
}

fn catalog(_panel: &NodeKey) -> Vec<NodeKey> {
    (0..8).map(|i| NodeKey::new("item", format!("n{i}"))).collect()
}

fn path(ids: &[u8]) -> Vec<Node> {
    let mut seen = HashSet::new();
    std::iter::once(Node::new("root", "root"))
        .chain(ids.iter().take(6).map(|id| node(*id)).filter(|n| seen.insert(n.id.clone())))
        .collect()
}

fuzz_target!(|ops: Vec<Op>| {
    let Ok(mut stack) = Springstack::builder(vec![Node::<()>::new("root", "root")])
        .timing_mode(TimingMode::Reduced)
        .build(HeadlessScene::new(catalog))
    else {
        return;
    };

    for op in ops.into_iter().take(64) {
        match op {
            Op::Push(id) => {
                let _ = stack.push(node(id), None);
            }
            Op::Pop => {
                let _ = stack.pop();
            }
            Op::PopTo(index) => {
                let _ = stack.pop_to(usize::from(index % 8));
            }
            Op::Drill(ids) => {
                let _ = stack.drill_to(path(&ids));
            }
            Op::SetStack(ids) => stack.set_stack(path(&ids)),
            Op::Tick(ms) => {
                stack.tick(Duration::from_millis(u64::from(ms)));
            }
        }

        let nodes = stack.stack();
        assert!(!nodes.is_empty());
        assert!(stack.controller().active_depth() < nodes.len());
        let keys: HashSet<NodeKey> = nodes.iter().map(Node::key).collect();
        assert_eq!(keys.len(), nodes.len(), "duplicate key in {nodes:?}");
    }

    stack.settle(Duration::from_millis(16), 10_000);
    assert!(stack.is_idle());
});
