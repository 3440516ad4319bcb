#![no_main]

use libfuzzer_sys::fuzz_target;
use springstack::{Node, default_parse, default_serialize, slugify};
use springstack_demo::routes::{parse_path, stack_to_path};

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };

    // Default codec: whatever parses must serialize and parse back to the
    // same keys.
    if let Some(stack) = default_parse::<()>(path) {
        let mut rooted = vec![Node::new("root", "root")];
        rooted.extend(stack.iter().cloned());
        let written = default_serialize(&rooted);
        let again: Vec<Node> = default_parse(&written).unwrap_or_default();
        let keys = |s: &[Node]| s.iter().map(Node::key).collect::<Vec<_>>();
        assert_eq!(keys(&stack), keys(&again), "path {path:?} wrote {written:?}");
    }

    // Demo codec: a parsed stack is rooted and writes a path that parses to
    // the same stack.
    if let Some(stack) = parse_path(path) {
        assert!(!stack.is_empty());
        let written = stack_to_path(&stack);
        let again = parse_path(&written).expect("written path parses");
        assert_eq!(
            stack.iter().map(|n| n.key()).collect::<Vec<_>>(),
            again.iter().map(|n| n.key()).collect::<Vec<_>>()
        );
    }

    let slug = slugify(path);
    assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    assert!(!slug.starts_with('-') && !slug.ends_with('-'));
});
