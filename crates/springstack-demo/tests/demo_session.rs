#![forbid(unsafe_code)]

//! End-to-end runs of the scripted demo session.
//!
//! Run:
//!   cargo test -p springstack-demo --test demo_session

use springstack::{MissingCardPolicy, TimingMode};
use springstack_demo::session::{SessionOptions, Step, run};

fn options() -> SessionOptions {
    SessionOptions {
        timing: TimingMode::Off,
        ..SessionOptions::default()
    }
}

fn step<'a>(steps: &'a [Step], label: &str) -> &'a Step {
    steps
        .iter()
        .find(|s| s.label == label)
        .unwrap_or_else(|| panic!("no step {label}: {steps:#?}"))
}

// ── Path routing ─────────────────────────────────────────────────────────

#[test]
fn drilling_writes_demo_urls() {
    let steps = run(&options()).unwrap();
    assert_eq!(step(&steps, "mount").location, "/");
    assert_eq!(step(&steps, "open Documents").location, "/corpus/documents--c-docs");
    assert_eq!(
        step(&steps, "open Field Report").location,
        "/corpus/documents--c-docs/item/text%2Fmarkdown/md-report"
    );
    assert_eq!(
        step(&steps, "open Detail View").location,
        "/corpus/documents--c-docs/item/text%2Fmarkdown/md-report/detail"
    );
    assert_eq!(step(&steps, "back to library").location, "/");
}

#[test]
fn deep_link_and_back_replay_through_the_router() {
    let steps = run(&options()).unwrap();
    let deep = step(&steps, "deep link");
    assert_eq!(deep.location, "/corpus/media--c-media/item/audio%2Fwav/footsteps");
    assert_eq!(deep.trail.len(), 3);
    assert!(deep.trail[2].contains("Footsteps with No Source"), "{:?}", deep.trail);

    let back = step(&steps, "back");
    assert_eq!(back.location, "/");
    assert_eq!(back.trail, vec!["[book-open] Library (4 corpora)".to_owned()]);
}

#[test]
fn trail_uses_registry_icons_and_detail_lines() {
    let steps = run(&options()).unwrap();
    let detail = step(&steps, "open Detail View");
    assert_eq!(
        detail.trail,
        vec![
            "[book-open] Library (4 corpora)".to_owned(),
            "[folder] Documents (3 files · 498 KB)".to_owned(),
            "[file-text] Field Report (text/markdown · 84 KB)".to_owned(),
            "[link-2] Detail View (Evidence pack)".to_owned(),
        ]
    );
}

// ── Starting addresses ───────────────────────────────────────────────────

#[test]
fn starting_at_a_deep_link_mounts_the_full_path() {
    let steps = run(&SessionOptions {
        url: "/corpus/data-code--c-data/item/application%2Fx-sqlite3/stack-db/table/edges".to_owned(),
        ..options()
    })
    .unwrap();
    let mount = step(&steps, "mount");
    assert_eq!(mount.trail.len(), 4, "{:?}", mount.trail);
    assert!(mount.trail[3].starts_with("[table-2] edges"));
    assert_eq!(
        mount.location,
        "/corpus/data-code--c-data/item/application%2Fx-sqlite3/stack-db/table/edges"
    );
}

#[test]
fn unknown_start_address_stays_at_the_library() {
    let steps = run(&SessionOptions {
        url: "/corpus/nowhere--c-none".to_owned(),
        ..options()
    })
    .unwrap();
    assert_eq!(step(&steps, "mount").trail.len(), 1);
}

#[test]
fn hash_mode_keeps_the_route_in_the_fragment() {
    let steps = run(&SessionOptions {
        use_hash: true,
        ..options()
    })
    .unwrap();
    assert_eq!(step(&steps, "open Documents").location, "/#/corpus/documents--c-docs");
    assert_eq!(
        step(&steps, "deep link").location,
        "/#/corpus/media--c-media/item/audio%2Fwav/footsteps"
    );
}

#[test]
fn base_path_prefixes_every_location() {
    let steps = run(&SessionOptions {
        base_path: Some("/demo".to_owned()),
        url: "/demo".to_owned(),
        missing_card: MissingCardPolicy::Push,
        ..options()
    })
    .unwrap();
    assert_eq!(step(&steps, "open Documents").location, "/demo/corpus/documents--c-docs");
    assert_eq!(step(&steps, "back to library").location, "/demo");
}

#[test]
fn animated_runs_settle_within_the_frame_budget() {
    let steps = run(&SessionOptions {
        timing: TimingMode::Reduced,
        ..SessionOptions::default()
    })
    .unwrap();
    assert!(steps.iter().all(|s| s.settled), "{steps:#?}");
    assert!(step(&steps, "open Documents").frames > 1);
}
