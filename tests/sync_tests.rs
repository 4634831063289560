mod common;

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use quick_nav::discovery::discover::{Discoverer, Role, Strategy};
use quick_nav::identity::registry::IdentityRegistry;
use quick_nav::render::console::{format_entry_list, EMPTY_STATE_LABEL};
use quick_nav::render::sink::CollectingSink;
use quick_nav::sync::coalesce::Coalescer;
use quick_nav::sync::engine::{build_pass, SyncConfig, SyncEngine};
use quick_nav::sync::live::LiveSync;
use quick_nav::trace::logger::TraceLogger;
use quick_nav::trace::trace::SyncReason;

use crate::common::{chat_page, conversation, push_turn, turn};

fn engine_for(doc: &quick_nav::dom::tree::Document, sink: &CollectingSink) -> SyncEngine {
    SyncEngine::new(
        doc.clone(),
        Discoverer::default(),
        IdentityRegistry::default(),
        &SyncConfig::default(),
        Box::new(sink.clone()),
    )
}

// ============================================================================
// Single pass
// ============================================================================

#[test]
fn pass_projects_entries_in_order() {
    let (doc, _) = conversation();
    let pass = build_pass(
        &doc,
        &Discoverer::default(),
        &IdentityRegistry::default(),
        true,
        280,
    );
    assert_eq!(pass.strategy, Strategy::Primary);
    assert_eq!(pass.entries.len(), 5);
    assert_eq!(pass.entries[0].role, Role::User);
    assert_eq!(pass.entries[0].excerpt, "How do I reverse a list?");
    assert_eq!(pass.entries[4].role, Role::Assistant);
}

#[test]
fn empty_turns_are_skipped_and_never_tagged() {
    let (doc, main) = chat_page();
    let blank = push_turn(&doc, main, "user", " \u{00A0}\n ");
    push_turn(&doc, main, "user", "real");
    let registry = IdentityRegistry::default();

    let pass = build_pass(&doc, &Discoverer::default(), &registry, false, 280);
    assert_eq!(pass.entries.len(), 1);
    assert_eq!(pass.skipped_empty, 1);
    assert_eq!(doc.attribute(blank, registry.attribute()), None);
}

#[test]
fn identities_survive_rebuilds() {
    let (doc, _) = conversation();
    let sink = CollectingSink::new();
    let mut engine = engine_for(&doc, &sink);

    let first = engine.rebuild(true).to_vec();
    let second = engine.rebuild(true).to_vec();
    assert_eq!(first, second);
    assert_eq!(engine.passes(), 2);
}

#[test]
fn long_turns_are_truncated_to_budget() {
    let (doc, main) = chat_page();
    push_turn(&doc, main, "user", &"word ".repeat(100));
    let sink = CollectingSink::new();
    let config = SyncConfig {
        excerpt_budget: 20,
        ..SyncConfig::default()
    };
    let mut engine = SyncEngine::new(
        doc.clone(),
        Discoverer::default(),
        IdentityRegistry::default(),
        &config,
        Box::new(sink.clone()),
    );

    let entries = engine.sync(SyncReason::Manual);
    assert_eq!(entries[0].excerpt.chars().count(), 20);
    assert!(entries[0].excerpt.ends_with('\u{2026}'));
}

// ============================================================================
// Mode and empty state
// ============================================================================

#[test]
fn mode_change_rebuilds_immediately() {
    let (doc, _) = conversation();
    let sink = CollectingSink::new();
    let mut engine = engine_for(&doc, &sink);

    assert_eq!(engine.sync(SyncReason::Startup).len(), 2);
    assert_eq!(engine.set_include_non_user(true).len(), 5);
    assert!(engine.include_non_user());
    assert_eq!(engine.set_include_non_user(false).len(), 2);

    let counts: Vec<usize> = sink.frames().iter().map(Vec::len).collect();
    assert_eq!(counts, vec![2, 5, 2]);
}

#[test]
fn empty_state_is_rendered_explicitly() {
    let (doc, _) = chat_page();
    let sink = CollectingSink::new();
    let mut engine = engine_for(&doc, &sink);

    assert!(engine.sync(SyncReason::Startup).is_empty());
    assert_eq!(sink.render_count(), 1);
    assert_eq!(sink.last_frame(), Some(vec![]));
    assert_eq!(format_entry_list(&[]), format!("{EMPTY_STATE_LABEL}\n"));
}

#[test]
fn console_format_lists_role_and_excerpt() {
    let (doc, _) = conversation();
    let sink = CollectingSink::new();
    let mut engine = engine_for(&doc, &sink);
    let out = format_entry_list(engine.rebuild(true));

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "[user] How do I reverse a list?");
    assert_eq!(lines[1], "[assistant] Use reversed() or slicing.");
}

#[test]
fn trace_file_receives_one_line_per_pass() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sync.jsonl");
    let (doc, _) = conversation();
    let sink = CollectingSink::new();
    let mut engine = engine_for(&doc, &sink).with_trace(TraceLogger::new(&path));

    engine.sync(SyncReason::Startup);
    engine.set_include_non_user(true);

    let content = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["reason"], "startup");
    assert_eq!(events[0]["entries"], 2);
    assert_eq!(events[1]["reason"], "mode_change");
    assert_eq!(events[1]["strategy"], "primary");
    assert_eq!(events[1]["entries"], 5);
}

// ============================================================================
// Coalescing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn coalescer_absorbs_burst_into_one_run() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let coalescer = Coalescer::spawn(Duration::from_millis(16), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(coalescer.trigger());
    for _ in 0..10 {
        assert!(!coalescer.trigger());
    }
    assert!(coalescer.is_pending());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!coalescer.is_pending());

    // next burst schedules again
    assert!(coalescer.trigger());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn mutation_burst_triggers_single_rebuild() {
    let (doc, main) = conversation();
    let sink = CollectingSink::new();
    let mut engine = engine_for(&doc, &sink);
    engine.sync(SyncReason::Startup);
    let engine = Arc::new(Mutex::new(engine));
    let live = LiveSync::arm(Arc::clone(&engine), Duration::from_millis(16));

    for i in 0..5 {
        push_turn(&doc, main, "user", &format!("follow-up {i}"));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(sink.render_count(), 2);
    assert_eq!(sink.last_frame().unwrap().len(), 7);
    assert!(!live.is_pending());
}

#[tokio::test(start_paused = true)]
async fn mutations_during_pending_window_are_absorbed() {
    let (doc, main) = chat_page();
    let sink = CollectingSink::new();
    let mut engine = engine_for(&doc, &sink);
    engine.sync(SyncReason::Startup);
    let engine = Arc::new(Mutex::new(engine));
    let live = LiveSync::arm(Arc::clone(&engine), Duration::from_millis(16));

    push_turn(&doc, main, "user", "first");
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(live.is_pending());

    push_turn(&doc, main, "user", "second");
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(sink.render_count(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.render_count(), 2);
    assert_eq!(sink.last_frame().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn identity_stamps_do_not_retrigger() {
    let (doc, main) = chat_page();
    let sink = CollectingSink::new();
    let mut engine = engine_for(&doc, &sink);
    engine.sync(SyncReason::Startup);
    let engine = Arc::new(Mutex::new(engine));
    let _live = LiveSync::arm(Arc::clone(&engine), Duration::from_millis(16));

    push_turn(&doc, main, "user", "new");
    tokio::time::sleep(Duration::from_millis(500)).await;

    // startup pass + one mutation pass; the stamp from that pass is ignored
    assert_eq!(sink.render_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn removed_and_recreated_turns_are_reflected() {
    let (doc, main) = chat_page();
    let original = push_turn(&doc, main, "user", "draft");
    let sink = CollectingSink::new();
    let mut engine = engine_for(&doc, &sink);
    let before = engine.sync(SyncReason::Startup)[0].id.clone();
    let engine = Arc::new(Mutex::new(engine));
    let _live = LiveSync::arm(Arc::clone(&engine), Duration::from_millis(16));

    doc.remove(original);
    let replacement = turn(&doc, "user", "draft");
    doc.append_child(main, replacement);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let frame = sink.last_frame().unwrap();
    assert_eq!(frame.len(), 1);
    assert_ne!(frame[0].id, before);
}

#[tokio::test(start_paused = true)]
async fn dropping_live_sync_disarms_it() {
    let (doc, main) = chat_page();
    let sink = CollectingSink::new();
    let engine = Arc::new(Mutex::new(engine_for(&doc, &sink)));
    let live = LiveSync::arm(Arc::clone(&engine), Duration::from_millis(16));
    drop(live);

    push_turn(&doc, main, "user", "ignored");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.render_count(), 0);
}
