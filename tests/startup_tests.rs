mod common;

use std::time::Duration;

use quick_nav::cli::config::AppConfig;
use quick_nav::dom::tree::Document;
use quick_nav::render::sink::CollectingSink;
use quick_nav::startup::bootstrap::{host_matches, InactiveReason, Startup, StartupState};
use quick_nav::{start, StartupOutcome};

use crate::common::{chat_page, conversation, push_turn, test_config};

// ============================================================================
// Activation boundary
// ============================================================================

#[tokio::test(start_paused = true)]
async fn foreign_host_stays_inactive_and_untouched() {
    let doc = Document::new("https://example.com/c/1");
    let sink = CollectingSink::new();
    let outcome = start(doc.clone(), &test_config(), Box::new(sink.clone())).await;

    assert_eq!(
        outcome.inactive_reason(),
        Some(&InactiveReason::HostMismatch {
            host: "example.com".into()
        })
    );
    assert_eq!(doc.attribute(doc.root(), "data-qn-installed"), None);
    assert_eq!(sink.render_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn backslash_in_authority_does_not_fake_an_allowed_host() {
    let doc = Document::new("https://evil.example\\.chatgpt.com/c/1");
    let outcome = start(doc.clone(), &test_config(), Box::new(CollectingSink::new())).await;

    assert_eq!(
        outcome.inactive_reason(),
        Some(&InactiveReason::HostMismatch {
            host: "evil.example".into()
        })
    );
    assert_eq!(doc.attribute(doc.root(), "data-qn-installed"), None);
}

#[tokio::test(start_paused = true)]
async fn unparseable_url_is_a_host_mismatch() {
    let doc = Document::new("chatgpt.com/c/1");
    let outcome = start(doc, &test_config(), Box::new(CollectingSink::new())).await;
    assert_eq!(
        outcome.inactive_reason(),
        Some(&InactiveReason::HostMismatch { host: String::new() })
    );
}

#[test]
fn host_matching_accepts_subdomains_only() {
    let hosts = vec!["chatgpt.com".to_string(), "chat.openai.com".to_string()];
    assert!(host_matches("chatgpt.com", &hosts));
    assert!(host_matches("CHATGPT.COM", &hosts));
    assert!(host_matches("eu.chatgpt.com", &hosts));
    assert!(host_matches("chat.openai.com", &hosts));
    assert!(!host_matches("notchatgpt.com", &hosts));
    assert!(!host_matches("openai.com", &hosts));
    assert!(!host_matches("chatgpt.com.evil.net", &hosts));
    assert!(!host_matches("", &hosts));
    assert!(!host_matches("evil.example", &hosts));
    assert!(!host_matches("anything", &[String::new()]));
}

#[tokio::test(start_paused = true)]
async fn second_instance_on_same_document_is_refused() {
    let (doc, _) = conversation();
    let first = start(doc.clone(), &test_config(), Box::new(CollectingSink::new())).await;
    assert!(matches!(first, StartupOutcome::Ready(_)));
    assert_eq!(
        doc.attribute(doc.root(), "data-qn-installed").as_deref(),
        Some(env!("CARGO_PKG_VERSION"))
    );

    let sink = CollectingSink::new();
    let second = start(doc.clone(), &test_config(), Box::new(sink.clone())).await;
    assert_eq!(second.inactive_reason(), Some(&InactiveReason::AlreadyInstalled));
    assert_eq!(sink.render_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_selector_config_is_inactive() {
    let (doc, _) = conversation();
    let mut config = test_config();
    config.discovery.code_selector = "[".into();

    let outcome = start(doc.clone(), &config, Box::new(CollectingSink::new())).await;
    assert!(matches!(
        outcome.inactive_reason(),
        Some(InactiveReason::InvalidConfig { .. })
    ));
    assert_eq!(doc.attribute(doc.root(), "data-qn-installed"), None);
}

// ============================================================================
// Waiting for content
// ============================================================================

#[tokio::test(start_paused = true)]
async fn content_present_is_found_on_first_poll() {
    let (doc, _) = conversation();
    let sink = CollectingSink::new();
    let nav = start(doc, &test_config(), Box::new(sink.clone()))
        .await
        .ready()
        .unwrap();

    assert_eq!(nav.content_attempts(), 1);
    assert_eq!(nav.state(), StartupState::Ready);
    assert_eq!(nav.entries().len(), 2);
    assert_eq!(nav.passes(), 1);
    assert_eq!(sink.render_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn poll_budget_exhausts_then_shows_empty_state() {
    let (doc, _) = chat_page();
    let sink = CollectingSink::new();
    let started = tokio::time::Instant::now();
    let nav = start(doc, &test_config(), Box::new(sink.clone()))
        .await
        .ready()
        .unwrap();

    assert_eq!(nav.content_attempts(), 10);
    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert!(nav.entries().is_empty());
    assert_eq!(sink.last_frame(), Some(vec![]));
}

#[tokio::test(start_paused = true)]
async fn late_content_ends_polling_early() {
    let (doc, main) = chat_page();
    let host_doc = doc.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(450)).await;
        push_turn(&host_doc, main, "assistant", "streamed in");
    });

    let nav = start(doc, &test_config(), Box::new(CollectingSink::new()))
        .await
        .ready()
        .unwrap();

    assert_eq!(nav.content_attempts(), 3);
    // content-only check polls every role; the list itself is user-only
    assert!(nav.entries().is_empty());
    assert!(!nav.include_non_user());
    assert_eq!(nav.set_include_non_user(true).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn state_machine_steps_are_observable() {
    let (doc, _) = conversation();
    let mut startup = Startup::new(doc, &AppConfig::default());
    assert_eq!(startup.state(), &StartupState::Unstarted);

    startup.activate().unwrap();
    assert_eq!(startup.state(), &StartupState::WaitingForContent { attempts: 0 });
    // activating twice is harmless
    assert!(startup.activate().is_ok());

    assert_eq!(startup.wait_for_content().await, 1);
    assert_eq!(startup.state(), &StartupState::Ready);
}

// ============================================================================
// Running instance
// ============================================================================

#[tokio::test(start_paused = true)]
async fn running_instance_tracks_new_turns() {
    let (doc, main) = conversation();
    let sink = CollectingSink::new();
    let nav = start(doc.clone(), &test_config(), Box::new(sink.clone()))
        .await
        .ready()
        .unwrap();

    for i in 0..3 {
        push_turn(&doc, main, "user", &format!("burst {i}"));
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(nav.is_sync_pending());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!nav.is_sync_pending());
    assert_eq!(nav.passes(), 2);
    assert_eq!(nav.entries().len(), 5);
    assert_eq!(sink.render_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn configured_mode_and_manual_refresh() {
    let (doc, _) = conversation();
    let mut config = test_config();
    config.sync.include_non_user = true;

    let nav = start(doc, &config, Box::new(CollectingSink::new()))
        .await
        .ready()
        .unwrap();
    assert!(nav.include_non_user());
    assert_eq!(nav.entries().len(), 5);

    let refreshed = nav.refresh();
    assert_eq!(refreshed, nav.entries());
    assert_eq!(nav.passes(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_change_tracking() {
    let (doc, main) = conversation();
    let sink = CollectingSink::new();
    let nav = start(doc.clone(), &test_config(), Box::new(sink.clone()))
        .await
        .ready()
        .unwrap();
    nav.shutdown();

    push_turn(&doc, main, "user", "after shutdown");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.render_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn trace_path_from_config_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");
    let (doc, _) = conversation();
    let mut config = test_config();
    config.trace.path = Some(path.display().to_string());

    let nav = start(doc, &config, Box::new(CollectingSink::new()))
        .await
        .ready()
        .unwrap();
    nav.refresh();

    let lines = std::fs::read_to_string(&path).unwrap();
    assert_eq!(lines.lines().count(), 2);
    assert!(lines.lines().next().unwrap().contains("\"reason\":\"startup\""));
}
