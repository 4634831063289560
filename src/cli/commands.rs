use std::time::Duration;

use crate::cli::config::{build_panel_shell, with_mode_override, AppConfig};
use crate::dom::snapshot::PageSnapshot;
use crate::error::NavError;
use crate::render::console::{format_entry_list, ConsoleSink};
use crate::render::sink::{CollectingSink, RenderSink};
use crate::startup::bootstrap::{start, StartupOutcome};

// ============================================================================
// scan subcommand
// ============================================================================

/// Load a snapshot, run startup and render the resulting entry list.
///
/// Returns the formatted output; an inactive page yields a one-line notice.
/// With `frames`, every rendered frame is printed as it happens instead.
/// Any other format name is rejected before the snapshot is read.
pub async fn cmd_scan(
    snapshot_path: &str,
    include_assistant: bool,
    format: &str,
    config: &AppConfig,
) -> Result<String, NavError> {
    let sink: Box<dyn RenderSink> = match format {
        "frames" => Box::new(ConsoleSink::default()),
        "console" | "json" => Box::new(CollectingSink::new()),
        other => return Err(NavError::Format(other.to_string())),
    };
    let config = with_mode_override(config, include_assistant);
    let document = PageSnapshot::load(snapshot_path)?.into_document();

    let nav = match start(document, &config, sink).await {
        StartupOutcome::Ready(nav) => nav,
        StartupOutcome::Inactive(reason) => return Ok(format!("Inactive: {}\n", reason)),
    };

    let entries = nav.entries();
    nav.shutdown();

    match format {
        "json" => serde_json::to_string_pretty(&entries)
            .map(|json| json + "\n")
            .map_err(|e| NavError::JsonSerialize {
                context: "entry list".into(),
                source: e,
            }),
        "frames" => Ok(String::new()),
        _ => Ok(format_entry_list(&entries)),
    }
}

// ============================================================================
// locate subcommand
// ============================================================================

/// Navigate to entry `index` and describe what happened to the page.
pub async fn cmd_locate(
    snapshot_path: &str,
    index: usize,
    include_assistant: bool,
    config: &AppConfig,
) -> Result<String, NavError> {
    let config = with_mode_override(config, include_assistant);
    let document = PageSnapshot::load(snapshot_path)?.into_document();

    let nav = match start(document.clone(), &config, Box::new(CollectingSink::new())).await {
        StartupOutcome::Ready(nav) => nav,
        StartupOutcome::Inactive(reason) => return Ok(format!("Inactive: {}\n", reason)),
    };

    let entries = nav.entries();
    let Some(entry) = entries.get(index) else {
        nav.shutdown();
        return Ok(format!(
            "No entry at index {} ({} entries found)\n",
            index,
            entries.len()
        ));
    };

    let mut out = String::new();
    if !nav.navigate(&entry.id) {
        out.push_str(&format!("Entry {} is no longer on the page\n", entry.id));
        nav.shutdown();
        return Ok(out);
    }

    let viewport = document.viewport();
    let target = viewport
        .target
        .and_then(|node| document.tag(node))
        .unwrap_or_else(|| "?".to_string());
    out.push_str(&format!(
        "Scrolled to <{}> [{}] {}\n",
        target,
        entry.role.as_str(),
        entry.id
    ));

    let highlighted = viewport
        .target
        .is_some_and(|node| document.has_class(node, nav.highlight_class()));
    out.push_str(&format!("Highlighted: {}\n", highlighted));

    tokio::time::sleep(Duration::from_millis(
        config.navigation.highlight_duration_ms + 50,
    ))
    .await;
    let cleared = viewport
        .target
        .is_some_and(|node| !document.has_class(node, nav.highlight_class()));
    out.push_str(&format!("Highlight cleared: {}\n", cleared));

    nav.shutdown();
    Ok(out)
}

// ============================================================================
// toggle subcommand
// ============================================================================

pub fn cmd_toggle(state_file: Option<&str>, config: &AppConfig) -> String {
    let mut shell = build_panel_shell(config, state_file);
    let open = shell.toggle();
    format!("Panel {}\n", if open { "open" } else { "closed" })
}
