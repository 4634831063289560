use crate::render::sink::RenderSink;
use crate::sync::entry::Entry;

/// Shown in place of the list when no turns were found.
pub const EMPTY_STATE_LABEL: &str = "No messages found yet.";

// ============================================================================
// Console rendering
// ============================================================================

/// Format an entry list for terminal output.
///
/// Produces output like:
/// ```text
/// [user] How do I reverse a list?
/// [assistant] Use `reversed()` or slice with [::-1]…
/// ```
/// or the empty-state label when `entries` is empty.
pub fn format_entry_list(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return format!("{EMPTY_STATE_LABEL}\n");
    }

    let mut out = String::new();
    for entry in entries {
        // one row per entry; excerpts may span lines, keep rows single-line
        let label = entry.excerpt.replace('\n', " ");
        out.push_str(&format!("[{}] {}\n", entry.role.as_str(), label));
    }
    out
}

/// Sink that prints each frame to stdout, separated by a rule.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    frames: u64,
}

impl RenderSink for ConsoleSink {
    fn render(&mut self, entries: &[Entry]) {
        self.frames += 1;
        print!(
            "--- frame {} ({} entries) ---\n{}",
            self.frames,
            entries.len(),
            format_entry_list(entries)
        );
    }
}
