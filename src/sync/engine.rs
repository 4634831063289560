use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::discovery::discover::{Discoverer, Strategy};
use crate::dom::tree::Document;
use crate::identity::registry::IdentityRegistry;
use crate::render::sink::RenderSink;
use crate::sync::entry::Entry;
use crate::sync::normalize::{excerpt, normalize_text, DEFAULT_EXCERPT_BUDGET};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::{SyncReason, SyncTraceEvent};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum excerpt length in characters
    #[serde(default = "default_excerpt_budget")]
    pub excerpt_budget: usize,

    /// Delay between the first mutation of a burst and the rebuild it triggers
    #[serde(default = "default_coalesce_delay_ms")]
    pub coalesce_delay_ms: u64,

    /// Initial value of the "include non-user turns" mode
    #[serde(default)]
    pub include_non_user: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            excerpt_budget: DEFAULT_EXCERPT_BUDGET,
            coalesce_delay_ms: default_coalesce_delay_ms(),
            include_non_user: false,
        }
    }
}

fn default_excerpt_budget() -> usize { DEFAULT_EXCERPT_BUDGET }
fn default_coalesce_delay_ms() -> u64 { 16 }

// ============================================================================
// One pass
// ============================================================================

/// Result of one discovery-and-tagging pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPass {
    pub entries: Vec<Entry>,
    pub strategy: Strategy,
    pub skipped_empty: usize,
}

/// Discover, tag and project every turn currently in the tree.
///
/// Elements whose normalized text is empty are skipped before they are
/// tagged, so they never receive an identity.
pub fn build_pass(
    doc: &Document,
    discoverer: &Discoverer,
    registry: &IdentityRegistry,
    include_non_user: bool,
    excerpt_budget: usize,
) -> SyncPass {
    let outcome = discoverer.discover_with_strategy(doc, include_non_user);
    let mut entries = Vec::with_capacity(outcome.nodes.len());
    let mut skipped_empty = 0;

    for node in outcome.nodes {
        let text = normalize_text(&doc.inner_text(node));
        if text.is_empty() {
            skipped_empty += 1;
            continue;
        }
        entries.push(Entry {
            id: registry.ensure_identity(doc, node),
            role: discoverer.role_of(doc, node),
            excerpt: excerpt(&text, excerpt_budget),
        });
    }

    SyncPass {
        entries,
        strategy: outcome.strategy,
        skipped_empty,
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Owner of the current entry list.
///
/// Every pass replaces the list wholesale and hands it to the render sink.
pub struct SyncEngine {
    document: Document,
    discoverer: Discoverer,
    registry: IdentityRegistry,
    excerpt_budget: usize,
    include_non_user: bool,
    entries: Vec<Entry>,
    passes: u64,
    sink: Box<dyn RenderSink>,
    trace: TraceLogger,
}

impl SyncEngine {
    pub fn new(
        document: Document,
        discoverer: Discoverer,
        registry: IdentityRegistry,
        config: &SyncConfig,
        sink: Box<dyn RenderSink>,
    ) -> Self {
        Self {
            document,
            discoverer,
            registry,
            excerpt_budget: config.excerpt_budget,
            include_non_user: config.include_non_user,
            entries: Vec::new(),
            passes: 0,
            sink,
            trace: TraceLogger::disabled(),
        }
    }

    pub fn with_trace(mut self, trace: TraceLogger) -> Self {
        self.trace = trace;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn include_non_user(&self) -> bool {
        self.include_non_user
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Rebuild with the given mode, which also becomes the current mode.
    pub fn rebuild(&mut self, include_non_user: bool) -> &[Entry] {
        self.include_non_user = include_non_user;
        self.sync(SyncReason::Manual)
    }

    /// Switch the mode and rebuild immediately.
    pub fn set_include_non_user(&mut self, include_non_user: bool) -> &[Entry] {
        self.include_non_user = include_non_user;
        self.sync(SyncReason::ModeChange)
    }

    /// Run one pass with the current mode.
    pub fn sync(&mut self, reason: SyncReason) -> &[Entry] {
        self.passes += 1;
        let pass = build_pass(
            &self.document,
            &self.discoverer,
            &self.registry,
            self.include_non_user,
            self.excerpt_budget,
        );

        debug!(
            pass = self.passes,
            ?reason,
            strategy = ?pass.strategy,
            entries = pass.entries.len(),
            skipped = pass.skipped_empty,
            "sync pass"
        );
        if self.trace.is_enabled() {
            self.trace.log(
                &SyncTraceEvent::now(self.passes, reason, self.include_non_user)
                    .with_strategy(pass.strategy)
                    .with_counts(pass.entries.len(), pass.skipped_empty),
            );
        }

        self.entries = pass.entries;
        self.sink.render(&self.entries);
        &self.entries
    }
}
