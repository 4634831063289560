use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::dom::tree::{Document, NodeId, ScrollBehavior, ScrollBlock, ScrollOptions};
use crate::identity::registry::{Identity, IdentityRegistry, MARKER_ATTR};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Attribute carrying stamped identities
    #[serde(default = "default_marker_attribute")]
    pub marker_attribute: String,

    #[serde(default = "default_highlight_class")]
    pub highlight_class: String,

    /// How long the highlight stays on the located element
    #[serde(default = "default_highlight_duration_ms")]
    pub highlight_duration_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            marker_attribute: default_marker_attribute(),
            highlight_class: default_highlight_class(),
            highlight_duration_ms: default_highlight_duration_ms(),
        }
    }
}

fn default_marker_attribute() -> String { MARKER_ATTR.to_string() }
fn default_highlight_class() -> String { "qn-highlight".to_string() }
fn default_highlight_duration_ms() -> u64 { 1500 }

// ============================================================================
// Navigator
// ============================================================================

/// Click-to-locate: scroll an entry's element into view and flash it.
#[derive(Clone)]
pub struct Navigator {
    document: Document,
    registry: IdentityRegistry,
    highlight_class: String,
    highlight_duration: Duration,
    runtime: Option<Handle>,
    /// Latest highlight per node; only the timer that set it may clear it.
    generations: Arc<Mutex<HashMap<NodeId, u64>>>,
}

impl Navigator {
    /// Captures the current tokio runtime, if any, for clearing highlights.
    pub fn new(document: Document, registry: IdentityRegistry, config: &NavigationConfig) -> Self {
        Self {
            document,
            registry,
            highlight_class: config.highlight_class.clone(),
            highlight_duration: Duration::from_millis(config.highlight_duration_ms),
            runtime: Handle::try_current().ok(),
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn highlight_class(&self) -> &str {
        &self.highlight_class
    }

    /// Locate the element carrying `id`.
    ///
    /// Returns `false` without touching the page when the element is gone
    /// (removed or re-rendered since the entry was built). Locating the same
    /// element again restarts its highlight timer.
    pub fn navigate(&self, id: &Identity) -> bool {
        let Some(node) = self.registry.resolve(&self.document, id) else {
            debug!(%id, "navigation target not found");
            return false;
        };

        self.document.scroll_into_view(
            node,
            ScrollOptions {
                behavior: ScrollBehavior::Smooth,
                block: ScrollBlock::Center,
            },
        );
        self.document.add_class(node, &self.highlight_class);

        match &self.runtime {
            Some(runtime) => {
                let generation = {
                    let mut generations =
                        self.generations.lock().unwrap_or_else(PoisonError::into_inner);
                    let slot = generations.entry(node).or_insert(0);
                    *slot += 1;
                    *slot
                };
                let document = self.document.clone();
                let class = self.highlight_class.clone();
                let duration = self.highlight_duration;
                let generations = Arc::clone(&self.generations);
                runtime.spawn(async move {
                    tokio::time::sleep(duration).await;
                    let mut generations =
                        generations.lock().unwrap_or_else(PoisonError::into_inner);
                    if generations.get(&node) == Some(&generation) {
                        generations.remove(&node);
                        document.remove_class(node, &class);
                    } else {
                        debug!(?node, generation, "highlight renewed; leaving class in place");
                    }
                });
            }
            None => {
                warn!(%id, "no runtime to clear highlight; clearing immediately");
                self.document.remove_class(node, &self.highlight_class);
            }
        }
        true
    }
}
