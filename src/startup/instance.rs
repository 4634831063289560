use std::sync::{Arc, Mutex};

use crate::dom::tree::Document;
use crate::identity::registry::Identity;
use crate::navigate::navigator::Navigator;
use crate::startup::bootstrap::StartupState;
use crate::sync::engine::SyncEngine;
use crate::sync::entry::Entry;
use crate::sync::live::{lock_engine, LiveSync};
use crate::trace::trace::SyncReason;

/// A running navigator: the sync engine, its live resync, and navigation.
///
/// Dropping the instance disarms change-driven resync. The install marker
/// stays on the document, so a second instance will not start on it.
pub struct QuickNav {
    document: Document,
    engine: Arc<Mutex<SyncEngine>>,
    navigator: Navigator,
    live: LiveSync,
    content_attempts: u32,
}

impl QuickNav {
    pub(crate) fn new(
        document: Document,
        engine: Arc<Mutex<SyncEngine>>,
        navigator: Navigator,
        live: LiveSync,
        content_attempts: u32,
    ) -> Self {
        Self {
            document,
            engine,
            navigator,
            live,
            content_attempts,
        }
    }

    pub fn state(&self) -> StartupState {
        StartupState::Ready
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Content polls spent before the first rebuild.
    pub fn content_attempts(&self) -> u32 {
        self.content_attempts
    }

    /// The current entry list.
    pub fn entries(&self) -> Vec<Entry> {
        lock_engine(&self.engine).entries().to_vec()
    }

    pub fn include_non_user(&self) -> bool {
        lock_engine(&self.engine).include_non_user()
    }

    /// Mode input from the panel; rebuilds immediately.
    pub fn set_include_non_user(&self, include_non_user: bool) -> Vec<Entry> {
        lock_engine(&self.engine)
            .set_include_non_user(include_non_user)
            .to_vec()
    }

    /// Manual re-scan.
    pub fn refresh(&self) -> Vec<Entry> {
        lock_engine(&self.engine).sync(SyncReason::Manual).to_vec()
    }

    /// Number of sync passes run so far, the startup pass included.
    pub fn passes(&self) -> u64 {
        lock_engine(&self.engine).passes()
    }

    pub fn is_sync_pending(&self) -> bool {
        self.live.is_pending()
    }

    /// Click intent from the panel. A vanished target is a silent no-op.
    pub fn navigate(&self, id: &Identity) -> bool {
        self.navigator.navigate(id)
    }

    pub fn highlight_class(&self) -> &str {
        self.navigator.highlight_class()
    }

    /// Stop observing the document.
    pub fn shutdown(self) {
        drop(self.live);
    }
}
