use std::sync::{Arc, Mutex, PoisonError};

use crate::sync::entry::Entry;

/// Presentation layer receiving the entry list after every sync pass.
///
/// An empty slice is the explicit empty state; the sink must render a marker
/// for it rather than nothing.
pub trait RenderSink: Send {
    fn render(&mut self, entries: &[Entry]);
}

/// Sink that keeps every frame it was handed.
///
/// Clones share the same frame log, so a test (or the CLI) can hold one clone
/// while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    frames: Arc<Mutex<Vec<Vec<Entry>>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<Entry>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_frame(&self) -> Option<Vec<Entry>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn render_count(&self) -> usize {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RenderSink for CollectingSink {
    fn render(&mut self, entries: &[Entry]) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entries.to_vec());
    }
}
