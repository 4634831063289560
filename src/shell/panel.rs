use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::NavError;
use crate::shell::shortcut::{KeyChord, KeyPress};

// ============================================================================
// Persisted open/closed preference
// ============================================================================

/// Storage slot for the panel's open/closed flag.
pub trait PreferenceStore: Send {
    /// The stored flag, `None` when nothing usable is stored.
    fn load(&self) -> Option<bool>;
    fn save(&mut self, open: bool) -> Result<(), NavError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PanelPreference {
    open: bool,
}

/// JSON file holding `{ "open": bool }`.
#[derive(Debug, Clone)]
pub struct FilePreference {
    path: PathBuf,
}

impl FilePreference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreference {
    fn load(&self) -> Option<bool> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<PanelPreference>(&content) {
            Ok(pref) => Some(pref.open),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt panel preference");
                None
            }
        }
    }

    fn save(&mut self, open: bool) -> Result<(), NavError> {
        let json = serde_json::to_string(&PanelPreference { open }).map_err(|e| {
            NavError::JsonSerialize {
                context: "panel preference".into(),
                source: e,
            }
        })?;
        std::fs::write(&self.path, json).map_err(|e| NavError::Io {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

/// In-memory slot, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreference {
    value: Option<bool>,
    writes: usize,
}

impl MemoryPreference {
    pub fn with_value(open: bool) -> Self {
        Self {
            value: Some(open),
            writes: 0,
        }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PreferenceStore for MemoryPreference {
    fn load(&self) -> Option<bool> {
        self.value
    }

    fn save(&mut self, open: bool) -> Result<(), NavError> {
        self.value = Some(open);
        self.writes += 1;
        Ok(())
    }
}

// ============================================================================
// Panel shell
// ============================================================================

/// Visibility state of the navigator panel.
///
/// The preference is read once, at construction, and written on every
/// user-initiated change. A failed write keeps the in-memory state.
pub struct PanelShell {
    store: Box<dyn PreferenceStore>,
    open: bool,
    shortcut: Option<KeyChord>,
}

impl PanelShell {
    pub fn new(store: Box<dyn PreferenceStore>, default_open: bool) -> Self {
        let open = store.load().unwrap_or(default_open);
        Self {
            store,
            open,
            shortcut: None,
        }
    }

    pub fn with_shortcut(mut self, shortcut: KeyChord) -> Self {
        self.shortcut = Some(shortcut);
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Toggle button (or shortcut). Returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.set_open(!self.open);
        self.open
    }

    /// Collapse button.
    pub fn collapse(&mut self) {
        self.set_open(false);
    }

    /// Global key handler; toggles when the press matches the shortcut.
    pub fn handle_key(&mut self, press: &KeyPress) -> bool {
        let matched = self
            .shortcut
            .as_ref()
            .is_some_and(|chord| chord.matches(press));
        if matched {
            self.toggle();
        }
        matched
    }

    fn set_open(&mut self, open: bool) {
        self.open = open;
        if let Err(e) = self.store.save(open) {
            warn!(error = %e, "failed to persist panel preference");
        }
    }
}
