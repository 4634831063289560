use std::fmt;
use std::str::FromStr;

use crate::error::NavError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

/// A key press as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: &str, modifiers: Modifiers) -> Self {
        Self {
            key: key.to_string(),
            modifiers,
        }
    }
}

/// Global shortcut such as `Alt+Shift+K`.
///
/// Modifier order does not matter; modifiers must match exactly, the key
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    key: String,
    modifiers: Modifiers,
}

impl KeyChord {
    pub fn matches(&self, press: &KeyPress) -> bool {
        press.modifiers == self.modifiers && press.key.eq_ignore_ascii_case(&self.key)
    }
}

impl FromStr for KeyChord {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::default();
        let mut key: Option<String> = None;

        for token in s.split('+').map(str::trim) {
            match token.to_ascii_lowercase().as_str() {
                "" => return Err(NavError::Shortcut(s.to_string())),
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "meta" | "cmd" | "super" => modifiers.meta = true,
                other => {
                    if key.is_some() {
                        return Err(NavError::Shortcut(s.to_string()));
                    }
                    key = Some(other.to_string());
                }
            }
        }

        match key {
            Some(key) => Ok(Self { key, modifiers }),
            None => Err(NavError::Shortcut(s.to_string())),
        }
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.modifiers.ctrl {
            parts.push("Ctrl".to_string());
        }
        if self.modifiers.alt {
            parts.push("Alt".to_string());
        }
        if self.modifiers.shift {
            parts.push("Shift".to_string());
        }
        if self.modifiers.meta {
            parts.push("Meta".to_string());
        }
        parts.push(self.key.to_ascii_uppercase());
        f.write_str(&parts.join("+"))
    }
}
