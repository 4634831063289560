use thiserror::Error;

/// Failures of the configuration and I/O surface.
///
/// Engine operations (discovery, sync, navigation, startup) never return
/// this type; they degrade to empty or unchanged state instead.
#[derive(Debug, Error)]
pub enum NavError {
    /// A configured selector could not be parsed
    #[error("invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    /// Reading or writing a file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing failed (snapshot, preference file)
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization failed (entry output, preference file)
    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// An output format name that no command understands
    #[error("unknown output format '{0}' (expected console, json or frames)")]
    Format(String),

    /// A keyboard shortcut string could not be parsed
    #[error("invalid shortcut '{0}'")]
    Shortcut(String),
}
