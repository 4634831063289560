use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::discovery::discover::DiscoveryConfig;
use crate::navigate::navigator::NavigationConfig;
use crate::shell::panel::{FilePreference, PanelShell};
use crate::shell::shortcut::KeyChord;
use crate::startup::bootstrap::StartupConfig;
use crate::sync::engine::SyncConfig;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "quick-nav.yaml";

/// Panel preference file used when neither the CLI nor the config names one.
pub const DEFAULT_STATE_FILE: &str = "quick-nav-state.json";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "quick-nav",
    version,
    about = "Discover, list and jump between conversation turns in a chat page"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: quick-nav.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the conversation turns found in a page snapshot
    Scan {
        /// JSON page snapshot to load
        #[arg(long)]
        snapshot: String,

        /// Include assistant replies, not only user turns
        #[arg(long)]
        include_assistant: bool,

        /// Output format: console, json or frames
        #[arg(long, default_value = "console", value_parser = ["console", "json", "frames"])]
        format: String,
    },

    /// Jump to one entry of a page snapshot and report the effect
    Locate {
        /// JSON page snapshot to load
        #[arg(long)]
        snapshot: String,

        /// Zero-based position in the entry list
        #[arg(long)]
        index: usize,

        /// Include assistant replies, not only user turns
        #[arg(long)]
        include_assistant: bool,
    },

    /// Flip the persisted panel open/closed preference
    Toggle {
        /// Preference file (default: shell.state_file or quick-nav-state.json)
        #[arg(long)]
        state_file: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `quick-nav.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub startup: StartupConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellConfig {
    pub state_file: Option<String>,

    /// Panel visibility when no preference has been stored yet
    #[serde(default = "default_true")]
    pub default_open: bool,

    /// Optional global toggle shortcut, e.g. "Alt+Shift+K"
    pub shortcut: Option<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            state_file: None,
            default_open: true,
            shortcut: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// JSONL file receiving one line per sync pass
    pub path: Option<String>,
}

fn default_true() -> bool { true }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "malformed config, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Apply the `--include-assistant` flag on top of the configured mode.
pub fn with_mode_override(config: &AppConfig, include_assistant: bool) -> AppConfig {
    let mut config = config.clone();
    if include_assistant {
        config.sync.include_non_user = true;
    }
    config
}

/// Build the panel shell from resolved CLI/config values.
///
/// An unparsable shortcut is logged and ignored.
pub fn build_panel_shell(config: &AppConfig, state_file: Option<&str>) -> PanelShell {
    let path = state_file
        .or(config.shell.state_file.as_deref())
        .unwrap_or(DEFAULT_STATE_FILE);
    let shell = PanelShell::new(Box::new(FilePreference::new(path)), config.shell.default_open);

    match config.shell.shortcut.as_deref().map(str::parse::<KeyChord>) {
        Some(Ok(chord)) => shell.with_shortcut(chord),
        Some(Err(e)) => {
            warn!(error = %e, "ignoring shortcut");
            shell
        }
        None => shell,
    }
}
