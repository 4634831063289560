use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cli::config::AppConfig;
use crate::discovery::discover::Discoverer;
use crate::dom::tree::Document;
use crate::identity::registry::IdentityRegistry;
use crate::navigate::navigator::Navigator;
use crate::render::sink::RenderSink;
use crate::startup::instance::QuickNav;
use crate::sync::engine::SyncEngine;
use crate::sync::live::LiveSync;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::SyncReason;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupConfig {
    /// Hostnames the navigator activates on (subdomains included)
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Content polls before giving up and showing the empty state
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Attribute stamped on the document root once an instance is running
    #[serde(default = "default_install_marker")]
    pub install_marker: String,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            install_marker: default_install_marker(),
        }
    }
}

fn default_hosts() -> Vec<String> { vec!["chatgpt.com".to_string(), "chat.openai.com".to_string()] }
fn default_poll_interval_ms() -> u64 { 200 }
fn default_max_attempts() -> u32 { 10 }
fn default_install_marker() -> String { "data-qn-installed".to_string() }

// ============================================================================
// State machine
// ============================================================================

/// Why startup ended without an instance. Terminal, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InactiveReason {
    /// The page is not the target chat application
    HostMismatch { host: String },
    /// Another instance already runs on this document
    AlreadyInstalled,
    /// Configured selectors could not be compiled
    InvalidConfig { reason: String },
}

impl std::fmt::Display for InactiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InactiveReason::HostMismatch { host } => {
                write!(f, "host '{}' is not a supported chat application", host)
            }
            InactiveReason::AlreadyInstalled => write!(f, "navigator already running on this page"),
            InactiveReason::InvalidConfig { reason } => write!(f, "invalid configuration: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupState {
    Unstarted,
    WaitingForContent { attempts: u32 },
    Ready,
    Inactive(InactiveReason),
}

pub enum StartupOutcome {
    Ready(QuickNav),
    Inactive(InactiveReason),
}

impl StartupOutcome {
    pub fn ready(self) -> Option<QuickNav> {
        match self {
            StartupOutcome::Ready(nav) => Some(nav),
            StartupOutcome::Inactive(_) => None,
        }
    }

    pub fn inactive_reason(&self) -> Option<&InactiveReason> {
        match self {
            StartupOutcome::Ready(_) => None,
            StartupOutcome::Inactive(reason) => Some(reason),
        }
    }
}

/// Whether `host` is one of `allowed` or a subdomain of one.
pub fn host_matches(host: &str, allowed: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    allowed.iter().any(|candidate| {
        let candidate = candidate.trim_end_matches('.').to_ascii_lowercase();
        !candidate.is_empty()
            && (host == candidate || host.ends_with(&format!(".{}", candidate)))
    })
}

/// Startup sequence: `Unstarted -> WaitingForContent -> Ready`, or a
/// permanent `Inactive` when the page is not eligible.
pub struct Startup {
    document: Document,
    config: AppConfig,
    state: StartupState,
    discoverer: Option<Discoverer>,
}

impl Startup {
    pub fn new(document: Document, config: &AppConfig) -> Self {
        Self {
            document,
            config: config.clone(),
            state: StartupState::Unstarted,
            discoverer: None,
        }
    }

    pub fn state(&self) -> &StartupState {
        &self.state
    }

    /// Activation boundary: host check, then the one-instance-per-page
    /// guard. Nothing is created or stamped on an ineligible page.
    pub fn activate(&mut self) -> Result<(), InactiveReason> {
        if self.state != StartupState::Unstarted {
            return match &self.state {
                StartupState::Inactive(reason) => Err(reason.clone()),
                _ => Ok(()),
            };
        }

        let host = self.document.host();
        if !host_matches(&host, &self.config.startup.hosts) {
            info!(%host, "host not supported, staying inactive");
            return self.deactivate(InactiveReason::HostMismatch { host });
        }

        let root = self.document.root();
        let marker = self.config.startup.install_marker.clone();
        if self.document.attribute(root, &marker).is_some() {
            info!("navigator already installed on this document");
            return self.deactivate(InactiveReason::AlreadyInstalled);
        }

        let discoverer = match Discoverer::from_config(&self.config.discovery) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "discovery configuration rejected");
                return self.deactivate(InactiveReason::InvalidConfig {
                    reason: e.to_string(),
                });
            }
        };

        self.document
            .set_attribute(root, &marker, env!("CARGO_PKG_VERSION"));
        self.discoverer = Some(discoverer);
        self.state = StartupState::WaitingForContent { attempts: 0 };
        info!(%host, "navigator activated, waiting for content");
        Ok(())
    }

    fn deactivate(&mut self, reason: InactiveReason) -> Result<(), InactiveReason> {
        self.state = StartupState::Inactive(reason.clone());
        Err(reason)
    }

    /// Poll discovery (all roles) until something shows up or the attempt
    /// budget runs out. Either way the machine moves to `Ready`.
    pub async fn wait_for_content(&mut self) -> u32 {
        let Some(discoverer) = &self.discoverer else {
            return 0;
        };
        let interval = Duration::from_millis(self.config.startup.poll_interval_ms);
        let max_attempts = self.config.startup.max_attempts;

        let mut attempts = 0;
        let mut found = false;
        while attempts < max_attempts && !found {
            tokio::time::sleep(interval).await;
            attempts += 1;
            self.state = StartupState::WaitingForContent { attempts };
            found = !discoverer.discover(&self.document, true).is_empty();
        }
        if found {
            debug!(attempts, "content found");
        } else {
            debug!(attempts, "content poll budget exhausted");
        }
        self.state = StartupState::Ready;
        attempts
    }

    /// Run the whole sequence and, when eligible, hand back a running
    /// instance: one immediate rebuild, then change-driven resync armed
    /// for the rest of the page lifetime.
    ///
    /// Must be awaited within a tokio runtime.
    pub async fn run(mut self, sink: Box<dyn RenderSink>) -> StartupOutcome {
        if let Err(reason) = self.activate() {
            return StartupOutcome::Inactive(reason);
        }
        let attempts = self.wait_for_content().await;

        let discoverer = self.discoverer.take().unwrap_or_default();
        let config = self.config;
        let registry = IdentityRegistry::new(config.navigation.marker_attribute.clone());
        let trace = match &config.trace.path {
            Some(path) => TraceLogger::new(path),
            None => TraceLogger::disabled(),
        };

        let mut engine = SyncEngine::new(
            self.document.clone(),
            discoverer,
            registry.clone(),
            &config.sync,
            sink,
        )
        .with_trace(trace);
        let initial = engine.sync(SyncReason::Startup).len();
        info!(entries = initial, attempts, "navigator ready");

        let engine = Arc::new(Mutex::new(engine));
        let live = LiveSync::arm(
            Arc::clone(&engine),
            Duration::from_millis(config.sync.coalesce_delay_ms),
        );
        let navigator = Navigator::new(self.document.clone(), registry, &config.navigation);

        StartupOutcome::Ready(QuickNav::new(
            self.document,
            engine,
            navigator,
            live,
            attempts,
        ))
    }
}

/// Convenience wrapper around [`Startup::run`].
pub async fn start(document: Document, config: &AppConfig, sink: Box<dyn RenderSink>) -> StartupOutcome {
    Startup::new(document, config).run(sink).await
}
