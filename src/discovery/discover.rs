use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::selector::Selector;
use crate::dom::tree::{Document, NodeId};
use crate::error::NavError;

// ============================================================================
// Roles
// ============================================================================

/// Author of a conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Unknown => "unknown",
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// What the fallback strategy does with containers that embed code blocks
/// when only user turns are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Keep every fallback container.
    #[default]
    KeepAll,
    /// Drop containers holding a code element (assistant replies usually do).
    ExcludeCodeBlocks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_role_attribute")]
    pub role_attribute: String,

    #[serde(default = "default_user_role")]
    pub user_role: String,

    #[serde(default = "default_assistant_role")]
    pub assistant_role: String,

    /// Generic turn-container selector used when no role-marked element exists
    #[serde(default = "default_fallback_selector")]
    pub fallback_selector: String,

    #[serde(default)]
    pub fallback_policy: FallbackPolicy,

    #[serde(default = "default_code_selector")]
    pub code_selector: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            role_attribute: default_role_attribute(),
            user_role: default_user_role(),
            assistant_role: default_assistant_role(),
            fallback_selector: default_fallback_selector(),
            fallback_policy: FallbackPolicy::default(),
            code_selector: default_code_selector(),
        }
    }
}

fn default_role_attribute() -> String { "data-message-author-role".to_string() }
fn default_user_role() -> String { "user".to_string() }
fn default_assistant_role() -> String { "assistant".to_string() }
fn default_fallback_selector() -> String { "main article".to_string() }
fn default_code_selector() -> String { "code".to_string() }

// ============================================================================
// Discovery
// ============================================================================

/// Which strategy produced a discovery result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Primary,
    Fallback,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    /// Candidate message elements in document order
    pub nodes: Vec<NodeId>,
    pub strategy: Strategy,
}

/// Locates candidate message elements in the live tree.
#[derive(Debug, Clone)]
pub struct Discoverer {
    role_attribute: String,
    user_role: String,
    assistant_role: String,
    user_only: Selector,
    all_turns: Selector,
    fallback: Selector,
    code: Selector,
    policy: FallbackPolicy,
}

impl Default for Discoverer {
    fn default() -> Self {
        Self::with_selectors(
            &DiscoveryConfig::default(),
            Selector::tag_path(&["main", "article"]),
            Selector::tag_path(&["code"]),
        )
    }
}

impl Discoverer {
    /// Compile the configured selectors. Fails only on an unparsable
    /// `fallback_selector` or `code_selector`.
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, NavError> {
        Ok(Self::with_selectors(
            config,
            Selector::parse(&config.fallback_selector)?,
            Selector::parse(&config.code_selector)?,
        ))
    }

    fn with_selectors(config: &DiscoveryConfig, fallback: Selector, code: Selector) -> Self {
        let user_only = Selector::attr_equals(&config.role_attribute, &config.user_role);
        let all_turns = user_only.clone().union(Selector::attr_equals(
            &config.role_attribute,
            &config.assistant_role,
        ));
        Self {
            role_attribute: config.role_attribute.clone(),
            user_role: config.user_role.clone(),
            assistant_role: config.assistant_role.clone(),
            user_only,
            all_turns,
            fallback,
            code,
            policy: config.fallback_policy,
        }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Ordered candidate message elements.
    pub fn discover(&self, doc: &Document, include_non_user: bool) -> Vec<NodeId> {
        self.discover_with_strategy(doc, include_non_user).nodes
    }

    /// Like [`Discoverer::discover`], also reporting which strategy matched.
    ///
    /// Role-marked elements win; when there are none the generic container
    /// selector is used instead. Both strategies empty yields an empty list.
    pub fn discover_with_strategy(&self, doc: &Document, include_non_user: bool) -> DiscoveryOutcome {
        let primary = if include_non_user {
            &self.all_turns
        } else {
            &self.user_only
        };

        let nodes = doc.query_selector_all(primary);
        if !nodes.is_empty() {
            debug!(count = nodes.len(), include_non_user, "primary discovery matched");
            return DiscoveryOutcome {
                nodes,
                strategy: Strategy::Primary,
            };
        }

        let mut nodes = doc.query_selector_all(&self.fallback);
        if !include_non_user && self.policy == FallbackPolicy::ExcludeCodeBlocks {
            nodes.retain(|node| doc.query_selector_all_within(*node, &self.code).is_empty());
        }

        if nodes.is_empty() {
            debug!(include_non_user, "no message elements found");
            DiscoveryOutcome {
                nodes,
                strategy: Strategy::Empty,
            }
        } else {
            debug!(
                count = nodes.len(),
                selector = %self.fallback,
                "primary discovery empty, using fallback"
            );
            DiscoveryOutcome {
                nodes,
                strategy: Strategy::Fallback,
            }
        }
    }

    /// Role stamped on `node` by the host, `Unknown` when absent or foreign.
    pub fn role_of(&self, doc: &Document, node: NodeId) -> Role {
        match doc.attribute(node, &self.role_attribute) {
            Some(role) if role == self.user_role => Role::User,
            Some(role) if role == self.assistant_role => Role::Assistant,
            _ => Role::Unknown,
        }
    }
}
