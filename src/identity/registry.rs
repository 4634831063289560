use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dom::tree::{Document, NodeId};

/// Attribute carrying the stamped identity on a message element.
pub const MARKER_ATTR: &str = "data-qn-id";

const ID_PREFIX: &str = "qn";
const RANDOM_LEN: usize = 8;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque, page-lifetime identifier of one tracked element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stamps identities onto elements and finds them again.
///
/// The registry keeps no table of its own: the stamped attribute on the
/// element is the source of truth. An element the host destroys and recreates
/// is a new element and receives a new identity.
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    attribute: String,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new(MARKER_ATTR)
    }
}

impl IdentityRegistry {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Return the element's identity, stamping a fresh one on first sight.
    pub fn ensure_identity(&self, doc: &Document, node: NodeId) -> Identity {
        if let Some(existing) = doc
            .attribute(node, &self.attribute)
            .filter(|value| !value.is_empty())
        {
            return Identity(existing);
        }
        let id = generate_identity();
        doc.set_attribute(node, &self.attribute, id.as_str());
        id
    }

    /// The connected element currently carrying `id`, if any.
    pub fn resolve(&self, doc: &Document, id: &Identity) -> Option<NodeId> {
        doc.find_by_attribute(&self.attribute, id.as_str())
    }
}

/// `qn-<8 random base36 chars>-<unix millis in base36>`
pub fn generate_identity() -> Identity {
    let mut rng = rand::thread_rng();
    let random: String = (0..RANDOM_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    Identity(format!("{ID_PREFIX}-{random}-{}", to_base36(millis)))
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

