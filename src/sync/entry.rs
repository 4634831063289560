use serde::{Deserialize, Serialize};

use crate::discovery::discover::Role;
use crate::identity::registry::Identity;

/// Display-ready projection of one conversational turn.
///
/// Entries are rebuilt wholesale on every sync pass and never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Identity,
    pub role: Role,
    pub excerpt: String,
}
