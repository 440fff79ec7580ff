//! Identity types.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;

/// Stable key of a roster entry (e.g. an enrollment number).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// Normalize raw user input into an identity key.
    ///
    /// Surrounding whitespace is stripped; an empty result is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for IdentityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A roster entry. Immutable once the roster is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique key
    pub id: IdentityId,

    /// Full name as it appears in the roster
    pub full_name: String,

    /// Nickname applied on verification (first token of the full name)
    pub display_label: String,

    /// Attribute tags (sports, games, ...)
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Identity {
    /// Create an identity with no tags.
    pub fn new(id: IdentityId, full_name: &str) -> Self {
        Self {
            id,
            full_name: full_name.trim().to_string(),
            display_label: display_label(full_name),
            tags: BTreeSet::new(),
        }
    }

    /// Key under which this identity is found by label lookups.
    pub fn label_key(&self) -> String {
        label_key(&self.display_label)
    }
}

/// Derive a display label from a full name: its first whitespace token.
pub fn display_label(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Normalize a label for index lookups: first token, lowercased.
pub fn label_key(label: &str) -> String {
    display_label(label).to_lowercase()
}
