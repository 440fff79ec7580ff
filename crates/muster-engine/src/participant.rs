//! What the engine can see of a participant on the external platform.

use muster_store::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A participant as observed on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,

    /// Current display label (nickname)
    #[serde(default)]
    pub display_label: String,

    /// Tag names currently held
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Bots and integrations
    #[serde(default)]
    pub is_service: bool,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            display_label: String::new(),
            tags: BTreeSet::new(),
            is_service: false,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.display_label = label.into();
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    #[must_use]
    pub fn service(mut self) -> Self {
        self.is_service = true;
        self
    }

    /// Check if the participant holds `tag`, ignoring case.
    pub fn holds(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_ignores_case() {
        let p = Participant::new("p1").with_tag("Verified");
        assert!(p.holds("verified"));
        assert!(!p.holds("Solo"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let p: Participant = serde_json::from_str(r#"{"id":"p1"}"#).unwrap();
        assert_eq!(p.id.as_str(), "p1");
        assert!(p.tags.is_empty());
        assert!(!p.is_service);
    }
}
