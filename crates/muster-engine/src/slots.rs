//! Capacity-limited role-slot tags.
//!
//! Tags are grouped into categories, each holding at most `cap` tags per
//! participant. A tag may belong to several categories; granting it must
//! fit the cap in every one of them.

use crate::action::{Action, Tag};
use crate::error::{EngineError, Result};
use muster_store::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A named group of role tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCategory {
    pub name: String,
    pub tags: Vec<String>,
}

impl SlotCategory {
    pub fn new(name: &str, tags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Check if `tag` is in this category, ignoring case.
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Ordered category table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotTable {
    categories: Vec<SlotCategory>,
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new(vec![
            SlotCategory::new(
                "Valorant",
                &["Duelist", "Initiator", "Controller", "Sentinel", "Flex"],
            ),
            SlotCategory::new("Overwatch", &["Tank", "Damage", "Support", "Flex"]),
        ])
    }
}

impl SlotTable {
    pub fn new(categories: Vec<SlotCategory>) -> Self {
        Self { categories }
    }

    /// Parse a table from a JSON array of categories.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn categories(&self) -> &[SlotCategory] {
        &self.categories
    }

    /// Canonical spelling of `tag`, if any category lists it.
    pub fn resolve(&self, tag: &str) -> Option<&str> {
        let tag = tag.trim();
        self.categories
            .iter()
            .flat_map(|c| c.tags.iter())
            .find(|t| t.eq_ignore_ascii_case(tag))
            .map(String::as_str)
    }

    /// Categories listing `tag`, in table order.
    pub fn categories_of<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a SlotCategory> {
        self.categories.iter().filter(move |c| c.contains(tag))
    }
}

/// Whether a granted tag is the first or second in its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRank {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToggleOutcome {
    Granted {
        tag: String,
        /// First category listing the tag
        category: String,
        rank: SlotRank,
    },
    Removed {
        tag: String,
    },
}

/// Tags held in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub category: String,
    pub tags: Vec<String>,
}

/// Per-participant role-slot state.
#[derive(Debug, Clone)]
pub struct RoleSlots {
    table: SlotTable,
    cap: usize,
    /// Held tags in acquisition order
    held: HashMap<ParticipantId, Vec<String>>,
}

impl RoleSlots {
    pub fn new(table: SlotTable, cap: usize) -> Self {
        Self {
            table,
            cap,
            held: HashMap::new(),
        }
    }

    pub fn table(&self) -> &SlotTable {
        &self.table
    }

    /// Tags `participant` holds, oldest first.
    pub fn held(&self, participant: &ParticipantId) -> &[String] {
        self.held
            .get(participant)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Seed the held list from the tags visible on the platform.
    ///
    /// Tags already known keep their order; newly seen ones are appended in
    /// table order. Tags no longer visible are dropped.
    pub fn sync(&mut self, participant: &ParticipantId, visible: &BTreeSet<String>) {
        let visible: Vec<&str> = visible
            .iter()
            .filter_map(|t| self.table.resolve(t))
            .collect();

        let mut next: Vec<String> = self
            .held(participant)
            .iter()
            .filter(|t| visible.contains(&t.as_str()))
            .cloned()
            .collect();
        for category in &self.table.categories {
            for tag in &category.tags {
                if visible.contains(&tag.as_str()) && !next.contains(tag) {
                    next.push(tag.clone());
                }
            }
        }

        if next.is_empty() {
            self.held.remove(participant);
        } else {
            self.held.insert(participant.clone(), next);
        }
    }

    /// Add `tag` if not held, remove it if held.
    pub fn toggle(
        &mut self,
        participant: &ParticipantId,
        tag: &str,
    ) -> Result<(ToggleOutcome, Vec<Action>)> {
        let tag = self
            .table
            .resolve(tag)
            .ok_or_else(|| EngineError::UnknownTag(tag.trim().to_string()))?
            .to_string();
        let held = self.held(participant);

        if held.contains(&tag) {
            let remaining: Vec<String> = held.iter().filter(|t| **t != tag).cloned().collect();
            if remaining.is_empty() {
                self.held.remove(participant);
            } else {
                self.held.insert(participant.clone(), remaining);
            }
            let action = Action::revoke(participant, Tag::named(&tag));
            return Ok((ToggleOutcome::Removed { tag }, vec![action]));
        }

        for category in self.table.categories_of(&tag) {
            let blocking: Vec<String> = held
                .iter()
                .filter(|t| category.contains(t))
                .cloned()
                .collect();
            if blocking.len() >= self.cap {
                return Err(EngineError::CategoryFull {
                    category: category.name.clone(),
                    blocking,
                });
            }
        }

        let primary = self.table.categories_of(&tag).next().map(|c| {
            let count = held.iter().filter(|t| c.contains(t)).count();
            (c.name.clone(), count)
        });
        let (category, before) = primary.unwrap_or_default();
        let rank = if before == 0 {
            SlotRank::Primary
        } else {
            SlotRank::Secondary
        };

        self.held
            .entry(participant.clone())
            .or_default()
            .push(tag.clone());
        let action = Action::grant(participant, Tag::named(&tag));
        Ok((ToggleOutcome::Granted { tag, category, rank }, vec![action]))
    }

    /// Held tags grouped by category, in table order.
    pub fn assignment(&self, participant: &ParticipantId) -> Vec<SlotAssignment> {
        let held = self.held(participant);
        self.table
            .categories
            .iter()
            .map(|c| SlotAssignment {
                category: c.name.clone(),
                tags: held.iter().filter(|t| c.contains(t)).cloned().collect(),
            })
            .filter(|a| !a.tags.is_empty())
            .collect()
    }
}
