//! The roster table and its label index.

use crate::error::Result;
use crate::identity::{display_label, label_key, Identity, IdentityId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// One row of the roster file.
///
/// An identity may appear on several rows; each row contributes its tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    /// Identity key (rows with an empty key are skipped)
    #[serde(alias = "identity_id")]
    pub id: String,

    /// Full name
    #[serde(default, alias = "display_name")]
    pub name: String,

    /// Attribute tag contributed by this row
    #[serde(default)]
    pub tag: Option<String>,
}

impl RosterRow {
    /// Create a row.
    pub fn new(id: &str, name: &str, tag: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            tag: tag.map(str::to_string),
        }
    }
}

/// A roster file entry: either a full row or a bare identity string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RosterEntry {
    Bare(String),
    Row(RosterRow),
}

impl From<RosterEntry> for RosterRow {
    fn from(entry: RosterEntry) -> Self {
        match entry {
            RosterEntry::Bare(id) => RosterRow::new(&id, "", None),
            RosterEntry::Row(row) => row,
        }
    }
}

/// Result of looking up identities by display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum LabelMatch {
    /// No identity carries this label
    NotFound,
    /// Exactly one identity carries this label
    Unique { identity: IdentityId },
    /// Several identities share this label
    Ambiguous { candidates: Vec<IdentityId> },
}

/// Read-only identity whitelist.
#[derive(Debug, Clone, Default)]
pub struct RosterTable {
    identities: BTreeMap<IdentityId, Identity>,
    by_label: HashMap<String, BTreeSet<IdentityId>>,
}

impl RosterTable {
    /// Build a table from rows. Rows with an empty identity are skipped.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = RosterRow>,
    {
        let mut identities: BTreeMap<IdentityId, Identity> = BTreeMap::new();

        for row in rows {
            let Some(id) = IdentityId::parse(&row.id) else {
                continue;
            };
            let identity = identities
                .entry(id.clone())
                .or_insert_with(|| Identity::new(id, &row.name));

            // First non-empty name wins
            if identity.full_name.is_empty() && !row.name.trim().is_empty() {
                identity.full_name = row.name.trim().to_string();
                identity.display_label = display_label(&row.name);
            }

            if let Some(tag) = row.tag.as_deref().map(str::trim) {
                if !tag.is_empty() {
                    identity.tags.insert(tag.to_string());
                }
            }
        }

        let mut by_label: HashMap<String, BTreeSet<IdentityId>> = HashMap::new();
        for identity in identities.values() {
            let key = identity.label_key();
            if !key.is_empty() {
                by_label.entry(key).or_default().insert(identity.id.clone());
            }
        }

        Self {
            identities,
            by_label,
        }
    }

    /// Parse a roster from JSON text.
    ///
    /// Accepts an array whose elements are either row objects or bare
    /// identity strings.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<RosterEntry> = serde_json::from_str(json)?;
        Ok(Self::from_rows(entries.into_iter().map(RosterRow::from)))
    }

    /// Load a roster file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let table = Self::from_json_str(&json)?;
        tracing::info!(
            "Loaded roster from {:?}: {} identities",
            path.as_ref(),
            table.len()
        );
        Ok(table)
    }

    /// Look up an identity by key.
    pub fn get(&self, id: &str) -> Option<&Identity> {
        self.identities.get(id)
    }

    /// Check whether an identity exists.
    pub fn contains(&self, id: &str) -> bool {
        self.identities.contains_key(id)
    }

    /// Find the identities whose display label matches `label`.
    pub fn candidates(&self, label: &str) -> LabelMatch {
        let Some(ids) = self.by_label.get(&label_key(label)) else {
            return LabelMatch::NotFound;
        };
        let mut iter = ids.iter();
        match (iter.next(), iter.next()) {
            (None, _) => LabelMatch::NotFound,
            (Some(only), None) => LabelMatch::Unique {
                identity: only.clone(),
            },
            _ => LabelMatch::Ambiguous {
                candidates: ids.iter().cloned().collect(),
            },
        }
    }

    /// Iterate identities in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.identities.values()
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
