//! Persisted identity claims.

use crate::error::{Result, StoreError};
use crate::file::JsonFile;
use crate::ids::ParticipantId;
use muster_roster::IdentityId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// What a successful [`ClaimStore::claim`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// New claim recorded
    Created,
    /// The participant already held exactly this claim
    AlreadyHeld,
    /// The participant's previous claim was dropped in favour of this one
    Replaced { previous: IdentityId },
}

/// Identity → participant claims.
///
/// At most one participant per identity, and at most one identity per
/// participant. Persisted as a flat `{ identity: participant }` object.
#[derive(Debug, Default)]
pub struct ClaimStore {
    claims: BTreeMap<IdentityId, ParticipantId>,
    by_participant: HashMap<ParticipantId, IdentityId>,
    file: Option<JsonFile>,
}

impl ClaimStore {
    /// Create a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`, loading it if it exists.
    ///
    /// Legacy files may list one participant under several identities; the
    /// lowest identity is kept and the rest are dropped with a warning.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = JsonFile::new(path);
        let loaded: BTreeMap<IdentityId, ParticipantId> = file.read()?.unwrap_or_default();

        let mut claims = BTreeMap::new();
        let mut by_participant = HashMap::new();
        for (identity, participant) in loaded {
            if let Some(kept) = by_participant.get(&participant) {
                tracing::warn!(
                    "Dropping duplicate claim {} for {} (keeping {})",
                    identity,
                    participant,
                    kept
                );
                continue;
            }
            by_participant.insert(participant.clone(), identity.clone());
            claims.insert(identity, participant);
        }

        tracing::debug!("Opened claim store {:?}: {} claims", file.path(), claims.len());
        Ok(Self {
            claims,
            by_participant,
            file: Some(file),
        })
    }

    /// Record that `participant` holds `identity`.
    ///
    /// Idempotent for the current claimant. Fails if another participant
    /// holds the identity. A different claim held by `participant` is
    /// removed in the same write.
    pub fn claim(
        &mut self,
        identity: &IdentityId,
        participant: &ParticipantId,
    ) -> Result<ClaimOutcome> {
        match self.claims.get(identity) {
            Some(claimant) if claimant == participant => return Ok(ClaimOutcome::AlreadyHeld),
            Some(claimant) => {
                return Err(StoreError::AlreadyClaimedByOther {
                    identity: identity.clone(),
                    claimant: claimant.clone(),
                })
            }
            None => {}
        }

        let previous = self.by_participant.get(participant).cloned();
        let mut next = self.claims.clone();
        if let Some(previous) = &previous {
            next.remove(previous);
        }
        next.insert(identity.clone(), participant.clone());
        self.commit(next)?;

        Ok(match previous {
            Some(previous) => ClaimOutcome::Replaced { previous },
            None => ClaimOutcome::Created,
        })
    }

    /// Remove the claim on `identity`, returning the former claimant.
    pub fn unclaim(&mut self, identity: &IdentityId) -> Result<Option<ParticipantId>> {
        let Some(claimant) = self.claims.get(identity).cloned() else {
            return Ok(None);
        };
        let mut next = self.claims.clone();
        next.remove(identity);
        self.commit(next)?;
        Ok(Some(claimant))
    }

    /// The identity held by `participant`, if any.
    pub fn claims_of(&self, participant: &ParticipantId) -> Option<&IdentityId> {
        self.by_participant.get(participant)
    }

    /// The participant holding `identity`, if any.
    pub fn claimant_of(&self, identity: &str) -> Option<&ParticipantId> {
        self.claims.get(identity)
    }

    /// All claims in identity order.
    pub fn all_claims(&self) -> impl Iterator<Item = (&IdentityId, &ParticipantId)> {
        self.claims.iter()
    }

    /// Copy of the claim map.
    pub fn to_map(&self) -> BTreeMap<IdentityId, ParticipantId> {
        self.claims.clone()
    }

    /// Replace every claim at once.
    pub fn replace_all(&mut self, claims: BTreeMap<IdentityId, ParticipantId>) -> Result<()> {
        self.commit(claims)
    }

    /// Check a replacement map without installing it.
    pub fn check(claims: &BTreeMap<IdentityId, ParticipantId>) -> Result<()> {
        index_claims(claims).map(|_| ())
    }

    /// Replace every claim from a JSON document in the persisted format.
    pub fn restore_json(&mut self, json: &str) -> Result<usize> {
        let claims: BTreeMap<IdentityId, ParticipantId> = serde_json::from_str(json)?;
        let count = claims.len();
        self.replace_all(claims)?;
        Ok(count)
    }

    /// Number of claims.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    fn commit(&mut self, next: BTreeMap<IdentityId, ParticipantId>) -> Result<()> {
        let index = index_claims(&next)?;
        if let Some(file) = &self.file {
            file.write(&next)?;
        }
        self.claims = next;
        self.by_participant = index;
        Ok(())
    }
}

fn index_claims(
    claims: &BTreeMap<IdentityId, ParticipantId>,
) -> Result<HashMap<ParticipantId, IdentityId>> {
    let mut index = HashMap::with_capacity(claims.len());
    for (identity, participant) in claims {
        if let Some(first) = index.insert(participant.clone(), identity.clone()) {
            return Err(StoreError::DuplicateClaimant {
                participant: participant.clone(),
                first,
                second: identity.clone(),
            });
        }
    }
    Ok(index)
}
