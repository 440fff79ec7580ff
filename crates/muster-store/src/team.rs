//! Team record.

use crate::ids::{ParticipantId, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// External resources owned by a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandles {
    /// Team role granted to every member
    pub role: ResourceId,

    /// Private text channel
    pub text: ResourceId,

    /// Private voice channel (may be unknown after a rebuild)
    #[serde(default)]
    pub voice: Option<ResourceId>,
}

/// How a participant relates to a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    None,
    Invited,
    Member,
    Captain,
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Invited => write!(f, "Invited"),
            Self::Member => write!(f, "Member"),
            Self::Captain => write!(f, "Captain"),
        }
    }
}

/// A named team with one captain and exclusive membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Unique, case-sensitive name
    pub name: String,

    /// Game the team plays
    pub game: String,

    /// Captain (always a member)
    pub captain: ParticipantId,

    /// Members in join order, captain first
    pub members: Vec<ParticipantId>,

    /// Pending invites (never members)
    #[serde(default)]
    pub invites: BTreeSet<ParticipantId>,

    /// External resource handles
    pub resources: ResourceHandles,

    /// Unix timestamp in milliseconds
    pub created_at: u64,
}

impl Team {
    /// Create a team whose only member is its captain.
    pub fn new(
        name: String,
        game: String,
        captain: ParticipantId,
        resources: ResourceHandles,
        created_at: u64,
    ) -> Self {
        Self {
            name,
            game,
            members: vec![captain.clone()],
            captain,
            invites: BTreeSet::new(),
            resources,
            created_at,
        }
    }

    /// Relation of `participant` to this team.
    pub fn relation(&self, participant: &ParticipantId) -> Relation {
        if &self.captain == participant {
            Relation::Captain
        } else if self.members.contains(participant) {
            Relation::Member
        } else if self.invites.contains(participant) {
            Relation::Invited
        } else {
            Relation::None
        }
    }

    /// Check if `participant` is a member (captain included).
    pub fn is_member(&self, participant: &ParticipantId) -> bool {
        self.members.contains(participant)
    }

    /// Check if `participant` is the captain.
    pub fn is_captain(&self, participant: &ParticipantId) -> bool {
        &self.captain == participant
    }

    /// Record an invite. Returns false if already invited or a member.
    pub fn add_invite(&mut self, participant: &ParticipantId) -> bool {
        if self.is_member(participant) {
            return false;
        }
        self.invites.insert(participant.clone())
    }

    /// Turn an invite into membership. Returns false if not invited.
    pub fn accept_invite(&mut self, participant: &ParticipantId) -> bool {
        if !self.invites.remove(participant) {
            return false;
        }
        self.members.push(participant.clone());
        true
    }

    /// Remove a non-captain member. Returns false if not removable.
    pub fn remove_member(&mut self, participant: &ParticipantId) -> bool {
        if self.is_captain(participant) {
            return false;
        }
        let before = self.members.len();
        self.members.retain(|m| m != participant);
        self.members.len() != before
    }

    /// Check structural invariants of a single record.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("empty name".into());
        }
        if !self.members.contains(&self.captain) {
            return Err(format!("captain {} is not a member", self.captain));
        }
        if self.members.first() != Some(&self.captain) {
            return Err(format!("captain {} is not listed first", self.captain));
        }
        let mut seen = HashSet::with_capacity(self.members.len());
        for member in &self.members {
            if !seen.insert(member) {
                return Err(format!("{} listed twice", member));
            }
            if self.invites.contains(member) {
                return Err(format!("{} is both member and invitee", member));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team() -> Team {
        Team::new(
            "Alpha".into(),
            "valorant".into(),
            ParticipantId::new("p1"),
            ResourceHandles {
                role: ResourceId::new("r1"),
                text: ResourceId::new("t1"),
                voice: Some(ResourceId::new("v1")),
            },
            1_700_000_000_000,
        )
    }

    #[test]
    fn new_team_has_captain_as_member() {
        let team = team();
        assert_eq!(team.members, vec![ParticipantId::new("p1")]);
        assert_eq!(team.relation(&ParticipantId::new("p1")), Relation::Captain);
        assert!(team.validate().is_ok());
    }

    #[test]
    fn captain_must_be_listed_first() {
        let mut team = team();
        team.members.insert(0, ParticipantId::new("p2"));
        let err = team.validate().unwrap_err();
        assert!(err.contains("not listed first"));

        team.members.swap(0, 1);
        assert!(team.validate().is_ok());
    }

    #[test]
    fn invite_accept_remove() {
        let mut team = team();
        let p2 = ParticipantId::new("p2");

        assert!(team.add_invite(&p2));
        assert!(!team.add_invite(&p2));
        assert_eq!(team.relation(&p2), Relation::Invited);

        assert!(team.accept_invite(&p2));
        assert!(!team.accept_invite(&p2));
        assert_eq!(team.relation(&p2), Relation::Member);
        assert!(team.invites.is_empty());

        assert!(team.remove_member(&p2));
        assert_eq!(team.relation(&p2), Relation::None);
    }

    #[test]
    fn captain_not_removable() {
        let mut team = team();
        assert!(!team.remove_member(&ParticipantId::new("p1")));
        assert!(!team.add_invite(&ParticipantId::new("p1")));
    }

    #[test]
    fn validate_catches_overlap() {
        let mut team = team();
        team.invites.insert(ParticipantId::new("p1"));
        assert!(team.validate().is_err());

        let mut team = self::team();
        team.members.clear();
        assert!(team.validate().is_err());
    }

    #[test]
    fn serialize_deserialize() {
        let team = team();
        let json = serde_json::to_string(&team).unwrap();
        let parsed: Team = serde_json::from_str(&json).unwrap();
        assert_eq!(team, parsed);
    }
}
