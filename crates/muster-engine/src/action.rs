//! External actions emitted by transitions.
//!
//! The engine never touches the community platform directly. Each
//! transition produces an ordered list of [`Action`]s; a
//! [`Platform`](crate::Platform) implementation carries them out.

use muster_store::{ParticipantId, ResourceId};
use serde::{Deserialize, Serialize};

/// A tag a participant can hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Tag {
    /// A platform-wide tag looked up by name (Verified, Solo, game tags)
    Named(String),
    /// A team role created by the engine
    Role(ResourceId),
}

impl Tag {
    /// Named tag shorthand.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{}", name),
            Self::Role(id) => write!(f, "role:{}", id),
        }
    }
}

/// Kinds of external resources a team owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Role,
    Text,
    Voice,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Role => write!(f, "role"),
            Self::Text => write!(f, "text"),
            Self::Voice => write!(f, "voice"),
        }
    }
}

/// Where a notice is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NoticeTarget {
    /// Direct message to a participant
    Participant(ParticipantId),
    /// A channel the engine holds a handle for
    Channel(ResourceId),
    /// The first channel that exists among these names
    FirstChannelNamed(Vec<String>),
}

/// One side effect on the external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    SetDisplayLabel {
        participant: ParticipantId,
        label: String,
    },
    GrantTag {
        participant: ParticipantId,
        tag: Tag,
    },
    RevokeTag {
        participant: ParticipantId,
        tag: Tag,
    },
    /// Records resources created inline during team creation.
    CreateResourceGroup {
        team: String,
        group: String,
        role: ResourceId,
        text: ResourceId,
        voice: Option<ResourceId>,
    },
    DeleteResource {
        kind: ResourceKind,
        resource: ResourceId,
    },
    SetResourceAccess {
        resource: ResourceId,
        participant: ParticipantId,
        allow: bool,
    },
    SendNotice {
        target: NoticeTarget,
        text: String,
    },
}

impl Action {
    /// The participant this action is about, if any.
    pub fn participant(&self) -> Option<&ParticipantId> {
        match self {
            Self::SetDisplayLabel { participant, .. }
            | Self::GrantTag { participant, .. }
            | Self::RevokeTag { participant, .. }
            | Self::SetResourceAccess { participant, .. } => Some(participant),
            Self::SendNotice {
                target: NoticeTarget::Participant(participant),
                ..
            } => Some(participant),
            _ => None,
        }
    }

    pub(crate) fn grant(participant: &ParticipantId, tag: Tag) -> Self {
        Self::GrantTag {
            participant: participant.clone(),
            tag,
        }
    }

    pub(crate) fn revoke(participant: &ParticipantId, tag: Tag) -> Self {
        Self::RevokeTag {
            participant: participant.clone(),
            tag,
        }
    }

    pub(crate) fn access(resource: &ResourceId, participant: &ParticipantId, allow: bool) -> Self {
        Self::SetResourceAccess {
            resource: resource.clone(),
            participant: participant.clone(),
            allow,
        }
    }

    pub(crate) fn notice(target: NoticeTarget, text: impl Into<String>) -> Self {
        Self::SendNotice {
            target,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetDisplayLabel { participant, label } => {
                write!(f, "set-label {} {:?}", participant, label)
            }
            Self::GrantTag { participant, tag } => write!(f, "grant {} {}", participant, tag),
            Self::RevokeTag { participant, tag } => write!(f, "revoke {} {}", participant, tag),
            Self::CreateResourceGroup { team, group, .. } => {
                write!(f, "created resources for {:?} in {:?}", team, group)
            }
            Self::DeleteResource { kind, resource } => write!(f, "delete {} {}", kind, resource),
            Self::SetResourceAccess {
                resource,
                participant,
                allow,
            } => write!(
                f,
                "{} {} on {}",
                if *allow { "allow" } else { "deny" },
                participant,
                resource
            ),
            Self::SendNotice { target, .. } => write!(f, "notice to {:?}", target),
        }
    }
}
