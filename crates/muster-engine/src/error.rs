//! Error taxonomy for engine transitions.

use crate::platform::PlatformError;
use muster_roster::IdentityId;
use muster_store::{ParticipantId, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Broad class of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing input. No state change.
    Validation,
    /// The request conflicts with current state. No state change.
    Conflict,
    /// An essential external action failed before commit. No state change.
    External,
    /// The store could not be read or written.
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::External => write!(f, "external"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

/// Errors returned by engine transitions.
#[derive(Debug, Error)]
pub enum EngineError {
    // --- Validation ---
    #[error("identity {0:?} is not on the roster")]
    UnknownIdentity(String),

    #[error("invalid team name {name:?}: {reason}")]
    InvalidTeamName { name: String, reason: String },

    #[error("unknown game {0:?}")]
    UnknownGame(String),

    #[error("team {0:?} not found")]
    TeamNotFound(String),

    #[error("unknown role tag {0:?}")]
    UnknownTag(String),

    #[error("unknown restore target {0:?}")]
    UnknownRestoreTarget(String),

    #[error("invalid restore payload: {0}")]
    InvalidRestore(String),

    // --- Conflict ---
    #[error("identity {identity} is already claimed by another participant")]
    AlreadyClaimedByOther {
        identity: IdentityId,
        claimant: ParticipantId,
    },

    #[error("team name {0:?} is taken")]
    NameTaken(String),

    #[error("{captain} already leads or plays for {team:?}")]
    CaptainAlreadyTeamed {
        captain: ParticipantId,
        team: String,
    },

    #[error("{participant} is not the captain of {team:?}")]
    NotCaptain {
        team: String,
        participant: ParticipantId,
    },

    #[error("{participant} is already on team {team:?}")]
    TargetAlreadyTeamed {
        participant: ParticipantId,
        team: String,
    },

    #[error("{participant} cannot be invited: {reason}")]
    TargetNotEligible {
        participant: ParticipantId,
        reason: String,
    },

    #[error("{participant} has no invite to {team:?}")]
    NotInvited {
        team: String,
        participant: ParticipantId,
    },

    #[error("{participant} is already on team {team:?}")]
    AlreadyTeamed {
        participant: ParticipantId,
        team: String,
    },

    #[error("a captain cannot kick themselves")]
    CannotKickSelf,

    #[error("{participant} is not a member of {team:?}")]
    TargetNotMember {
        team: String,
        participant: ParticipantId,
    },

    #[error("the captain of {0:?} cannot leave; disband the team instead")]
    CaptainCannotLeave(String),

    #[error("category {category} is full ({})", .blocking.join(", "))]
    CategoryFull {
        category: String,
        blocking: Vec<String>,
    },

    // --- External ---
    #[error("creating team resources failed: {0}")]
    ResourceCreation(#[source] PlatformError),

    // --- Storage ---
    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl EngineError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownIdentity(_)
            | Self::InvalidTeamName { .. }
            | Self::UnknownGame(_)
            | Self::TeamNotFound(_)
            | Self::UnknownTag(_)
            | Self::UnknownRestoreTarget(_)
            | Self::InvalidRestore(_) => ErrorKind::Validation,

            Self::AlreadyClaimedByOther { .. }
            | Self::NameTaken(_)
            | Self::CaptainAlreadyTeamed { .. }
            | Self::NotCaptain { .. }
            | Self::TargetAlreadyTeamed { .. }
            | Self::TargetNotEligible { .. }
            | Self::NotInvited { .. }
            | Self::AlreadyTeamed { .. }
            | Self::CannotKickSelf
            | Self::TargetNotMember { .. }
            | Self::CaptainCannotLeave(_)
            | Self::CategoryFull { .. } => ErrorKind::Conflict,

            Self::ResourceCreation(_) => ErrorKind::External,

            Self::Store(_) => ErrorKind::Storage,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyClaimedByOther { identity, claimant } => {
                Self::AlreadyClaimedByOther { identity, claimant }
            }
            StoreError::NameTaken(name) => Self::NameTaken(name),
            StoreError::CaptainAlreadyTeamed { captain, team } => {
                Self::CaptainAlreadyTeamed { captain, team }
            }
            StoreError::TeamNotFound(name) => Self::TeamNotFound(name),
            StoreError::UnknownRestoreTarget(name) => Self::UnknownRestoreTarget(name),
            other => Self::Store(other),
        }
    }
}
