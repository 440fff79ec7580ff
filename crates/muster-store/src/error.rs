//! Error types for the stores.

use crate::ids::ParticipantId;
use muster_roster::IdentityId;
use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The identity is already claimed by another participant.
    #[error("identity {identity} is already claimed by {claimant}")]
    AlreadyClaimedByOther {
        identity: IdentityId,
        claimant: ParticipantId,
    },

    /// A participant holds more than one claim.
    #[error("participant {participant} claims both {first} and {second}")]
    DuplicateClaimant {
        participant: ParticipantId,
        first: IdentityId,
        second: IdentityId,
    },

    /// A team with this name already exists.
    #[error("team name {0:?} is taken")]
    NameTaken(String),

    /// The captain already belongs to a team.
    #[error("{captain} is already on team {team:?}")]
    CaptainAlreadyTeamed {
        captain: ParticipantId,
        team: String,
    },

    /// No team with this name exists.
    #[error("team {0:?} not found")]
    TeamNotFound(String),

    /// A participant appears in two teams.
    #[error("{participant} is a member of both {first:?} and {second:?}")]
    MemberConflict {
        participant: ParticipantId,
        first: String,
        second: String,
    },

    /// A team record violates a structural invariant.
    #[error("invalid team {team:?}: {reason}")]
    InvalidTeam { team: String, reason: String },

    /// A restore was requested for a file name no store recognizes.
    #[error("unknown restore target {0:?}")]
    UnknownRestoreTarget(String),
}
