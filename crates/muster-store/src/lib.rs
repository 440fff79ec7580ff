//! Muster Store - persisted claims and teams.
//!
//! Both stores are small keyed maps held in memory and mirrored to a JSON
//! file. Every mutation builds the next map, writes it to disk with a
//! whole-file atomic replace, and only then installs it in memory, so a
//! failed write is never observed as success.
//!
//! # Stores
//!
//! - [`ClaimStore`]: identity → participant, at most one claimant per
//!   identity and at most one claim per participant
//! - [`TeamStore`]: team name → [`Team`], with a participant → team index
//!   enforcing that nobody is on two teams
//!
//! # Restore
//!
//! [`RestoreTarget`] maps an operator-supplied file name onto the store it
//! replaces.

mod claims;
mod error;
mod file;
mod ids;
mod restore;
mod team;
mod teams;

pub use claims::{ClaimOutcome, ClaimStore};
pub use error::{Result, StoreError};
pub use file::JsonFile;
pub use ids::{ParticipantId, ResourceId};
pub use restore::RestoreTarget;
pub use team::{Relation, ResourceHandles, Team};
pub use teams::TeamStore;

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
