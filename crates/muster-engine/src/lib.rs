//! Muster Engine - verification, teams and reconciliation
//!
//! The consistency core between the roster, the local stores and the
//! external community platform.
//!
//! # Architecture
//!
//! - **Verification**: claim a roster identity, emit tag and label actions
//! - **Lifecycle**: create / invite / join / kick / leave / disband teams
//! - **Slots**: capacity-limited role tags per category
//! - **Reconciliation**: rebuild claims and teams from a platform snapshot
//! - **Platform**: capability trait the external adapter implements
//!
//! Transitions commit to the stores first and return an ordered list of
//! [`Action`]s. Actions that must succeed (creating a team's resources) run
//! before the commit; all others are applied best effort afterwards.
//!
//! # Example
//!
//! ```no_run
//! use muster_engine::{Engine, EngineConfig, Journal};
//! use muster_roster::RosterTable;
//! use muster_store::{ClaimStore, ParticipantId, TeamStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let roster = RosterTable::load("roster.json")?;
//!     let mut engine = Engine::new(
//!         EngineConfig::default(),
//!         roster,
//!         ClaimStore::open("claimed_ids.json")?,
//!         TeamStore::open("teams.json")?,
//!     );
//!     let mut journal = Journal::new();
//!     let applied = engine.verify(&mut journal, "S1", &ParticipantId::new("p1"))?;
//!     println!("{} actions", applied.actions.len());
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod participant;
pub mod platform;
pub mod reconcile;
pub mod slots;
pub mod verify;

pub use action::{Action, NoticeTarget, ResourceKind, Tag};
pub use config::EngineConfig;
pub use engine::{Applied, Engine, Restored, Status};
pub use error::{EngineError, ErrorKind, Result};
pub use participant::Participant;
pub use platform::{apply_best_effort, ActionFailure, ApplyReport, Journal, Platform, PlatformError};
pub use reconcile::{ExternalSnapshot, ReconcileReport, ReconcileScope};
pub use slots::{RoleSlots, SlotCategory, SlotTable, ToggleOutcome};
pub use verify::Verified;
