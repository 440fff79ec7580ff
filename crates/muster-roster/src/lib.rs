//! Muster Roster
//!
//! The static whitelist of identities that participants may claim.
//!
//! # Design
//!
//! The roster is loaded once at process start from a JSON file and is
//! read-only afterwards. Each identity carries a display label (the first
//! token of its full name) and a set of attribute tags such as the games
//! it is enrolled for. Several rows may name the same identity; their tags
//! accumulate.
//!
//! A secondary index maps the normalized display label to every identity
//! sharing it. Reconciliation uses it to link an already-tagged participant
//! back to an identity, and must treat shared labels as ambiguous.

mod error;
mod identity;
mod table;

pub use error::{Result, RosterError};
pub use identity::{display_label, label_key, Identity, IdentityId};
pub use table::{LabelMatch, RosterRow, RosterTable};
