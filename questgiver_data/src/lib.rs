//! Shared data model for Questgiver dialogs and quests.
//!
//! Everything in this crate is plain, serde-friendly data. Behavior (callbacks,
//! predicates, factories) lives in the `questgiver` runtime and is re-attached
//! after a save is loaded.

pub mod defs;
pub mod validate;

pub use defs::*;
pub use validate::{ValidationError, validate_unique_ids};
