//! Outline domain model: projects, chapters and scenes.
//!
//! # Responsibility
//! - Define the records persisted by the outline store.
//! - Define the parent/entity addressing shared by ordering, locking and
//!   creation admission.
//!
//! # Invariants
//! - Chapters never change project; scenes change chapter only through a
//!   move.
//! - `order` is a positive integer scoped to one parent.

pub mod outline;
pub mod validation;
