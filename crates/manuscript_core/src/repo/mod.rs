//! Outline persistence contracts and the SQLite implementation.
//!
//! # Responsibility
//! - Define the ordered-entity repository the ordering and creation
//!   services consume.
//! - Keep SQL inside the repository boundary.
//!
//! # Invariants
//! - Children are listed by `sort_order ASC`, ties broken by creation time
//!   then id, so the listing is deterministic.
//! - `run_grouped` applies all patches or none.

pub mod outline_repo;
