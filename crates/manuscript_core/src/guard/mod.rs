//! Per-parent exclusion and creation admission.
//!
//! # Responsibility
//! - Serialize every read-modify-write span over one parent's sibling set.
//! - Reject (never queue) a second scene creation for a chapter while one is
//!   in flight, and keep a small per-chapter usage ledger.
//!
//! # Invariants
//! - A held lock or admitted creation is released on every exit path,
//!   including unwinding, through `Drop`.
//! - Multi-key acquisition is all-or-nothing, so opposite-direction moves
//!   cannot deadlock.

pub mod creation;
pub mod parent_lock;
