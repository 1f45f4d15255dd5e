//! Sibling order assignment.
//!
//! # Responsibility
//! - Compute contiguous `1..=N` orders for one parent after an insert or
//!   reposition.
//! - Report only the siblings whose order actually changes.
//!
//! # Invariants
//! - Pure: no I/O, no clock, no randomness.
//! - Output orders are unique and contiguous for the whole sibling set.

pub mod assigner;
