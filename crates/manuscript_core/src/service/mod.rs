//! Outline use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls behind the shared per-parent lock table.
//! - Surface typed results and report outcomes through `OutlineEvents`.

pub mod container_mutator;
pub mod context;
pub mod error;
pub mod outline_service;
pub mod scene_creation;
