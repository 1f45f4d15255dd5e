//! Core of the manuscript outline: Project → Chapter → Scene.
//! Owns sibling ordering, cross-chapter moves and guarded scene creation.

pub mod config;
pub mod db;
pub mod events;
pub mod guard;
pub mod logging;
pub mod model;
pub mod order;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use events::{NoopEvents, OperationKind, OutlineEvents, RejectionReason};
pub use guard::creation::{CreationGuard, CreationState, CreationTicket};
pub use guard::parent_lock::{ParentLock, ParentLockTable};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::outline::{
    Chapter, ChapterDraft, ChapterId, ChapterPatch, EntityRef, FieldPatch, ParentRef, Project,
    ProjectDraft, ProjectId, ProjectPatch, Scene, SceneDraft, SceneId, SceneKind, ScenePatch,
    SiblingSlot,
};
pub use model::validation::OutlineValidationError;
pub use order::assigner::{next_order, plan_position, plan_swap, OrderChange, OrderPlan};
pub use repo::outline_repo::{
    OutlineRepoError, OutlineRepoResult, OutlineRepository, SqliteOutlineRepository,
};
pub use service::container_mutator::{ContainerMutator, MutationOutcome};
pub use service::context::OutlineContext;
pub use service::error::{OutlineError, OutlineResult};
pub use service::outline_service::{ChapterOutline, OutlineService, ProjectOutline};
pub use service::scene_creation::{SceneCreationRequest, SceneCreationService};

/// Minimal health-check API for embedding hosts.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
