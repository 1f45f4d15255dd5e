//! Reorder and move orchestration over sibling orders.
//!
//! # Responsibility
//! - Reposition a child within its parent.
//! - Move a scene to another chapter at a given position.
//!
//! # Invariants
//! - The sibling read, plan and grouped write of one parent run inside that
//!   parent's exclusive section.
//! - A rewritten sibling set ends numbered exactly `1..=N`.
//! - Nothing is written when the plan is already satisfied.
//! - The source chapter of a move is not compacted.

use crate::events::OperationKind;
use crate::model::outline::{ChapterId, EntityRef, FieldPatch, ParentRef, SceneId, ScenePatch};
use crate::model::validation::OutlineValidationError;
use crate::order::assigner::{plan_position, plan_swap};
use crate::repo::outline_repo::OutlineRepository;
use crate::service::context::OutlineContext;
use crate::service::error::{OutlineError, OutlineResult};
use log::{error, info};
use std::time::Instant;
use uuid::Uuid;

/// Persisted effect of one reorder/move/swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Parent whose sibling set was planned.
    pub parent: ParentRef,
    /// Number of field patches written; zero for a no-op.
    pub writes: usize,
    /// Final zero-based position of the repositioned entity.
    pub position: usize,
}

/// Reorder/move service.
pub struct ContainerMutator<R: OutlineRepository> {
    repo: R,
    context: OutlineContext,
}

impl<R: OutlineRepository> ContainerMutator<R> {
    pub fn new(repo: R, context: OutlineContext) -> Self {
        Self { repo, context }
    }

    /// Moves `moved_id` to `target_index` among the children of `parent`.
    ///
    /// Indexes past the end append; negative indexes insert at the start.
    ///
    /// # Errors
    /// - `NotFound` when `parent` is gone or `moved_id` is not its child.
    /// - `Persistence` when the grouped write fails; nothing is applied.
    pub fn reorder_within_parent(
        &self,
        parent: ParentRef,
        moved_id: Uuid,
        target_index: i64,
    ) -> OutlineResult<MutationOutcome> {
        let started_at = Instant::now();
        let result = {
            let _section = self.context.locks().lock(parent);
            self.reorder_locked(parent, moved_id, target_index)
        };
        self.finish(OperationKind::Reorder, parent, started_at, result)
    }

    /// Moves a scene from `source` to `target` at `target_index`.
    ///
    /// The scene's chapter reference is rewritten first, then the target's
    /// siblings are renumbered, all in one grouped write. When `source` and
    /// `target` are the same chapter this is a reorder.
    ///
    /// # Errors
    /// - `NotFound` when the scene is gone, is not in `source`, or `target`
    ///   is gone.
    /// - `Validation(ProjectMismatch)` when `target` belongs to another
    ///   project.
    pub fn move_across_parent(
        &self,
        scene_id: SceneId,
        source: ChapterId,
        target: ChapterId,
        target_index: i64,
    ) -> OutlineResult<MutationOutcome> {
        let started_at = Instant::now();
        let target_parent = ParentRef::Chapter(target);
        let result = if source == target {
            let _section = self.context.locks().lock(target_parent);
            self.reorder_locked(target_parent, scene_id, target_index)
        } else {
            let _section = self
                .context
                .locks()
                .lock_all([ParentRef::Chapter(source), target_parent]);
            self.move_locked(scene_id, source, target, target_index)
        };
        self.finish(OperationKind::Move, target_parent, started_at, result)
    }

    /// Exchanges the orders of two children of `parent`.
    pub fn swap_siblings(
        &self,
        parent: ParentRef,
        first: Uuid,
        second: Uuid,
    ) -> OutlineResult<MutationOutcome> {
        let started_at = Instant::now();
        let result = if first == second {
            Err(OutlineValidationError::SelfSwap.into())
        } else {
            let _section = self.context.locks().lock(parent);
            self.swap_locked(parent, first, second)
        };
        self.finish(OperationKind::Reorder, parent, started_at, result)
    }

    fn reorder_locked(
        &self,
        parent: ParentRef,
        moved_id: Uuid,
        target_index: i64,
    ) -> OutlineResult<MutationOutcome> {
        let siblings = self.repo.list_children(parent)?;
        if !siblings.iter().any(|slot| slot.id == moved_id) {
            return Err(self.missing_child(parent, moved_id)?);
        }

        let plan = plan_position(&siblings, &moved_id, target_index);
        let patches: Vec<FieldPatch> = plan
            .changes
            .iter()
            .map(|change| FieldPatch::set_order(parent, change.id, change.order))
            .collect();
        self.write(&patches)?;

        Ok(MutationOutcome {
            parent,
            writes: patches.len(),
            position: plan.position,
        })
    }

    fn move_locked(
        &self,
        scene_id: SceneId,
        source: ChapterId,
        target: ChapterId,
        target_index: i64,
    ) -> OutlineResult<MutationOutcome> {
        let scene = self
            .repo
            .get_scene(scene_id)?
            .filter(|scene| scene.chapter_id == source)
            .ok_or(OutlineError::NotFound(EntityRef::Scene(scene_id)))?;
        let target_chapter = self
            .repo
            .get_chapter(target)?
            .ok_or(OutlineError::NotFound(EntityRef::Chapter(target)))?;
        if target_chapter.project_id != scene.project_id {
            return Err(OutlineValidationError::ProjectMismatch.into());
        }

        let target_parent = ParentRef::Chapter(target);
        let siblings = self.repo.list_children(target_parent)?;
        let plan = plan_position(&siblings, &scene_id, target_index);

        let mut patches = Vec::with_capacity(plan.changes.len() + 1);
        patches.push(FieldPatch::Scene(
            scene_id,
            ScenePatch {
                chapter_id: Some(target),
                ..ScenePatch::default()
            },
        ));
        patches.extend(
            plan.changes
                .iter()
                .map(|change| FieldPatch::set_order(target_parent, change.id, change.order)),
        );
        self.write(&patches)?;

        Ok(MutationOutcome {
            parent: target_parent,
            writes: patches.len(),
            position: plan.position,
        })
    }

    fn swap_locked(
        &self,
        parent: ParentRef,
        first: Uuid,
        second: Uuid,
    ) -> OutlineResult<MutationOutcome> {
        let siblings = self.repo.list_children(parent)?;
        let Some(changes) = plan_swap(&siblings, &first, &second) else {
            let missing = if siblings.iter().any(|slot| slot.id == first) {
                second
            } else {
                first
            };
            return Err(self.missing_child(parent, missing)?);
        };

        let patches: Vec<FieldPatch> = changes
            .iter()
            .map(|change| FieldPatch::set_order(parent, change.id, change.order))
            .collect();
        self.write(&patches)?;

        let position = siblings
            .iter()
            .position(|slot| slot.id == first)
            .unwrap_or_default();
        Ok(MutationOutcome {
            parent,
            writes: patches.len(),
            position,
        })
    }

    fn write(&self, patches: &[FieldPatch]) -> OutlineResult<()> {
        if patches.is_empty() {
            return Ok(());
        }
        self.repo.run_grouped(patches)?;
        Ok(())
    }

    /// Picks the precise `NotFound` for a child absent from `parent`.
    fn missing_child(&self, parent: ParentRef, child_id: Uuid) -> OutlineResult<OutlineError> {
        if !self.repo.parent_exists(parent)? {
            return Ok(OutlineError::NotFound(parent.as_entity()));
        }
        Ok(OutlineError::NotFound(parent.child(child_id)))
    }

    fn finish(
        &self,
        kind: OperationKind,
        parent: ParentRef,
        started_at: Instant,
        result: OutlineResult<MutationOutcome>,
    ) -> OutlineResult<MutationOutcome> {
        match &result {
            Ok(outcome) => info!(
                "event=outline_{kind} module=ordering status=ok parent={parent} writes={} position={} duration_ms={}",
                outcome.writes,
                outcome.position,
                started_at.elapsed().as_millis()
            ),
            Err(err) => {
                error!(
                    "event=outline_{kind} module=ordering status=error parent={parent} duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                self.context.events().on_operation_failed(kind, parent, err);
            }
        }
        result
    }
}
