//! Guarded scene creation.
//!
//! # Responsibility
//! - Turn bursty "add scene" input into at most one creation per chapter.
//! - Append new scenes at `max(order) + 1` under the chapter's exclusive
//!   section, shared with reorder and move.
//!
//! # Invariants
//! - Field validation and admission both happen before any repository call.
//! - Every validation failure, including a chapter owned by another
//!   project, is reported as a creation rejection.
//! - An admitted creation is always settled (`complete` or `fail`), even
//!   when the repository errors or the thread unwinds.

use crate::events::{OperationKind, RejectionReason};
use crate::guard::creation::CreationState;
use crate::model::outline::{ChapterId, ParentRef, ProjectId, Scene, SceneDraft, SceneKind};
use crate::model::validation::{normalize_title, OutlineValidationError};
use crate::order::assigner::next_order;
use crate::repo::outline_repo::OutlineRepository;
use crate::service::context::OutlineContext;
use crate::service::error::{OutlineError, OutlineResult};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::time::Instant;
use uuid::Uuid;

/// Input for one scene creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneCreationRequest {
    pub project_id: ProjectId,
    pub chapter_id: ChapterId,
    /// `None` picks `Scene N` / `Canvas N` from the assigned order.
    pub title: Option<String>,
    pub kind: SceneKind,
    /// `None` picks the empty document for `kind`.
    pub content: Option<String>,
}

impl SceneCreationRequest {
    pub fn text(project_id: ProjectId, chapter_id: ChapterId) -> Self {
        Self {
            project_id,
            chapter_id,
            title: None,
            kind: SceneKind::Text,
            content: None,
        }
    }

    pub fn canvas(project_id: ProjectId, chapter_id: ChapterId) -> Self {
        Self {
            kind: SceneKind::Canvas,
            ..Self::text(project_id, chapter_id)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Scene creation service.
pub struct SceneCreationService<R: OutlineRepository> {
    repo: R,
    context: OutlineContext,
}

impl<R: OutlineRepository> SceneCreationService<R> {
    pub fn new(repo: R, context: OutlineContext) -> Self {
        Self { repo, context }
    }

    /// Creates one scene at the end of the request's chapter.
    ///
    /// # Errors
    /// - `Validation` for blank ids/title, or a chapter of another project.
    /// - `AlreadyInProgress` when a creation for the chapter is in flight.
    /// - `NotFound` when the chapter is gone.
    /// - `Persistence` when the insert fails; the admission is released.
    pub fn create_scene(&self, request: &SceneCreationRequest) -> OutlineResult<Scene> {
        let parent = ParentRef::Chapter(request.chapter_id);

        let title = match validate_request(request) {
            Ok(title) => title,
            Err(err) => return Err(self.reject(parent, RejectionReason::ValidationError, err.into())),
        };

        let Some(ticket) = self.context.creation_guard().begin(request.chapter_id) else {
            return Err(self.reject(
                parent,
                RejectionReason::AlreadyInProgress,
                OutlineError::AlreadyInProgress(parent),
            ));
        };

        let started_at = Instant::now();
        let result = {
            let _section = self.context.locks().lock(parent);
            self.insert_locked(request, title)
        };

        match result {
            Ok(scene) => {
                ticket.complete(scene.id);
                info!(
                    "event=scene_create module=creation status=ok parent={parent} scene={} order={} kind={} duration_ms={}",
                    scene.id,
                    scene.order,
                    scene.kind.as_str(),
                    started_at.elapsed().as_millis()
                );
                self.context.events().on_child_created(parent, scene.id);
                Ok(scene)
            }
            Err(err @ OutlineError::Validation(_)) => {
                ticket.fail();
                Err(self.reject(parent, RejectionReason::ValidationError, err))
            }
            Err(err) => {
                ticket.fail();
                error!(
                    "event=scene_create module=creation status=error parent={parent} duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                self.context
                    .events()
                    .on_operation_failed(OperationKind::Create, parent, &err);
                Err(err)
            }
        }
    }

    pub fn create_text_scene(&self, project_id: ProjectId, chapter_id: ChapterId) -> OutlineResult<Scene> {
        self.create_scene(&SceneCreationRequest::text(project_id, chapter_id))
    }

    pub fn create_canvas_scene(&self, project_id: ProjectId, chapter_id: ChapterId) -> OutlineResult<Scene> {
        self.create_scene(&SceneCreationRequest::canvas(project_id, chapter_id))
    }

    /// Ledger snapshot for `chapter_id`.
    pub fn creation_state(&self, chapter_id: ChapterId) -> CreationState {
        self.context.creation_guard().state(&chapter_id)
    }

    pub fn can_create_scene(&self, chapter_id: ChapterId) -> bool {
        self.context.creation_guard().can_create(&chapter_id)
    }

    /// Clears a stuck admission for `chapter_id`.
    pub fn reset_creation_state(&self, chapter_id: ChapterId) {
        self.context.creation_guard().reset(&chapter_id);
    }

    fn insert_locked(&self, request: &SceneCreationRequest, title: Option<String>) -> OutlineResult<Scene> {
        let parent = ParentRef::Chapter(request.chapter_id);
        let chapter = self
            .repo
            .get_chapter(request.chapter_id)?
            .ok_or(OutlineError::NotFound(parent.as_entity()))?;
        if chapter.project_id != request.project_id {
            return Err(OutlineValidationError::ProjectMismatch.into());
        }

        let order = next_order(&self.repo.list_children(parent)?);
        let draft = SceneDraft {
            title: title.unwrap_or_else(|| default_title(request.kind, order)),
            order,
            kind: request.kind,
            content: request
                .content
                .clone()
                .unwrap_or_else(|| empty_content(request.kind)),
            file_path: match request.kind {
                SceneKind::Text => None,
                SceneKind::Canvas => Some(canvas_file_path(request.project_id, Utc::now(), Uuid::new_v4())),
            },
        };
        Ok(self.repo.create_scene(request.chapter_id, &draft)?)
    }

    fn reject(&self, parent: ParentRef, reason: RejectionReason, err: OutlineError) -> OutlineError {
        warn!("event=scene_create module=creation status=rejected parent={parent} reason={reason}");
        self.context.events().on_creation_rejected(parent, reason);
        err
    }
}

/// Checks ids and normalizes an explicit title.
fn validate_request(request: &SceneCreationRequest) -> Result<Option<String>, OutlineValidationError> {
    if request.project_id.is_nil() {
        return Err(OutlineValidationError::BlankField("project_id"));
    }
    if request.chapter_id.is_nil() {
        return Err(OutlineValidationError::BlankField("chapter_id"));
    }
    request
        .title
        .as_deref()
        .map(|title| normalize_title("title", title))
        .transpose()
}

fn default_title(kind: SceneKind, order: i64) -> String {
    match kind {
        SceneKind::Text => format!("Scene {order}"),
        SceneKind::Canvas => format!("Canvas {order}"),
    }
}

fn empty_content(kind: SceneKind) -> String {
    match kind {
        SceneKind::Text => String::new(),
        SceneKind::Canvas => serde_json::json!({
            "elements": [],
            "appState": {},
            "files": {},
        })
        .to_string(),
    }
}

/// `canvas/<project>/<utc stamp>-<nonce>.excalidraw`. The stamp keeps only
/// path-safe characters; the nonce separates creations in the same millisecond.
fn canvas_file_path(project_id: ProjectId, at: DateTime<Utc>, nonce: Uuid) -> String {
    let stamp = at.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let nonce = nonce.simple().to_string();
    format!("canvas/{project_id}/{stamp}-{}.excalidraw", &nonce[..8])
}
