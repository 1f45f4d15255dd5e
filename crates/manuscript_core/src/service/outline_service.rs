//! Project/chapter/scene CRUD around the ordered hierarchy.
//!
//! # Responsibility
//! - Validate and create projects and chapters.
//! - Rename, save and delete records without breaking sibling uniqueness.
//! - Produce ordered outline snapshots for views.
//!
//! # Invariants
//! - Chapter creation appends at `max(order) + 1` inside the project's
//!   exclusive section.
//! - Deletes never renumber the remaining siblings.

use crate::model::outline::{
    Chapter, ChapterDraft, ChapterId, ChapterPatch, EntityRef, FieldPatch, ParentRef, Project,
    ProjectDraft, ProjectId, Scene, SceneId, ScenePatch,
};
use crate::model::validation::{normalize_project_draft, normalize_title};
use crate::order::assigner::next_order;
use crate::repo::outline_repo::OutlineRepository;
use crate::service::context::OutlineContext;
use crate::service::error::{OutlineError, OutlineResult};
use log::{info, warn};
use serde::Serialize;

/// One chapter with its scenes in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterOutline {
    pub chapter: Chapter,
    pub scenes: Vec<Scene>,
}

/// One project with its chapters in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectOutline {
    pub project: Project,
    pub chapters: Vec<ChapterOutline>,
}

/// Outline CRUD service.
pub struct OutlineService<R: OutlineRepository> {
    repo: R,
    context: OutlineContext,
}

impl<R: OutlineRepository> OutlineService<R> {
    pub fn new(repo: R, context: OutlineContext) -> Self {
        Self { repo, context }
    }

    pub fn create_project(&self, draft: &ProjectDraft) -> OutlineResult<Project> {
        let normalized = normalize_project_draft(draft)?;
        let project = self.repo.create_project(&normalized)?;
        info!("event=project_create module=outline status=ok project={}", project.id);
        Ok(project)
    }

    pub fn list_projects(&self) -> OutlineResult<Vec<Project>> {
        Ok(self.repo.list_projects()?)
    }

    /// Appends a chapter to `project_id`.
    pub fn create_chapter(&self, project_id: ProjectId, title: &str) -> OutlineResult<Chapter> {
        let title = normalize_title("title", title)?;
        let parent = ParentRef::Project(project_id);

        let _section = self.context.locks().lock(parent);
        if !self.repo.parent_exists(parent)? {
            return Err(OutlineError::NotFound(parent.as_entity()));
        }
        let order = next_order(&self.repo.list_children(parent)?);
        let chapter = self
            .repo
            .create_chapter(project_id, &ChapterDraft { title, order })?;
        info!(
            "event=chapter_create module=outline status=ok parent={parent} chapter={} order={}",
            chapter.id, chapter.order
        );
        Ok(chapter)
    }

    pub fn list_chapters(&self, project_id: ProjectId) -> OutlineResult<Vec<Chapter>> {
        if self.repo.get_project(project_id)?.is_none() {
            return Err(OutlineError::NotFound(EntityRef::Project(project_id)));
        }
        Ok(self.repo.list_chapters(project_id)?)
    }

    pub fn list_scenes(&self, chapter_id: ChapterId) -> OutlineResult<Vec<Scene>> {
        if self.repo.get_chapter(chapter_id)?.is_none() {
            return Err(OutlineError::NotFound(EntityRef::Chapter(chapter_id)));
        }
        Ok(self.repo.list_scenes(chapter_id)?)
    }

    pub fn rename_chapter(&self, chapter_id: ChapterId, title: &str) -> OutlineResult<()> {
        let title = normalize_title("title", title)?;
        self.repo.update_fields(&FieldPatch::Chapter(
            chapter_id,
            ChapterPatch {
                title: Some(title),
                ..ChapterPatch::default()
            },
        ))?;
        Ok(())
    }

    pub fn rename_scene(&self, scene_id: SceneId, title: &str) -> OutlineResult<()> {
        let title = normalize_title("title", title)?;
        self.repo.update_fields(&FieldPatch::Scene(
            scene_id,
            ScenePatch {
                title: Some(title),
                ..ScenePatch::default()
            },
        ))?;
        Ok(())
    }

    /// Stores an editor payload. The core never inspects `content`.
    pub fn save_scene_content(&self, scene_id: SceneId, content: impl Into<String>) -> OutlineResult<()> {
        self.repo.update_fields(&FieldPatch::Scene(
            scene_id,
            ScenePatch {
                content: Some(content.into()),
                ..ScenePatch::default()
            },
        ))?;
        Ok(())
    }

    /// Deletes a project with all its chapters and scenes.
    ///
    /// Holds the project and every one of its chapters, so no creation or
    /// move can be mid-flight inside the project while the cascade commits.
    pub fn delete_project(&self, project_id: ProjectId) -> OutlineResult<()> {
        let mut keys = self.project_section_keys(project_id)?;
        loop {
            let _section = self.context.locks().lock_all(keys.iter().copied());
            // Chapters are only added under the project key; re-list now that it is held.
            let current = self.project_section_keys(project_id)?;
            if current != keys {
                keys = current;
                continue;
            }
            self.repo.delete_entity(EntityRef::Project(project_id))?;
            warn!(
                "event=project_delete module=outline status=ok project={project_id} chapters={}",
                keys.len() - 1
            );
            return Ok(());
        }
    }

    /// Deletes a chapter with its scenes. Sibling chapters keep their orders.
    pub fn delete_chapter(&self, chapter_id: ChapterId) -> OutlineResult<()> {
        let chapter = self
            .repo
            .get_chapter(chapter_id)?
            .ok_or(OutlineError::NotFound(EntityRef::Chapter(chapter_id)))?;
        let _section = self.context.locks().lock_all([
            ParentRef::Project(chapter.project_id),
            ParentRef::Chapter(chapter_id),
        ]);
        self.repo.delete_entity(EntityRef::Chapter(chapter_id))?;
        warn!("event=chapter_delete module=outline status=ok chapter={chapter_id}");
        Ok(())
    }

    /// Deletes a scene. Sibling scenes keep their orders.
    pub fn delete_scene(&self, scene_id: SceneId) -> OutlineResult<()> {
        let scene = self
            .repo
            .get_scene(scene_id)?
            .ok_or(OutlineError::NotFound(EntityRef::Scene(scene_id)))?;
        let _section = self.context.locks().lock(ParentRef::Chapter(scene.chapter_id));
        self.repo.delete_entity(EntityRef::Scene(scene_id))?;
        warn!("event=scene_delete module=outline status=ok scene={scene_id}");
        Ok(())
    }

    /// The project key plus one key per chapter, sorted.
    fn project_section_keys(&self, project_id: ProjectId) -> OutlineResult<Vec<ParentRef>> {
        let mut keys: Vec<ParentRef> = self
            .repo
            .list_chapters(project_id)?
            .into_iter()
            .map(|chapter| ParentRef::Chapter(chapter.id))
            .collect();
        keys.push(ParentRef::Project(project_id));
        keys.sort();
        Ok(keys)
    }

    /// Ordered snapshot of one project.
    pub fn project_outline(&self, project_id: ProjectId) -> OutlineResult<ProjectOutline> {
        let project = self
            .repo
            .get_project(project_id)?
            .ok_or(OutlineError::NotFound(EntityRef::Project(project_id)))?;
        let chapters = self
            .repo
            .list_chapters(project_id)?
            .into_iter()
            .map(|chapter| {
                let scenes = self.repo.list_scenes(chapter.id)?;
                Ok(ChapterOutline { chapter, scenes })
            })
            .collect::<OutlineResult<Vec<_>>>()?;
        Ok(ProjectOutline { project, chapters })
    }
}
