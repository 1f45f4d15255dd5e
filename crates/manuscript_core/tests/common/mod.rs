#![allow(dead_code)]

use manuscript_core::db::open_db_in_memory;
use manuscript_core::{
    Chapter, ChapterDraft, ChapterId, EntityRef, FieldPatch, OperationKind, OutlineError,
    OutlineEvents, OutlineRepoError, OutlineRepoResult, OutlineRepository, ParentRef, Project,
    ProjectDraft, ProjectId, RejectionReason, Scene, SceneDraft, SceneId,
};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

pub fn draft(title: &str) -> ProjectDraft {
    ProjectDraft {
        title: title.to_string(),
        author: "Tester".to_string(),
        description: String::new(),
    }
}

/// `(id, order)` pairs for a parent's children, in listing order.
pub fn orders(repo: &impl OutlineRepository, parent: ParentRef) -> Vec<(Uuid, i64)> {
    repo.list_children(parent)
        .unwrap()
        .into_iter()
        .map(|slot| (slot.id, slot.order))
        .collect()
}

/// Asserts orders of `parent`'s children are exactly `1..=N`.
pub fn assert_contiguous(repo: &impl OutlineRepository, parent: ParentRef) {
    let mut values: Vec<i64> = orders(repo, parent).into_iter().map(|(_, order)| order).collect();
    values.sort_unstable();
    let expected: Vec<i64> = (1..=values.len() as i64).collect();
    assert_eq!(values, expected, "orders of {parent} are not contiguous");
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    Created(ParentRef, Uuid),
    Rejected(ParentRef, RejectionReason),
    Failed(OperationKind, ParentRef, String),
}

/// Event sink that keeps everything it receives.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn rejections(&self) -> Vec<(ParentRef, RejectionReason)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecordedEvent::Rejected(parent, reason) => Some((parent, reason)),
                _ => None,
            })
            .collect()
    }
}

impl OutlineEvents for RecordingEvents {
    fn on_child_created(&self, parent: ParentRef, child_id: Uuid) {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Created(parent, child_id));
    }

    fn on_creation_rejected(&self, parent: ParentRef, reason: RejectionReason) {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Rejected(parent, reason));
    }

    fn on_operation_failed(&self, kind: OperationKind, parent: ParentRef, error: &OutlineError) {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Failed(kind, parent, error.code().to_string()));
    }
}

/// Pauses `create_scene` until the test releases it.
pub struct CreateGate {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl CreateGate {
    /// Returns the gate, a receiver signalled on entry, and a sender that
    /// releases one paused call.
    pub fn new() -> (Arc<Self>, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        let gate = Arc::new(Self {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        (gate, entered_rx, release_tx)
    }

    fn pass(&self) {
        self.entered.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
    }
}

#[derive(Clone, Default)]
struct MemoryState {
    projects: Vec<Project>,
    chapters: Vec<Chapter>,
    scenes: Vec<Scene>,
}

#[derive(Default)]
struct MemoryInner {
    state: MemoryState,
    grouped_calls: usize,
    fail_grouped: bool,
    fail_create_scene: bool,
    gate: Option<Arc<CreateGate>>,
}

/// Thread-safe in-memory repository with fault injection.
#[derive(Clone, Default)]
pub struct MemoryRepo {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grouped_calls(&self) -> usize {
        self.inner.lock().unwrap().grouped_calls
    }

    pub fn fail_grouped_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_grouped = fail;
    }

    pub fn fail_scene_inserts(&self, fail: bool) {
        self.inner.lock().unwrap().fail_create_scene = fail;
    }

    pub fn gate_scene_inserts(&self, gate: Option<Arc<CreateGate>>) {
        self.inner.lock().unwrap().gate = gate;
    }

    /// Inserts a scene row with an explicit order, bypassing services.
    pub fn seed_scene(&self, chapter_id: ChapterId, title: &str, order: i64) -> Scene {
        self.create_scene(
            chapter_id,
            &SceneDraft {
                title: title.to_string(),
                order,
                kind: Default::default(),
                content: String::new(),
                file_path: None,
            },
        )
        .unwrap()
    }
}

fn injected_failure() -> OutlineRepoError {
    OutlineRepoError::from(rusqlite::Error::InvalidQuery)
}

fn apply_patch(state: &mut MemoryState, patch: &FieldPatch) -> OutlineRepoResult<()> {
    match patch {
        FieldPatch::Project(id, patch) => {
            let project = state
                .projects
                .iter_mut()
                .find(|project| project.id == *id)
                .ok_or(OutlineRepoError::NotFound(EntityRef::Project(*id)))?;
            if let Some(title) = &patch.title {
                project.title = title.clone();
            }
            if let Some(author) = &patch.author {
                project.author = author.clone();
            }
            if let Some(description) = &patch.description {
                project.description = description.clone();
            }
        }
        FieldPatch::Chapter(id, patch) => {
            let chapter = state
                .chapters
                .iter_mut()
                .find(|chapter| chapter.id == *id)
                .ok_or(OutlineRepoError::NotFound(EntityRef::Chapter(*id)))?;
            if let Some(title) = &patch.title {
                chapter.title = title.clone();
            }
            if let Some(order) = patch.order {
                chapter.order = order;
            }
        }
        FieldPatch::Scene(id, patch) => {
            let scene = state
                .scenes
                .iter_mut()
                .find(|scene| scene.id == *id)
                .ok_or(OutlineRepoError::NotFound(EntityRef::Scene(*id)))?;
            if let Some(chapter_id) = patch.chapter_id {
                scene.chapter_id = chapter_id;
            }
            if let Some(title) = &patch.title {
                scene.title = title.clone();
            }
            if let Some(order) = patch.order {
                scene.order = order;
            }
            if let Some(content) = &patch.content {
                scene.content = content.clone();
            }
            if let Some(file_path) = &patch.file_path {
                scene.file_path = Some(file_path.clone());
            }
        }
    }
    Ok(())
}

impl OutlineRepository for MemoryRepo {
    fn create_project(&self, draft: &ProjectDraft) -> OutlineRepoResult<Project> {
        let project = Project {
            id: Uuid::new_v4(),
            title: draft.title.clone(),
            author: draft.author.clone(),
            description: draft.description.clone(),
            created_at: 0,
        };
        self.inner.lock().unwrap().state.projects.push(project.clone());
        Ok(project)
    }

    fn get_project(&self, id: ProjectId) -> OutlineRepoResult<Option<Project>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.state.projects.iter().find(|p| p.id == id).cloned())
    }

    fn list_projects(&self) -> OutlineRepoResult<Vec<Project>> {
        Ok(self.inner.lock().unwrap().state.projects.clone())
    }

    fn create_chapter(&self, project_id: ProjectId, draft: &ChapterDraft) -> OutlineRepoResult<Chapter> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.state.projects.iter().any(|p| p.id == project_id) {
            return Err(OutlineRepoError::NotFound(EntityRef::Project(project_id)));
        }
        let chapter = Chapter {
            id: Uuid::new_v4(),
            project_id,
            title: draft.title.clone(),
            order: draft.order,
        };
        inner.state.chapters.push(chapter.clone());
        Ok(chapter)
    }

    fn get_chapter(&self, id: ChapterId) -> OutlineRepoResult<Option<Chapter>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.state.chapters.iter().find(|c| c.id == id).cloned())
    }

    fn list_chapters(&self, project_id: ProjectId) -> OutlineRepoResult<Vec<Chapter>> {
        let inner = self.inner.lock().unwrap();
        let mut chapters: Vec<Chapter> = inner
            .state
            .chapters
            .iter()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| c.order);
        Ok(chapters)
    }

    fn create_scene(&self, chapter_id: ChapterId, draft: &SceneDraft) -> OutlineRepoResult<Scene> {
        let gate = {
            let inner = self.inner.lock().unwrap();
            if inner.fail_create_scene {
                return Err(injected_failure());
            }
            inner.gate.clone()
        };
        if let Some(gate) = gate {
            gate.pass();
        }

        let mut inner = self.inner.lock().unwrap();
        let project_id = inner
            .state
            .chapters
            .iter()
            .find(|c| c.id == chapter_id)
            .map(|c| c.project_id)
            .ok_or(OutlineRepoError::NotFound(EntityRef::Chapter(chapter_id)))?;
        let scene = Scene {
            id: Uuid::new_v4(),
            project_id,
            chapter_id,
            title: draft.title.clone(),
            order: draft.order,
            kind: draft.kind,
            content: draft.content.clone(),
            file_path: draft.file_path.clone(),
        };
        inner.state.scenes.push(scene.clone());
        Ok(scene)
    }

    fn get_scene(&self, id: SceneId) -> OutlineRepoResult<Option<Scene>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.state.scenes.iter().find(|s| s.id == id).cloned())
    }

    fn list_scenes(&self, chapter_id: ChapterId) -> OutlineRepoResult<Vec<Scene>> {
        let inner = self.inner.lock().unwrap();
        let mut scenes: Vec<Scene> = inner
            .state
            .scenes
            .iter()
            .filter(|s| s.chapter_id == chapter_id)
            .cloned()
            .collect();
        scenes.sort_by_key(|s| s.order);
        Ok(scenes)
    }

    fn update_fields(&self, patch: &FieldPatch) -> OutlineRepoResult<()> {
        apply_patch(&mut self.inner.lock().unwrap().state, patch)
    }

    fn delete_entity(&self, entity: EntityRef) -> OutlineRepoResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let state = &mut inner.state;
        match entity {
            EntityRef::Project(id) => {
                let before = state.projects.len();
                state.projects.retain(|p| p.id != id);
                if state.projects.len() == before {
                    return Err(OutlineRepoError::NotFound(entity));
                }
                state.chapters.retain(|c| c.project_id != id);
                state.scenes.retain(|s| s.project_id != id);
            }
            EntityRef::Chapter(id) => {
                let before = state.chapters.len();
                state.chapters.retain(|c| c.id != id);
                if state.chapters.len() == before {
                    return Err(OutlineRepoError::NotFound(entity));
                }
                state.scenes.retain(|s| s.chapter_id != id);
            }
            EntityRef::Scene(id) => {
                let before = state.scenes.len();
                state.scenes.retain(|s| s.id != id);
                if state.scenes.len() == before {
                    return Err(OutlineRepoError::NotFound(entity));
                }
            }
        }
        Ok(())
    }

    fn run_grouped(&self, patches: &[FieldPatch]) -> OutlineRepoResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.grouped_calls += 1;
        if inner.fail_grouped {
            return Err(injected_failure());
        }
        let mut staged = inner.state.clone();
        for patch in patches {
            apply_patch(&mut staged, patch)?;
        }
        inner.state = staged;
        Ok(())
    }
}
