//! Outline records and addressing types.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ProjectId = Uuid;
pub type ChapterId = Uuid;
pub type SceneId = Uuid;

/// A container whose children carry a sibling order.
///
/// Also the key of the per-parent lock table, so chapter creation, scene
/// creation, reorder and move all share one address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ParentRef {
    /// Parent of chapters.
    Project(ProjectId),
    /// Parent of scenes.
    Chapter(ChapterId),
}

impl ParentRef {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Project(id) | Self::Chapter(id) => *id,
        }
    }

    /// Storage label of the parent kind.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Project(_) => "project",
            Self::Chapter(_) => "chapter",
        }
    }

    /// Entity reference of the parent itself.
    pub fn as_entity(&self) -> EntityRef {
        match self {
            Self::Project(id) => EntityRef::Project(*id),
            Self::Chapter(id) => EntityRef::Chapter(*id),
        }
    }

    /// Entity reference of one child of this parent.
    pub fn child(&self, child_id: Uuid) -> EntityRef {
        match self {
            Self::Project(_) => EntityRef::Chapter(child_id),
            Self::Chapter(_) => EntityRef::Scene(child_id),
        }
    }
}

impl Display for ParentRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind_label(), self.id())
    }
}

/// Any addressable outline record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Project(ProjectId),
    Chapter(ChapterId),
    Scene(SceneId),
}

impl EntityRef {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Project(id) | Self::Chapter(id) | Self::Scene(id) => *id,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Project(_) => "project",
            Self::Chapter(_) => "chapter",
            Self::Scene(_) => "scene",
        }
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind_label(), self.id())
    }
}

/// Root container of one manuscript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub author: String,
    pub description: String,
    /// Epoch ms.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    /// Owning project. Immutable.
    pub project_id: ProjectId,
    pub title: String,
    /// Position among the project's chapters, starting at 1.
    pub order: i64,
}

/// Scene payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Rich-text scene. Content is an opaque editor document.
    #[default]
    Text,
    /// Drawing scene. Content is an opaque canvas document.
    Canvas,
}

impl SceneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Canvas => "canvas",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "canvas" => Some(Self::Canvas),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub project_id: ProjectId,
    /// Owning chapter. Changes only through a move.
    pub chapter_id: ChapterId,
    pub title: String,
    /// Position among the chapter's scenes, starting at 1.
    pub order: i64,
    #[serde(rename = "type")]
    pub kind: SceneKind,
    /// Opaque to the core.
    pub content: String,
    /// Backing drawing file for canvas scenes.
    pub file_path: Option<String>,
}

/// Identity and current order of one child, as listed under its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiblingSlot<Id = Uuid> {
    pub id: Id,
    pub order: i64,
}

/// Insert payload for a project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectDraft {
    pub title: String,
    pub author: String,
    pub description: String,
}

/// Insert payload for a chapter. `order` is decided by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDraft {
    pub title: String,
    pub order: i64,
}

/// Insert payload for a scene. `order` is decided by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneDraft {
    pub title: String,
    pub order: i64,
    pub kind: SceneKind,
    pub content: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChapterPatch {
    pub title: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScenePatch {
    pub title: Option<String>,
    pub order: Option<i64>,
    /// Parent reference. Only the move path sets this.
    pub chapter_id: Option<ChapterId>,
    pub content: Option<String>,
    pub file_path: Option<String>,
}

/// One partial update addressed to one record.
///
/// Grouped writes are ordered lists of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPatch {
    Project(ProjectId, ProjectPatch),
    Chapter(ChapterId, ChapterPatch),
    Scene(SceneId, ScenePatch),
}

impl FieldPatch {
    /// Sets the order of one child of `parent`.
    pub fn set_order(parent: ParentRef, child_id: Uuid, order: i64) -> Self {
        match parent {
            ParentRef::Project(_) => Self::Chapter(
                child_id,
                ChapterPatch {
                    order: Some(order),
                    ..ChapterPatch::default()
                },
            ),
            ParentRef::Chapter(_) => Self::Scene(
                child_id,
                ScenePatch {
                    order: Some(order),
                    ..ScenePatch::default()
                },
            ),
        }
    }

    pub fn target(&self) -> EntityRef {
        match self {
            Self::Project(id, _) => EntityRef::Project(*id),
            Self::Chapter(id, _) => EntityRef::Chapter(*id),
            Self::Scene(id, _) => EntityRef::Scene(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityRef, FieldPatch, ParentRef, SceneKind};
    use uuid::Uuid;

    #[test]
    fn parent_child_addressing_follows_hierarchy() {
        let id = Uuid::new_v4();
        let child = Uuid::new_v4();
        assert_eq!(ParentRef::Project(id).child(child), EntityRef::Chapter(child));
        assert_eq!(ParentRef::Chapter(id).child(child), EntityRef::Scene(child));
        assert_eq!(ParentRef::Chapter(id).as_entity(), EntityRef::Chapter(id));
    }

    #[test]
    fn set_order_targets_child_table() {
        let parent = ParentRef::Project(Uuid::new_v4());
        let child = Uuid::new_v4();
        let patch = FieldPatch::set_order(parent, child, 3);
        assert_eq!(patch.target(), EntityRef::Chapter(child));
        match patch {
            FieldPatch::Chapter(_, chapter_patch) => {
                assert_eq!(chapter_patch.order, Some(3));
                assert_eq!(chapter_patch.title, None);
            }
            other => panic!("unexpected patch: {other:?}"),
        }
    }

    #[test]
    fn scene_kind_round_trips_storage_labels() {
        assert_eq!(SceneKind::parse("canvas"), Some(SceneKind::Canvas));
        assert_eq!(SceneKind::parse(SceneKind::Text.as_str()), Some(SceneKind::Text));
        assert_eq!(SceneKind::parse("diagram"), None);
    }

    #[test]
    fn scene_kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&SceneKind::Canvas).expect("serialize kind");
        assert_eq!(json, "\"canvas\"");
    }
}
