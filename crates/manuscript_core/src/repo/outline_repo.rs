//! Outline repository contract and SQLite implementation.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::outline::{
    Chapter, ChapterDraft, ChapterId, ChapterPatch, EntityRef, FieldPatch, ParentRef, Project,
    ProjectDraft, ProjectId, ProjectPatch, Scene, SceneDraft, SceneId, SceneKind, ScenePatch,
    SiblingSlot,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT uuid, title, author, description, created_at FROM projects";
const CHAPTER_SELECT_SQL: &str = "SELECT uuid, project_uuid, title, sort_order FROM chapters";
const SCENE_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    chapter_uuid,
    title,
    sort_order,
    kind,
    content,
    file_path
FROM scenes";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("projects", &["uuid", "title", "author", "description", "created_at"]),
    ("chapters", &["uuid", "project_uuid", "title", "sort_order"]),
    (
        "scenes",
        &[
            "uuid",
            "project_uuid",
            "chapter_uuid",
            "title",
            "sort_order",
            "kind",
            "content",
            "file_path",
        ],
    ),
];

pub type OutlineRepoResult<T> = Result<T, OutlineRepoError>;

/// Errors from outline repository operations.
#[derive(Debug)]
pub enum OutlineRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Addressed record does not exist.
    NotFound(EntityRef),
    /// Connection schema is not at the version this binary writes.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be converted into a record.
    InvalidData(String),
}

impl Display for OutlineRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "outline record not found: {entity}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "outline repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "outline repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "outline repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid outline data: {message}"),
        }
    }
}

impl Error for OutlineRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for OutlineRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for OutlineRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Ordered-entity repository consumed by the outline services.
///
/// Implementations decide their own threading; the services serialize
/// sibling read-modify-write spans per parent before calling in.
pub trait OutlineRepository {
    fn create_project(&self, draft: &ProjectDraft) -> OutlineRepoResult<Project>;
    fn get_project(&self, id: ProjectId) -> OutlineRepoResult<Option<Project>>;
    fn list_projects(&self) -> OutlineRepoResult<Vec<Project>>;

    /// Inserts a chapter with the draft's order as given.
    fn create_chapter(&self, project_id: ProjectId, draft: &ChapterDraft)
        -> OutlineRepoResult<Chapter>;
    fn get_chapter(&self, id: ChapterId) -> OutlineRepoResult<Option<Chapter>>;
    /// Chapters of one project in sibling order.
    fn list_chapters(&self, project_id: ProjectId) -> OutlineRepoResult<Vec<Chapter>>;

    /// Inserts a scene with the draft's order as given. The scene inherits
    /// the chapter's project.
    fn create_scene(&self, chapter_id: ChapterId, draft: &SceneDraft) -> OutlineRepoResult<Scene>;
    fn get_scene(&self, id: SceneId) -> OutlineRepoResult<Option<Scene>>;
    /// Scenes of one chapter in sibling order.
    fn list_scenes(&self, chapter_id: ChapterId) -> OutlineRepoResult<Vec<Scene>>;

    /// Applies one partial update.
    fn update_fields(&self, patch: &FieldPatch) -> OutlineRepoResult<()>;
    /// Deletes one record and everything it owns.
    fn delete_entity(&self, entity: EntityRef) -> OutlineRepoResult<()>;
    /// Applies `patches` in order as one atomic unit.
    fn run_grouped(&self, patches: &[FieldPatch]) -> OutlineRepoResult<()>;

    /// Ids and orders of the children of `parent`, in sibling order.
    fn list_children(&self, parent: ParentRef) -> OutlineRepoResult<Vec<SiblingSlot>> {
        let slots = match parent {
            ParentRef::Project(id) => self
                .list_chapters(id)?
                .into_iter()
                .map(|chapter| SiblingSlot {
                    id: chapter.id,
                    order: chapter.order,
                })
                .collect(),
            ParentRef::Chapter(id) => self
                .list_scenes(id)?
                .into_iter()
                .map(|scene| SiblingSlot {
                    id: scene.id,
                    order: scene.order,
                })
                .collect(),
        };
        Ok(slots)
    }

    fn parent_exists(&self, parent: ParentRef) -> OutlineRepoResult<bool> {
        match parent {
            ParentRef::Project(id) => Ok(self.get_project(id)?.is_some()),
            ParentRef::Chapter(id) => Ok(self.get_chapter(id)?.is_some()),
        }
    }
}

/// SQLite-backed outline repository.
///
/// Holds a borrowed connection, so copies are free; each service can take
/// its own copy.
#[derive(Clone, Copy)]
pub struct SqliteOutlineRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOutlineRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> OutlineRepoResult<Self> {
        ensure_outline_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl OutlineRepository for SqliteOutlineRepository<'_> {
    fn create_project(&self, draft: &ProjectDraft) -> OutlineRepoResult<Project> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO projects (uuid, title, author, description) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                draft.title.as_str(),
                draft.author.as_str(),
                draft.description.as_str(),
            ],
        )?;
        self.get_project(id)?
            .ok_or(OutlineRepoError::NotFound(EntityRef::Project(id)))
    }

    fn get_project(&self, id: ProjectId) -> OutlineRepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects(&self) -> OutlineRepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn create_chapter(
        &self,
        project_id: ProjectId,
        draft: &ChapterDraft,
    ) -> OutlineRepoResult<Chapter> {
        if self.get_project(project_id)?.is_none() {
            return Err(OutlineRepoError::NotFound(EntityRef::Project(project_id)));
        }

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO chapters (uuid, project_uuid, title, sort_order) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                project_id.to_string(),
                draft.title.as_str(),
                draft.order,
            ],
        )?;
        self.get_chapter(id)?
            .ok_or(OutlineRepoError::NotFound(EntityRef::Chapter(id)))
    }

    fn get_chapter(&self, id: ChapterId) -> OutlineRepoResult<Option<Chapter>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHAPTER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_chapter_row(row)?));
        }
        Ok(None)
    }

    fn list_chapters(&self, project_id: ProjectId) -> OutlineRepoResult<Vec<Chapter>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHAPTER_SELECT_SQL}
             WHERE project_uuid = ?1
             ORDER BY sort_order ASC, created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut chapters = Vec::new();
        while let Some(row) = rows.next()? {
            chapters.push(parse_chapter_row(row)?);
        }
        Ok(chapters)
    }

    fn create_scene(&self, chapter_id: ChapterId, draft: &SceneDraft) -> OutlineRepoResult<Scene> {
        let chapter = self
            .get_chapter(chapter_id)?
            .ok_or(OutlineRepoError::NotFound(EntityRef::Chapter(chapter_id)))?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO scenes (
                uuid,
                project_uuid,
                chapter_uuid,
                title,
                sort_order,
                kind,
                content,
                file_path
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                id.to_string(),
                chapter.project_id.to_string(),
                chapter_id.to_string(),
                draft.title.as_str(),
                draft.order,
                draft.kind.as_str(),
                draft.content.as_str(),
                draft.file_path.as_deref(),
            ],
        )?;
        self.get_scene(id)?
            .ok_or(OutlineRepoError::NotFound(EntityRef::Scene(id)))
    }

    fn get_scene(&self, id: SceneId) -> OutlineRepoResult<Option<Scene>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SCENE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_scene_row(row)?));
        }
        Ok(None)
    }

    fn list_scenes(&self, chapter_id: ChapterId) -> OutlineRepoResult<Vec<Scene>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SCENE_SELECT_SQL}
             WHERE chapter_uuid = ?1
             ORDER BY sort_order ASC, created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([chapter_id.to_string()])?;
        let mut scenes = Vec::new();
        while let Some(row) = rows.next()? {
            scenes.push(parse_scene_row(row)?);
        }
        Ok(scenes)
    }

    fn update_fields(&self, patch: &FieldPatch) -> OutlineRepoResult<()> {
        apply_patch(self.conn, patch)
    }

    fn delete_entity(&self, entity: EntityRef) -> OutlineRepoResult<()> {
        let table = match entity {
            EntityRef::Project(_) => "projects",
            EntityRef::Chapter(_) => "chapters",
            EntityRef::Scene(_) => "scenes",
        };
        let changed = self.conn.execute(
            &format!("DELETE FROM {table} WHERE uuid = ?1;"),
            [entity.id().to_string()],
        )?;
        if changed == 0 {
            return Err(OutlineRepoError::NotFound(entity));
        }
        Ok(())
    }

    fn run_grouped(&self, patches: &[FieldPatch]) -> OutlineRepoResult<()> {
        if patches.is_empty() {
            return Ok(());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for patch in patches {
            apply_patch(&tx, patch)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_children(&self, parent: ParentRef) -> OutlineRepoResult<Vec<SiblingSlot>> {
        let sql = match parent {
            ParentRef::Project(_) => {
                "SELECT uuid, sort_order
                 FROM chapters
                 WHERE project_uuid = ?1
                 ORDER BY sort_order ASC, created_at ASC, uuid ASC;"
            }
            ParentRef::Chapter(_) => {
                "SELECT uuid, sort_order
                 FROM scenes
                 WHERE chapter_uuid = ?1
                 ORDER BY sort_order ASC, created_at ASC, uuid ASC;"
            }
        };
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([parent.id().to_string()])?;
        let mut slots = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            slots.push(SiblingSlot {
                id: parse_uuid(&id_text, "uuid")?,
                order: row.get(1)?,
            });
        }
        Ok(slots)
    }
}

fn apply_patch(conn: &Connection, patch: &FieldPatch) -> OutlineRepoResult<()> {
    let (table, assignments) = match patch {
        FieldPatch::Project(_, ProjectPatch {
            title,
            author,
            description,
        }) => (
            "projects",
            vec![
                ("title", title.clone().map(Value::Text)),
                ("author", author.clone().map(Value::Text)),
                ("description", description.clone().map(Value::Text)),
            ],
        ),
        FieldPatch::Chapter(_, ChapterPatch { title, order }) => (
            "chapters",
            vec![
                ("title", title.clone().map(Value::Text)),
                ("sort_order", order.map(Value::Integer)),
            ],
        ),
        FieldPatch::Scene(
            _,
            ScenePatch {
                title,
                order,
                chapter_id,
                content,
                file_path,
            },
        ) => (
            "scenes",
            vec![
                ("chapter_uuid", chapter_id.map(|id| Value::Text(id.to_string()))),
                ("title", title.clone().map(Value::Text)),
                ("sort_order", order.map(Value::Integer)),
                ("content", content.clone().map(Value::Text)),
                ("file_path", file_path.clone().map(Value::Text)),
            ],
        ),
    };

    let mut sql = format!("UPDATE {table} SET updated_at = (strftime('%s', 'now') * 1000)");
    let mut bind_values: Vec<Value> = Vec::new();
    for (column, value) in assignments {
        if let Some(value) = value {
            sql.push_str(&format!(", {column} = ?"));
            bind_values.push(value);
        }
    }
    sql.push_str(" WHERE uuid = ?;");
    bind_values.push(Value::Text(patch.target().id().to_string()));

    let changed = conn.execute(&sql, params_from_iter(bind_values))?;
    if changed == 0 {
        return Err(OutlineRepoError::NotFound(patch.target()));
    }
    Ok(())
}

fn parse_project_row(row: &Row<'_>) -> OutlineRepoResult<Project> {
    let id_text: String = row.get("uuid")?;
    Ok(Project {
        id: parse_uuid(&id_text, "projects.uuid")?,
        title: row.get("title")?,
        author: row.get("author")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_chapter_row(row: &Row<'_>) -> OutlineRepoResult<Chapter> {
    let id_text: String = row.get("uuid")?;
    let project_text: String = row.get("project_uuid")?;
    Ok(Chapter {
        id: parse_uuid(&id_text, "chapters.uuid")?,
        project_id: parse_uuid(&project_text, "chapters.project_uuid")?,
        title: row.get("title")?,
        order: row.get("sort_order")?,
    })
}

fn parse_scene_row(row: &Row<'_>) -> OutlineRepoResult<Scene> {
    let id_text: String = row.get("uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let chapter_text: String = row.get("chapter_uuid")?;
    let kind_text: String = row.get("kind")?;
    let kind = SceneKind::parse(&kind_text).ok_or_else(|| {
        OutlineRepoError::InvalidData(format!("invalid scene kind `{kind_text}` in scenes.kind"))
    })?;

    Ok(Scene {
        id: parse_uuid(&id_text, "scenes.uuid")?,
        project_id: parse_uuid(&project_text, "scenes.project_uuid")?,
        chapter_id: parse_uuid(&chapter_text, "scenes.chapter_uuid")?,
        title: row.get("title")?,
        order: row.get("sort_order")?,
        kind,
        content: row.get("content")?,
        file_path: row.get("file_path")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> OutlineRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| OutlineRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_outline_connection_ready(conn: &Connection) -> OutlineRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(OutlineRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(OutlineRepoError::MissingRequiredTable(table));
        }
        let present = table_columns(conn, table)?;
        let missing = columns
            .iter()
            .copied()
            .find(|column| !present.iter().any(|name| name.as_str() == *column));
        if let Some(column) = missing {
            return Err(OutlineRepoError::MissingRequiredColumn { table, column });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> OutlineRepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn table_columns(conn: &Connection, table: &str) -> OutlineRepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
