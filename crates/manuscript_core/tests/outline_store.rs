mod common;

use common::{draft, orders, setup};
use manuscript_core::db::migrations::{latest_version, schema_version};
use manuscript_core::db::{open_db, DbError};
use manuscript_core::{
    ChapterDraft, EntityRef, FieldPatch, OutlineRepoError, OutlineRepository, ParentRef,
    SceneDraft, SceneKind, ScenePatch, SqliteOutlineRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn chapter_draft(title: &str, order: i64) -> ChapterDraft {
    ChapterDraft {
        title: title.to_string(),
        order,
    }
}

fn scene_draft(title: &str, order: i64) -> SceneDraft {
    SceneDraft {
        title: title.to_string(),
        order,
        kind: SceneKind::Text,
        content: String::new(),
        file_path: None,
    }
}

fn table_exists(conn: &Connection, table: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        == 1
}

#[test]
fn open_db_creates_outline_schema() {
    let conn = setup();
    for table in ["projects", "chapters", "scenes"] {
        assert!(table_exists(&conn, table), "missing table {table}");
    }
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
}

#[test]
fn reopening_a_file_db_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outline.sqlite3");

    let project_id = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteOutlineRepository::try_new(&conn).unwrap();
        repo.create_project(&draft("Persisted")).unwrap().id
    };

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    let repo = SqliteOutlineRepository::try_new(&conn).unwrap();
    let project = repo.get_project(project_id).unwrap().unwrap();
    assert_eq!(project.title, "Persisted");
}

#[test]
fn newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    {
        let conn = open_db(&path).unwrap();
        conn.pragma_update(None, "user_version", latest_version() + 1)
            .unwrap();
    }

    let err = open_db(&path).unwrap_err();
    assert!(matches!(
        err,
        DbError::UnsupportedSchemaVersion { db_version, latest_supported }
            if db_version == latest_version() + 1 && latest_supported == latest_version()
    ));
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteOutlineRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        OutlineRepoError::UninitializedConnection { actual_version: 0, .. }
    ));
}

#[test]
fn listings_follow_sort_order() {
    let conn = setup();
    let repo = SqliteOutlineRepository::try_new(&conn).unwrap();
    let project = repo.create_project(&draft("Listing")).unwrap();
    let late = repo.create_chapter(project.id, &chapter_draft("Late", 4)).unwrap();
    let early = repo.create_chapter(project.id, &chapter_draft("Early", 1)).unwrap();

    let listed: Vec<_> = repo
        .list_chapters(project.id)
        .unwrap()
        .into_iter()
        .map(|chapter| chapter.id)
        .collect();
    assert_eq!(listed, vec![early.id, late.id]);
    assert_eq!(
        orders(&repo, ParentRef::Project(project.id)),
        vec![(early.id, 1), (late.id, 4)]
    );
}

#[test]
fn grouped_write_is_all_or_nothing() {
    let conn = setup();
    let repo = SqliteOutlineRepository::try_new(&conn).unwrap();
    let project = repo.create_project(&draft("Atomic")).unwrap();
    let chapter = repo.create_chapter(project.id, &chapter_draft("One", 1)).unwrap();
    let a = repo.create_scene(chapter.id, &scene_draft("A", 1)).unwrap();
    let b = repo.create_scene(chapter.id, &scene_draft("B", 2)).unwrap();
    let parent = ParentRef::Chapter(chapter.id);
    let missing = Uuid::new_v4();

    let err = repo
        .run_grouped(&[
            FieldPatch::set_order(parent, a.id, 2),
            FieldPatch::set_order(parent, b.id, 1),
            FieldPatch::set_order(parent, missing, 3),
        ])
        .unwrap_err();
    assert!(matches!(err, OutlineRepoError::NotFound(EntityRef::Scene(id)) if id == missing));
    assert_eq!(orders(&repo, parent), vec![(a.id, 1), (b.id, 2)]);

    repo.run_grouped(&[
        FieldPatch::set_order(parent, a.id, 2),
        FieldPatch::set_order(parent, b.id, 1),
    ])
    .unwrap();
    assert_eq!(orders(&repo, parent), vec![(b.id, 1), (a.id, 2)]);
}

#[test]
fn scene_patch_updates_only_given_fields() {
    let conn = setup();
    let repo = SqliteOutlineRepository::try_new(&conn).unwrap();
    let project = repo.create_project(&draft("Patching")).unwrap();
    let first = repo.create_chapter(project.id, &chapter_draft("One", 1)).unwrap();
    let second = repo.create_chapter(project.id, &chapter_draft("Two", 2)).unwrap();
    let scene = repo.create_scene(first.id, &scene_draft("Draft", 1)).unwrap();

    repo.update_fields(&FieldPatch::Scene(
        scene.id,
        ScenePatch {
            chapter_id: Some(second.id),
            content: Some("{\"ops\":[]}".to_string()),
            ..ScenePatch::default()
        },
    ))
    .unwrap();

    let stored = repo.get_scene(scene.id).unwrap().unwrap();
    assert_eq!(stored.chapter_id, second.id);
    assert_eq!(stored.content, "{\"ops\":[]}");
    assert_eq!(stored.title, "Draft");
    assert_eq!(stored.order, 1);
    assert_eq!(stored.project_id, project.id);
}

#[test]
fn deleting_a_chapter_cascades_to_scenes() {
    let conn = setup();
    let repo = SqliteOutlineRepository::try_new(&conn).unwrap();
    let project = repo.create_project(&draft("Cascade")).unwrap();
    let chapter = repo.create_chapter(project.id, &chapter_draft("Doomed", 1)).unwrap();
    let scene = repo.create_scene(chapter.id, &scene_draft("Lost", 1)).unwrap();

    repo.delete_entity(EntityRef::Chapter(chapter.id)).unwrap();

    assert_eq!(repo.get_scene(scene.id).unwrap(), None);
    let err = repo.delete_entity(EntityRef::Chapter(chapter.id)).unwrap_err();
    assert!(matches!(err, OutlineRepoError::NotFound(EntityRef::Chapter(_))));
}

#[test]
fn creating_under_missing_parent_fails() {
    let conn = setup();
    let repo = SqliteOutlineRepository::try_new(&conn).unwrap();
    let ghost = Uuid::new_v4();

    let err = repo.create_chapter(ghost, &chapter_draft("Orphan", 1)).unwrap_err();
    assert!(matches!(err, OutlineRepoError::NotFound(EntityRef::Project(id)) if id == ghost));

    let err = repo.create_scene(ghost, &scene_draft("Orphan", 1)).unwrap_err();
    assert!(matches!(err, OutlineRepoError::NotFound(EntityRef::Chapter(id)) if id == ghost));
}
