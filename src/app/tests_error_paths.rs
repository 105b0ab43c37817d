use std::path::PathBuf;

use uuid::Uuid;

use super::{App, AppError, EntityPatch, NewEntity};
use crate::config::Settings;
use crate::db;
use crate::domain::entity_class::EntityClass;
use crate::domain::state::StateId;
use crate::workflow::{StateSetEdit, StateSetError};

fn unique_workspace() -> PathBuf {
    let root = std::env::temp_dir().join(format!("smartplanner-app-err-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&root).expect("temp workspace should be creatable");
    root
}

fn db_path(root: &std::path::Path) -> String {
    root.join("state.sqlite")
        .to_str()
        .expect("utf8 path")
        .to_string()
}

fn task(title: &str, parent: Option<&str>) -> NewEntity {
    NewEntity {
        class: EntityClass::Task,
        title: title.to_string(),
        parent_id: parent.map(str::to_string),
        estimate: None,
        status: None,
    }
}

#[test]
fn create_rejects_bad_input() {
    let root = unique_workspace();
    let app = App::open(&db_path(&root), &Settings::default()).expect("app should open");

    assert!(matches!(
        app.create_entity(task("   ", None)),
        Err(AppError::InvalidArgument(_))
    ));

    let mut negative = task("Negative", None);
    negative.estimate = Some(-1.0);
    assert!(matches!(
        app.create_entity(negative),
        Err(AppError::InvalidArgument(_))
    ));

    assert!(matches!(
        app.create_entity(task("Orphan", Some("us-none"))),
        Err(AppError::NotFound(id)) if id == "us-none"
    ));

    let epic = app
        .create_entity(NewEntity {
            class: EntityClass::Epic,
            title: "Epic".to_string(),
            parent_id: None,
            estimate: None,
            status: None,
        })
        .expect("epic should be created");
    let wrong_parent = app
        .create_entity(task("Skips a level", Some(&epic.entity.entity.id)))
        .expect_err("tasks cannot hang off epics");
    assert!(wrong_parent.to_string().contains("must be a story"));

    let nested_epic = app.create_entity(NewEntity {
        class: EntityClass::Epic,
        title: "Nested".to_string(),
        parent_id: Some(epic.entity.entity.id.clone()),
        estimate: None,
        status: None,
    });
    assert!(matches!(nested_epic, Err(AppError::InvalidArgument(_))));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn status_and_update_report_missing_entities() {
    let root = unique_workspace();
    let app = App::open(&db_path(&root), &Settings::default()).expect("app should open");

    assert!(matches!(
        app.set_status("tk-none", "2", false),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        app.set_status("  ", "2", false),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        app.update_entity("tk-none", EntityPatch::default()),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(app.progress("tk-none"), Err(AppError::NotFound(_))));
    assert!(app.show_entity("tk-none").expect("show should work").is_none());

    let created = app.create_entity(task("Real", None)).expect("create");
    assert!(matches!(
        app.set_status(&created.entity.entity.id, " ", false),
        Err(AppError::InvalidArgument(_))
    ));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn unknown_target_state_falls_back_to_default() {
    let root = unique_workspace();
    let app = App::open(&db_path(&root), &Settings::default()).expect("app should open");

    let created = app.create_entity(task("Task", None)).expect("create");
    let id = created.entity.entity.id;
    app.set_status(&id, "2", false).expect("move to in progress");

    let fallback = app
        .set_status(&id, "99", false)
        .expect("unknown states resolve instead of failing");
    assert_eq!(fallback.entity.entity.status, StateId::Number(1));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn protected_states_cannot_be_removed() {
    let root = unique_workspace();
    let mut app = App::open(&db_path(&root), &Settings::default()).expect("app should open");

    let err = app
        .edit_state_set(
            EntityClass::Task,
            &StateSetEdit::RemoveState(StateId::Number(3)),
        )
        .expect_err("protected state should stay");
    assert!(matches!(
        err,
        AppError::StateSet(StateSetError::ProtectedState(StateId::Number(3)))
    ));
    assert!(!app.state_set(EntityClass::Task).unwrap().customized);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn corrupt_stored_override_fails_open() {
    let root = unique_workspace();
    let path = db_path(&root);
    {
        let conn = db::open_connection(&path).expect("db should open");
        db::put_state_set_override(
            &conn,
            EntityClass::Story,
            r#"{"states":[],"default_state":"x","final_states":[]}"#,
            time::OffsetDateTime::now_utc(),
        )
        .expect("raw write should succeed");
    }

    let err = App::open(&path, &Settings::default())
        .err()
        .expect("invalid stored state set should be reported");
    assert!(matches!(
        err,
        AppError::StoredStateSet {
            class: EntityClass::Story,
            ..
        }
    ));

    let _ = std::fs::remove_dir_all(root);
}
