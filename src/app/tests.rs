use super::{App, EntityPatch, NewEntity};
use crate::config::Settings;
use crate::domain::entity_class::EntityClass;
use crate::domain::state::{State, StateId};
use crate::listing::EntityListFilter;
use crate::status::TransitionPolicy;
use crate::workflow::StateSetEdit;
use std::path::PathBuf;
use uuid::Uuid;

fn unique_workspace() -> PathBuf {
    let root = std::env::temp_dir().join(format!("smartplanner-app-test-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&root).expect("temp workspace should be creatable");
    root
}

fn open_app(root: &std::path::Path, settings: &Settings) -> App {
    let db_path = root.join(".smartplanner/state.sqlite");
    App::open(db_path.to_str().expect("utf8 path"), settings).expect("app should open")
}

fn new_entity(class: EntityClass, title: &str, parent: Option<&str>) -> NewEntity {
    NewEntity {
        class,
        title: title.to_string(),
        parent_id: parent.map(str::to_string),
        estimate: None,
        status: None,
    }
}

#[test]
fn create_uses_default_state_and_persists() {
    let root = unique_workspace();
    let app = open_app(&root, &Settings::default());

    let created = app
        .create_entity(new_entity(EntityClass::Epic, "  Checkout revamp ", None))
        .expect("create should succeed");
    let epic = &created.entity.entity;
    assert!(epic.id.starts_with("ep-"));
    assert_eq!(epic.title, "Checkout revamp");
    assert_eq!(epic.status, StateId::from("planned"));
    assert_eq!(created.entity.status_label, "Planificada");
    assert!(!created.entity.terminal);
    assert!(created.cascade.is_empty());

    let shown = app
        .show_entity(&epic.id.to_uppercase())
        .expect("show should succeed")
        .expect("entity should exist");
    assert_eq!(shown.entity.id, epic.id);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn completing_last_task_cascades_to_story_and_epic() {
    let root = unique_workspace();
    let app = open_app(&root, &Settings::default());

    let epic = app
        .create_entity(new_entity(EntityClass::Epic, "Epic", None))
        .expect("epic should be created")
        .entity
        .entity;
    let story = app
        .create_entity(new_entity(EntityClass::Story, "Story", Some(&epic.id)))
        .expect("story should be created")
        .entity
        .entity;
    let mut first = new_entity(EntityClass::Task, "First", Some(&story.id));
    first.estimate = Some(8.0);
    let first = app.create_entity(first).expect("task should be created").entity.entity;
    let second = app
        .create_entity(new_entity(EntityClass::Task, "Second", Some(&story.id)))
        .expect("task should be created")
        .entity
        .entity;

    let done = app
        .set_status(&first.id, "3", false)
        .expect("status change should succeed");
    assert!(done.changed);
    assert_eq!(done.previous_status, Some(StateId::Number(1)));
    assert!(done.entity.entity.completed_at.is_some());
    assert_eq!(done.entity.entity.effort.map(|e| e.actual), Some(8.0));
    assert!(done.cascade.is_empty());
    assert_eq!(app.progress(&story.id).expect("progress").percentage, 50);

    let last = app
        .set_status(&second.id, "3", false)
        .expect("status change should succeed");
    let cascade: Vec<(&str, &StateId)> = last
        .cascade
        .iter()
        .map(|update| (update.id.as_str(), &update.to))
        .collect();
    assert_eq!(
        cascade,
        vec![
            (story.id.as_str(), &StateId::from("done")),
            (epic.id.as_str(), &StateId::from("completed")),
        ]
    );
    assert_eq!(last.cascade[0].percentage, 100);

    let epic_now = app.show_entity(&epic.id).unwrap().unwrap();
    assert!(epic_now.terminal);
    assert!(epic_now.entity.completed_at.is_some());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn reopening_a_task_reopens_completed_ancestors() {
    let root = unique_workspace();
    let app = open_app(&root, &Settings::default());

    let epic = app
        .create_entity(new_entity(EntityClass::Epic, "Epic", None))
        .unwrap()
        .entity
        .entity;
    let story = app
        .create_entity(new_entity(EntityClass::Story, "Story", Some(&epic.id)))
        .unwrap()
        .entity
        .entity;
    let task = app
        .create_entity(new_entity(EntityClass::Task, "Only", Some(&story.id)))
        .unwrap()
        .entity
        .entity;
    let completed = app.set_status(&task.id, "3", false).unwrap();
    assert_eq!(completed.cascade.len(), 2);

    let reopened = app
        .set_status(&task.id, "1", false)
        .expect("advisory policy should allow leaving a final state");
    assert!(reopened.entity.entity.completed_at.is_none());
    let targets: Vec<&StateId> = reopened.cascade.iter().map(|update| &update.to).collect();
    assert_eq!(
        targets,
        vec![&StateId::from("in_progress"), &StateId::from("in_progress")]
    );

    let epic_now = app.show_entity(&epic.id).unwrap().unwrap();
    assert_eq!(epic_now.entity.status, StateId::from("in_progress"));
    assert!(epic_now.entity.completed_at.is_none());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn adding_open_child_to_completed_parent_reopens_it() {
    let root = unique_workspace();
    let app = open_app(&root, &Settings::default());

    let epic = app
        .create_entity(new_entity(EntityClass::Epic, "Epic", None))
        .unwrap()
        .entity
        .entity;
    let mut story = new_entity(EntityClass::Story, "Shipped", Some(&epic.id));
    story.status = Some("done".to_string());
    let created = app.create_entity(story).unwrap();
    assert_eq!(created.cascade.len(), 1);
    assert_eq!(created.cascade[0].to, StateId::from("completed"));

    let added = app
        .create_entity(new_entity(EntityClass::Story, "Follow-up", Some(&epic.id)))
        .unwrap();
    assert_eq!(added.cascade.len(), 1);
    assert_eq!(added.cascade[0].from, StateId::from("completed"));
    assert_eq!(added.cascade[0].to, StateId::from("in_progress"));
    assert_eq!(added.cascade[0].percentage, 50);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn strict_policy_requires_force_to_leave_final_state() {
    let root = unique_workspace();
    let settings = Settings::from_toml("[workflow]\nterminal_exit = \"strict\"\n")
        .expect("settings should parse");
    assert_eq!(settings.workflow.terminal_exit, TransitionPolicy::Strict);
    let app = open_app(&root, &settings);

    let task = app
        .create_entity(new_entity(EntityClass::Task, "Loose task", None))
        .unwrap()
        .entity
        .entity;
    app.set_status(&task.id, "3", false).unwrap();

    let err = app
        .set_status(&task.id, "2", false)
        .expect_err("strict policy should refuse");
    assert!(err.to_string().contains("requires --force"));

    let forced = app.set_status(&task.id, "2", true).expect("force should win");
    assert_eq!(forced.entity.entity.status, StateId::Number(2));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn repeating_current_status_is_a_no_op() {
    let root = unique_workspace();
    let app = open_app(&root, &Settings::default());

    let task = app
        .create_entity(new_entity(EntityClass::Task, "Task", None))
        .unwrap()
        .entity
        .entity;
    let same = app.set_status(&task.id, "1", false).unwrap();
    assert!(!same.changed);
    assert_eq!(same.entity.entity.updated_at, task.updated_at);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn update_entity_changes_title_and_effort() {
    let root = unique_workspace();
    let app = open_app(&root, &Settings::default());

    let task = app
        .create_entity(new_entity(EntityClass::Task, "Draft", None))
        .unwrap()
        .entity
        .entity;
    let updated = app
        .update_entity(
            &task.id,
            EntityPatch {
                title: Some("Final title".to_string()),
                estimate: Some(5.0),
                actual: Some(2.5),
            },
        )
        .expect("update should succeed");
    assert_eq!(updated.entity.title, "Final title");
    let effort = updated.entity.effort.expect("effort should be set");
    assert_eq!(effort.estimated, 5.0);
    assert_eq!(effort.actual, 2.5);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn list_hides_terminal_entities_unless_requested() {
    let root = unique_workspace();
    let app = open_app(&root, &Settings::default());

    let open = app
        .create_entity(new_entity(EntityClass::Task, "Open", None))
        .unwrap()
        .entity
        .entity;
    let closed = app
        .create_entity(new_entity(EntityClass::Task, "Closed", None))
        .unwrap()
        .entity
        .entity;
    app.set_status(&closed.id, "3", false).unwrap();

    let visible = app.list_entities(&EntityListFilter::default()).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].entity.id, open.id);

    let all = app
        .list_entities(&EntityListFilter {
            include_all: true,
            ..EntityListFilter::default()
        })
        .unwrap();
    assert_eq!(all.len(), 2);

    let story = app
        .create_entity(new_entity(EntityClass::Story, "Holder", None))
        .unwrap()
        .entity
        .entity;
    let child = app
        .create_entity(new_entity(EntityClass::Task, "Child", Some(&story.id)))
        .unwrap()
        .entity
        .entity;
    let under_story = app
        .list_entities(&EntityListFilter {
            parent_id: Some(story.id.to_uppercase()),
            ..EntityListFilter::default()
        })
        .unwrap();
    assert_eq!(under_story.len(), 1);
    assert_eq!(under_story[0].entity.id, child.id);
    assert_eq!(app.children(&story.id).unwrap().len(), 1);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn state_set_edits_persist_and_reset() {
    let root = unique_workspace();
    {
        let mut app = open_app(&root, &Settings::default());
        let edited = app
            .edit_state_set(
                EntityClass::Task,
                &StateSetEdit::AddState {
                    state: State::new(4, "Bloqueada"),
                    position: Some(2),
                    terminal: false,
                },
            )
            .expect("edit should succeed");
        let ids: Vec<StateId> = edited.ordered_states().iter().map(|s| s.id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                StateId::Number(1),
                StateId::Number(2),
                StateId::Number(4),
                StateId::Number(3)
            ]
        );
    }

    let mut reopened = open_app(&root, &Settings::default());
    let view = reopened.state_set(EntityClass::Task).unwrap();
    assert!(view.customized);
    assert_eq!(view.state_set.ordered_states().len(), 4);
    assert!(!reopened.state_set(EntityClass::Epic).unwrap().customized);

    assert!(reopened.reset_state_set(EntityClass::Task).unwrap());
    let view = reopened.state_set(EntityClass::Task).unwrap();
    assert!(!view.customized);
    assert_eq!(view.state_set.ordered_states().len(), 3);
    assert_eq!(reopened.state_sets().unwrap().len(), 4);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn entities_in_removed_states_render_with_default_label() {
    let root = unique_workspace();
    let mut app = open_app(&root, &Settings::default());

    let story = app
        .create_entity(new_entity(EntityClass::Story, "Reviewed", None))
        .unwrap()
        .entity
        .entity;
    app.set_status(&story.id, "review", false).unwrap();
    app.edit_state_set(
        EntityClass::Story,
        &StateSetEdit::RemoveState(StateId::from("review")),
    )
    .expect("unprotected state should be removable");

    let shown = app.show_entity(&story.id).unwrap().unwrap();
    assert_eq!(shown.entity.status, StateId::from("review"));
    assert_eq!(shown.status_label, "Pendiente");
    assert!(!shown.terminal);

    let _ = std::fs::remove_dir_all(root);
}
