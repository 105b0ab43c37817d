use super::{apply_filters, EntityListFilter};
use crate::app::EntityView;
use crate::domain::entity_class::EntityClass;
use crate::domain::state::StateId;
use crate::test_support::entity;

fn view(
    id: &str,
    class: EntityClass,
    parent: Option<&str>,
    status: StateId,
    label: &str,
    terminal: bool,
) -> EntityView {
    let mut row = entity(id, class, status);
    row.title = format!("Title of {id}");
    if let Some(parent) = parent {
        row = row.with_parent(parent);
    }
    EntityView {
        entity: row,
        status_label: label.to_string(),
        terminal,
    }
}

fn sample() -> Vec<EntityView> {
    vec![
        view("ep-1", EntityClass::Epic, None, StateId::from("planned"), "Planificada", false),
        view("us-1", EntityClass::Story, Some("ep-1"), StateId::from("done"), "Terminada", true),
        view("us-2", EntityClass::Story, Some("ep-1"), StateId::from("review"), "En revisión", false),
        view("tk-1", EntityClass::Task, Some("us-2"), StateId::Number(2), "En progreso", false),
    ]
}

fn ids(views: &[EntityView]) -> Vec<&str> {
    views.iter().map(|view| view.entity.id.as_str()).collect()
}

#[test]
fn default_listing_hides_terminal_entities() {
    let listed = apply_filters(sample(), &EntityListFilter::default());
    assert_eq!(ids(&listed), ["ep-1", "us-2", "tk-1"]);
}

#[test]
fn include_all_returns_everything() {
    let filter = EntityListFilter {
        include_all: true,
        ..EntityListFilter::default()
    };
    assert_eq!(apply_filters(sample(), &filter).len(), 4);
}

#[test]
fn status_filter_reveals_terminal_entities() {
    let filter = EntityListFilter {
        status: Some(" Done ".to_string()),
        ..EntityListFilter::default()
    };
    assert_eq!(ids(&apply_filters(sample(), &filter)), ["us-1"]);
}

#[test]
fn status_filter_accepts_numeric_ids_and_labels() {
    let by_id = EntityListFilter {
        status: Some("2".to_string()),
        ..EntityListFilter::default()
    };
    assert_eq!(ids(&apply_filters(sample(), &by_id)), ["tk-1"]);

    let by_label = EntityListFilter {
        status: Some("en revisión".to_string()),
        ..EntityListFilter::default()
    };
    assert_eq!(ids(&apply_filters(sample(), &by_label)), ["us-2"]);
}

#[test]
fn filters_by_class_and_parent() {
    let filter = EntityListFilter {
        include_all: true,
        class: Some(EntityClass::Story),
        parent_id: Some("EP-1".to_string()),
        ..EntityListFilter::default()
    };
    assert_eq!(ids(&apply_filters(sample(), &filter)), ["us-1", "us-2"]);
}

#[test]
fn query_matches_title_and_id() {
    let filter = EntityListFilter {
        query: Some("TK-".to_string()),
        ..EntityListFilter::default()
    };
    assert_eq!(ids(&apply_filters(sample(), &filter)), ["tk-1"]);

    let filter = EntityListFilter {
        query: Some("title of us".to_string()),
        ..EntityListFilter::default()
    };
    assert_eq!(ids(&apply_filters(sample(), &filter)), ["us-2"]);
}
