use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::domain::entity::{Effort, Entity};
use crate::domain::entity_class::EntityClass;
use crate::domain::state::StateId;
use crate::workflow::StateSet;

pub fn at(raw: &str) -> OffsetDateTime {
    OffsetDateTime::parse(raw, &Rfc3339).expect("test timestamp should parse")
}

/// Pendiente / En progreso / Completada with `3` as the only final state.
pub fn task_states() -> StateSet {
    StateSet::from_json(&json!({
        "states": [
            { "id": 1, "label": "Pendiente", "isDefault": true, "isProtected": true },
            { "id": 2, "label": "En progreso" },
            { "id": 3, "label": "Completada", "isProtected": true }
        ],
        "default_state": 1,
        "final_states": [3],
        "reopen_state": 2
    }))
    .expect("task state set should be valid")
}

pub fn epic_states() -> StateSet {
    StateSet::from_json(&json!({
        "states": [
            { "id": "planned", "label": "Planned", "isDefault": true },
            { "id": "in_progress", "label": "In progress" },
            { "id": "completed", "label": "Completed" }
        ],
        "default_state": "planned",
        "final_states": ["completed"],
        "reopen_state": "in_progress"
    }))
    .expect("epic state set should be valid")
}

pub fn entity(id: &str, class: EntityClass, status: impl Into<StateId>) -> Entity {
    Entity::new(
        id.to_string(),
        class,
        id,
        status.into(),
        at("2026-01-01T00:00:00Z"),
    )
}

pub fn task(id: &str, status: i64, estimated: f64, actual: f64) -> Entity {
    entity(id, EntityClass::Task, status).with_effort(Effort { estimated, actual })
}
