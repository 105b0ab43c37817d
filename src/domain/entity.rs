use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::entity_class::EntityClass;
use super::state::StateId;

/// Estimated and actual effort in hours. An actual of zero means nothing
/// has been recorded yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effort {
    pub estimated: f64,
    pub actual: f64,
}

impl Effort {
    pub fn estimated(hours: f64) -> Self {
        Self {
            estimated: hours,
            actual: 0.0,
        }
    }

    pub fn has_actual(&self) -> bool {
        self.actual != 0.0
    }
}

/// Epic, user story, task or time entry as far as status tracking cares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub class: EntityClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub title: String,
    pub status: StateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<Effort>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Entity {
    pub fn new(
        id: String,
        class: EntityClass,
        title: &str,
        status: StateId,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            class,
            parent_id: None,
            title: title.to_string(),
            status,
            effort: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self
    }

    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = Some(effort);
        self
    }
}
