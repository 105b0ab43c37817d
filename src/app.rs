use std::collections::BTreeMap;
use std::str::FromStr;

use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::{ConfigError, Settings};
use crate::db;
use crate::domain::entity::{Effort, Entity};
use crate::domain::entity_class::{EntityClass, ParseEntityClassError};
use crate::domain::state::StateId;
use crate::entity_id::{generate_entity_id, normalize_entity_id};
use crate::listing::{self, EntityListFilter};
use crate::progress::{ParentTransition, ProgressAggregator};
use crate::status::{EntityStatusController, InvalidStatusTransition, TransitionPolicy};
use crate::workflow::{RegistryError, StateSet, StateSetEdit, StateSetError, StateSetRegistry};

pub struct App {
    conn: Connection,
    registry: StateSetRegistry,
    policy: TransitionPolicy,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntityView {
    #[serde(flatten)]
    pub entity: Entity,
    pub status_label: String,
    pub terminal: bool,
}

#[derive(Debug, Clone)]
pub struct NewEntity {
    pub class: EntityClass,
    pub title: String,
    pub parent_id: Option<String>,
    pub estimate: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    pub title: Option<String>,
    pub estimate: Option<f64>,
    pub actual: Option<f64>,
}

impl EntityPatch {
    fn has_changes(&self) -> bool {
        self.title.is_some() || self.estimate.is_some() || self.actual.is_some()
    }
}

/// A parent whose status was moved by progress aggregation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParentUpdate {
    pub id: String,
    pub class: EntityClass,
    pub from: StateId,
    pub to: StateId,
    pub percentage: u8,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntityChange {
    pub entity: EntityView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<StateId>,
    pub changed: bool,
    pub cascade: Vec<ParentUpdate>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressReport {
    pub entity: EntityView,
    pub children: usize,
    pub completed: usize,
    pub percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_transition: Option<ParentTransition>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StateSetView {
    pub class: EntityClass,
    pub customized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customized_at: Option<String>,
    pub state_set: StateSet,
}

impl App {
    pub fn open(db_path: &str, settings: &Settings) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let conn = db::open_connection(db_path)?;
        let registry = load_registry(&conn)?;
        Ok(Self {
            conn,
            registry,
            policy: settings.workflow.terminal_exit,
        })
    }

    pub fn create_entity(&self, input: NewEntity) -> Result<EntityChange, AppError> {
        let class = input.class;
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidArgument(
                "title cannot be empty".to_string(),
            ));
        }
        if let Some(hours) = input.estimate {
            validate_hours("estimate", hours)?;
        }
        let parent = match input.parent_id.as_deref() {
            Some(raw) => Some(self.require_parent(class, raw)?),
            None => None,
        };

        let set = self.registry.require(class)?;
        let now = OffsetDateTime::now_utc();
        let id = generate_entity_id(class, |candidate| db::entity_exists(&self.conn, candidate))?;

        let mut entity = Entity::new(id, class, title, set.default_state().clone(), now);
        if let Some(parent) = &parent {
            entity = entity.with_parent(&parent.id);
        }
        if let Some(hours) = input.estimate {
            entity = entity.with_effort(Effort::estimated(hours));
        }
        if let Some(raw) = input.status.as_deref() {
            let requested = parse_state(raw)?;
            entity = EntityStatusController::apply(&entity, &requested, set, now);
        }

        db::upsert_entity(&self.conn, &entity)?;
        let cascade = match parent {
            Some(parent) => self.propagate(&parent.id, now)?,
            None => Vec::new(),
        };

        Ok(EntityChange {
            entity: self.view(entity)?,
            previous_status: None,
            changed: true,
            cascade,
        })
    }

    pub fn set_status(
        &self,
        id: &str,
        raw_state: &str,
        force: bool,
    ) -> Result<EntityChange, AppError> {
        let current = self.require_entity(id)?;
        let next = parse_state(raw_state)?;
        let set = self.registry.require(current.class)?;
        EntityStatusController::check_transition(set, &current.status, &next, force, self.policy)?;

        let now = OffsetDateTime::now_utc();
        let mut updated = EntityStatusController::apply(&current, &next, set, now);
        if updated == current {
            return Ok(EntityChange {
                entity: self.view(current.clone())?,
                previous_status: Some(current.status),
                changed: false,
                cascade: Vec::new(),
            });
        }
        updated.updated_at = now;
        db::upsert_entity(&self.conn, &updated)?;

        // Aggregation runs only once the child write has landed.
        let cascade = match updated.parent_id.as_deref() {
            Some(parent_id) => self.propagate(parent_id, now)?,
            None => Vec::new(),
        };

        Ok(EntityChange {
            entity: self.view(updated)?,
            previous_status: Some(current.status),
            changed: true,
            cascade,
        })
    }

    pub fn update_entity(&self, id: &str, patch: EntityPatch) -> Result<EntityView, AppError> {
        if !patch.has_changes() {
            return Err(AppError::InvalidArgument(
                "update requires at least one field change".to_string(),
            ));
        }

        let current = self.require_entity(id)?;
        let mut updated = current.clone();

        if let Some(raw_title) = patch.title.as_deref() {
            let title = raw_title.trim();
            if title.is_empty() {
                return Err(AppError::InvalidArgument(
                    "title cannot be empty".to_string(),
                ));
            }
            updated.title = title.to_string();
        }
        if let Some(hours) = patch.estimate {
            validate_hours("estimate", hours)?;
            let effort = updated.effort.get_or_insert(Effort::estimated(0.0));
            effort.estimated = hours;
        }
        if let Some(hours) = patch.actual {
            validate_hours("actual", hours)?;
            let effort = updated.effort.get_or_insert(Effort::estimated(0.0));
            effort.actual = hours;
        }

        if updated == current {
            return self.view(current);
        }
        updated.updated_at = OffsetDateTime::now_utc();
        db::upsert_entity(&self.conn, &updated)?;
        self.view(updated)
    }

    pub fn show_entity(&self, id: &str) -> Result<Option<EntityView>, AppError> {
        let Some(id) = normalize_entity_id(id) else {
            return Ok(None);
        };
        db::get_entity(&self.conn, &id)?
            .map(|entity| self.view(entity))
            .transpose()
    }

    pub fn list_entities(&self, filter: &EntityListFilter) -> Result<Vec<EntityView>, AppError> {
        let views = match filter.parent_id.as_deref() {
            Some(parent_id) => self.children(parent_id)?,
            None => db::list_entities(&self.conn)?
                .into_iter()
                .map(|entity| self.view(entity))
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(listing::apply_filters(views, filter))
    }

    pub fn children(&self, id: &str) -> Result<Vec<EntityView>, AppError> {
        let Some(id) = normalize_entity_id(id) else {
            return Ok(Vec::new());
        };
        db::list_children(&self.conn, &id)?
            .into_iter()
            .map(|entity| self.view(entity))
            .collect()
    }

    pub fn progress(&self, id: &str) -> Result<ProgressReport, AppError> {
        let entity = self.require_entity(id)?;
        let children = db::list_children(&self.conn, &entity.id)?;
        let parent_set = self.registry.require(entity.class)?;
        let child_set = match entity.class.child_class() {
            Some(child_class) => self.registry.require(child_class)?,
            None => parent_set,
        };

        let aggregation = ProgressAggregator::aggregate(&entity, &children, child_set, parent_set);
        let completed = children
            .iter()
            .filter(|child| child_set.is_terminal(&child.status))
            .count();
        Ok(ProgressReport {
            entity: self.view(entity)?,
            children: children.len(),
            completed,
            percentage: aggregation.percentage,
            parent_transition: aggregation.parent_transition,
        })
    }

    pub fn state_sets(&self) -> Result<Vec<StateSetView>, AppError> {
        let customized = self.customized_classes()?;
        Ok(self
            .registry
            .list()
            .into_iter()
            .map(|(class, set)| StateSetView {
                class,
                customized: customized.contains_key(&class),
                customized_at: customized.get(&class).cloned(),
                state_set: set.clone(),
            })
            .collect())
    }

    pub fn state_set(&self, class: EntityClass) -> Result<StateSetView, AppError> {
        let mut customized = self.customized_classes()?;
        let customized_at = customized.remove(&class);
        Ok(StateSetView {
            class,
            customized: customized_at.is_some(),
            customized_at,
            state_set: self.registry.require(class)?.clone(),
        })
    }

    /// Applies an organization edit and stores the result as that class's
    /// override. Entities keep whatever status they had.
    pub fn edit_state_set(
        &mut self,
        class: EntityClass,
        edit: &StateSetEdit,
    ) -> Result<StateSet, AppError> {
        let edited = self.registry.require(class)?.edited(edit)?;
        let body = serde_json::to_string(&edited.to_json())?;
        db::put_state_set_override(&self.conn, class, &body, OffsetDateTime::now_utc())?;
        self.registry = self.registry.clone().with_override(class, edited.clone());
        tracing::info!(class = %class, "stored customized state set");
        Ok(edited)
    }

    pub fn reset_state_set(&mut self, class: EntityClass) -> Result<bool, AppError> {
        let removed = db::delete_state_set_override(&self.conn, class)?;
        self.registry = load_registry(&self.conn)?;
        Ok(removed)
    }

    fn propagate(
        &self,
        parent_id: &str,
        now: OffsetDateTime,
    ) -> Result<Vec<ParentUpdate>, AppError> {
        let mut updates = Vec::new();
        let mut next_parent = Some(parent_id.to_string());

        while let Some(parent_id) = next_parent.take() {
            let Some(parent) = db::get_entity(&self.conn, &parent_id)? else {
                tracing::warn!(parent = %parent_id, "parent not found, skipping progress");
                break;
            };
            let Some(child_class) = parent.class.child_class() else {
                break;
            };
            let children = db::list_children(&self.conn, &parent.id)?;
            let child_set = self.registry.require(child_class)?;
            let parent_set = self.registry.require(parent.class)?;

            let aggregation =
                ProgressAggregator::aggregate(&parent, &children, child_set, parent_set);
            let Some(new_status) = aggregation
                .parent_transition
                .and_then(|transition| transition.new_status)
            else {
                break;
            };

            let mut updated = EntityStatusController::apply(&parent, &new_status, parent_set, now);
            updated.updated_at = now;
            db::upsert_entity(&self.conn, &updated)?;
            tracing::info!(
                parent = %parent.id,
                from = %parent.status,
                to = %updated.status,
                percentage = aggregation.percentage,
                "parent status follows child progress"
            );

            updates.push(ParentUpdate {
                id: parent.id,
                class: parent.class,
                from: parent.status,
                to: updated.status.clone(),
                percentage: aggregation.percentage,
            });
            next_parent = updated.parent_id;
        }

        Ok(updates)
    }

    fn require_entity(&self, raw_id: &str) -> Result<Entity, AppError> {
        let id = normalize_entity_id(raw_id)
            .ok_or_else(|| AppError::InvalidArgument("entity id is required".to_string()))?;
        db::get_entity(&self.conn, &id)?.ok_or(AppError::NotFound(id))
    }

    fn require_parent(&self, class: EntityClass, raw_id: &str) -> Result<Entity, AppError> {
        let Some(expected) = class.parent_class() else {
            return Err(AppError::InvalidArgument(format!(
                "{class} entities cannot have a parent"
            )));
        };
        let parent = self.require_entity(raw_id)?;
        if parent.class != expected {
            return Err(AppError::InvalidArgument(format!(
                "parent of a {class} must be a {expected}, got {} '{}'",
                parent.class, parent.id
            )));
        }
        Ok(parent)
    }

    fn view(&self, entity: Entity) -> Result<EntityView, AppError> {
        let set = self.registry.require(entity.class)?;
        let status_label = set.resolve(&entity.status).label.clone();
        let terminal = set.is_terminal(&entity.status);
        Ok(EntityView {
            entity,
            status_label,
            terminal,
        })
    }

    /// Classes with a stored override, mapped to when it was last written.
    fn customized_classes(&self) -> Result<BTreeMap<EntityClass, String>, AppError> {
        Ok(db::list_state_set_overrides(&self.conn)?
            .into_iter()
            .filter_map(|record| {
                let class = EntityClass::from_str(&record.class).ok()?;
                Some((class, record.updated_at))
            })
            .collect())
    }
}

fn load_registry(conn: &Connection) -> Result<StateSetRegistry, AppError> {
    let mut registry = StateSetRegistry::builtin()?;
    for record in db::list_state_set_overrides(conn)? {
        let class = EntityClass::from_str(&record.class)?;
        let body: serde_json::Value = serde_json::from_str(&record.body_json)?;
        let set = StateSet::from_json(&body)
            .map_err(|source| AppError::StoredStateSet { class, source })?;
        registry = registry.with_override(class, set);
    }
    Ok(registry)
}

fn parse_state(raw: &str) -> Result<StateId, AppError> {
    StateId::parse(raw).ok_or_else(|| AppError::InvalidArgument("state is required".to_string()))
}

fn validate_hours(field: &str, hours: f64) -> Result<(), AppError> {
    if hours.is_finite() && hours >= 0.0 {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!(
            "{field} must be a non-negative number of hours"
        )))
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Registry(#[from] RegistryError),
    #[error("invalid state set edit: {0}")]
    StateSet(#[from] StateSetError),
    #[error("stored state set for {class} is invalid: {source}")]
    StoredStateSet {
        class: EntityClass,
        source: StateSetError,
    },
    #[error("{0}")]
    Transition(#[from] InvalidStatusTransition),
    #[error("{0}")]
    ParseClass(#[from] ParseEntityClassError),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("entity '{0}' not found")]
    NotFound(String),
}

#[cfg(test)]
mod tests;

#[cfg(test)]
#[path = "app/tests_error_paths.rs"]
mod tests_error_paths;
