use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::entity::Entity;
use crate::domain::state::StateId;
use crate::workflow::StateSet;

/// How the application treats a request to leave a final state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    #[default]
    Advisory,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("leaving final state '{from}' for '{to}' requires --force")]
pub struct InvalidStatusTransition {
    pub from: StateId,
    pub to: StateId,
}

/// Applies status changes to single entities.
pub struct EntityStatusController;

impl EntityStatusController {
    /// Returns the entity moved to `next`, with completion and effort fields
    /// derived from crossing the final-state boundary. The input is left
    /// untouched so callers can roll back to it.
    pub fn apply(entity: &Entity, next: &StateId, set: &StateSet, now: OffsetDateTime) -> Entity {
        let target = set.resolve(next).id.clone();
        let was_terminal = set.is_terminal(&entity.status);
        let is_terminal = set.is_terminal(&target);

        let mut updated = entity.clone();
        updated.status = target;

        if is_terminal && !was_terminal {
            updated.completed_at = Some(now);
            if let Some(effort) = updated.effort.as_mut() {
                if !effort.has_actual() {
                    effort.actual = effort.estimated;
                }
            }
        } else if was_terminal && !is_terminal {
            updated.completed_at = None;
            if let Some(effort) = updated.effort.as_mut() {
                effort.actual = 0.0;
            }
        }

        updated
    }

    pub fn check_transition(
        set: &StateSet,
        from: &StateId,
        to: &StateId,
        force: bool,
        policy: TransitionPolicy,
    ) -> Result<(), InvalidStatusTransition> {
        let to = &set.resolve(to).id;
        if force || set.is_valid_transition(from, to) {
            return Ok(());
        }

        match policy {
            TransitionPolicy::Advisory => {
                tracing::info!(from = %from, to = %to, "reopening an item in a final state");
                Ok(())
            }
            TransitionPolicy::Strict => Err(InvalidStatusTransition {
                from: from.clone(),
                to: to.clone(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "status_tests_ext.rs"]
mod tests;
