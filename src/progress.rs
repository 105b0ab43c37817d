use serde::Serialize;

use crate::domain::entity::Entity;
use crate::domain::state::StateId;
use crate::workflow::StateSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentTransition {
    pub should_change: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<StateId>,
}

impl ParentTransition {
    fn none() -> Self {
        Self {
            should_change: false,
            new_status: None,
        }
    }

    fn to(status: &StateId) -> Self {
        Self {
            should_change: true,
            new_status: Some(status.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub percentage: u8,
    pub parent_transition: Option<ParentTransition>,
}

/// Derives a parent's progress from its children.
pub struct ProgressAggregator;

impl ProgressAggregator {
    /// Share of children in a final state, rounded half up.
    pub fn compute_percentage(children: &[Entity], child_set: &StateSet) -> u8 {
        let total = children.len() as u64;
        if total == 0 {
            return 0;
        }
        let done = children
            .iter()
            .filter(|child| child_set.is_terminal(&child.status))
            .count() as u64;
        ((200 * done + total) / (2 * total)) as u8
    }

    /// Proposes a parent status change. Children are judged against their own
    /// state set; the parent's target states come from the parent's set.
    pub fn decide_parent_transition(
        parent: &Entity,
        children: &[Entity],
        child_set: &StateSet,
        parent_set: &StateSet,
    ) -> ParentTransition {
        let Some(terminal) = parent_set.canonical_terminal() else {
            return ParentTransition::none();
        };

        let all_terminal = !children.is_empty()
            && children
                .iter()
                .all(|child| child_set.is_terminal(&child.status));
        let parent_complete = parent.status == terminal.id;

        if all_terminal && !parent_complete {
            return ParentTransition::to(&terminal.id);
        }

        if !all_terminal && parent_complete {
            return match parent_set.reopen() {
                Some(reopen) => ParentTransition::to(&reopen.id),
                None => {
                    tracing::warn!(
                        parent = %parent.id,
                        "parent lost completion but its state set has no reopen_state"
                    );
                    ParentTransition::none()
                }
            };
        }

        ParentTransition::none()
    }

    pub fn aggregate(
        parent: &Entity,
        children: &[Entity],
        child_set: &StateSet,
        parent_set: &StateSet,
    ) -> Aggregation {
        let percentage = Self::compute_percentage(children, child_set);
        let decision = Self::decide_parent_transition(parent, children, child_set, parent_set);
        Aggregation {
            percentage,
            parent_transition: decision.should_change.then_some(decision),
        }
    }
}
