use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::entity_class::EntityClass;
use crate::domain::state::{State, StateId};

const WORKFLOWS_TOML: &str = include_str!("workflows.toml");

/// Ordered, organization-configured states for one entity class.
///
/// A `StateSet` is only ever built through validation, so every accessor can
/// rely on the default, final and reopen ids pointing at real states.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawStateSet")]
pub struct StateSet {
    states: Vec<State>,
    default_state: StateId,
    final_states: Vec<StateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reopen_state: Option<StateId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStateSet {
    states: Vec<State>,
    default_state: StateId,
    #[serde(default)]
    final_states: Vec<StateId>,
    #[serde(default)]
    reopen_state: Option<StateId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateSetError {
    #[error("state set is missing its 'states' array")]
    MissingStates,
    #[error("state set 'states' must be an array")]
    StatesNotArray,
    #[error("malformed state set: {0}")]
    Malformed(String),
    #[error("state set must define at least one state")]
    Empty,
    #[error("state ids cannot be empty")]
    EmptyStateId,
    #[error("duplicate state id '{0}'")]
    DuplicateState(StateId),
    #[error("default state '{0}' is not a configured state")]
    UnknownDefault(StateId),
    #[error("final state '{0}' is not a configured state")]
    UnknownFinal(StateId),
    #[error("more than one state is flagged as default")]
    MultipleDefaults,
    #[error("state '{flagged}' is flagged as default but default_state is '{default_state}'")]
    DefaultFlagMismatch {
        flagged: StateId,
        default_state: StateId,
    },
    #[error("reopen state '{0}' must be a configured, non-final, non-default state")]
    InvalidReopen(StateId),
    #[error("unknown state '{0}'")]
    UnknownState(StateId),
    #[error("state '{0}' is protected and cannot be removed")]
    ProtectedState(StateId),
    #[error("state '{0}' is the default state and cannot be removed")]
    RemoveDefault(StateId),
    #[error("state '{0}' is the reopen state and cannot be removed")]
    RemoveReopen(StateId),
}

impl TryFrom<RawStateSet> for StateSet {
    type Error = StateSetError;

    fn try_from(raw: RawStateSet) -> Result<Self, Self::Error> {
        let mut states = raw.states;
        for state in &mut states {
            state.id = normalize(&state.id)?;
        }

        let mut final_states: Vec<StateId> = Vec::with_capacity(raw.final_states.len());
        for id in &raw.final_states {
            let id = normalize(id)?;
            if !final_states.contains(&id) {
                final_states.push(id);
            }
        }

        let set = StateSet {
            states,
            default_state: normalize(&raw.default_state)?,
            final_states,
            reopen_state: raw.reopen_state.as_ref().map(normalize).transpose()?,
        };
        set.validate()?;
        Ok(set)
    }
}

fn normalize(id: &StateId) -> Result<StateId, StateSetError> {
    id.normalized().ok_or(StateSetError::EmptyStateId)
}

/// One organization edit to a state set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateSetEdit {
    AddState {
        state: State,
        position: Option<usize>,
        terminal: bool,
    },
    RemoveState(StateId),
    SetDefault(StateId),
    SetFinal {
        id: StateId,
        terminal: bool,
    },
    MoveState {
        id: StateId,
        index: usize,
    },
    SetReopen(Option<StateId>),
}

impl StateSet {
    /// Parses the shape delivered by the organization configuration.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, StateSetError> {
        match value.get("states") {
            None => return Err(StateSetError::MissingStates),
            Some(states) if !states.is_array() => return Err(StateSetError::StatesNotArray),
            Some(_) => {}
        }
        let raw: RawStateSet = serde_json::from_value(value.clone())
            .map_err(|err| StateSetError::Malformed(err.to_string()))?;
        StateSet::try_from(raw)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "states": self.states,
            "default_state": self.default_state,
            "final_states": self.final_states,
            "reopen_state": self.reopen_state,
        })
    }

    fn validate(&self) -> Result<(), StateSetError> {
        if self.states.is_empty() {
            return Err(StateSetError::Empty);
        }

        let mut seen = HashSet::new();
        for state in &self.states {
            if !seen.insert(&state.id) {
                return Err(StateSetError::DuplicateState(state.id.clone()));
            }
        }
        if !seen.contains(&self.default_state) {
            return Err(StateSetError::UnknownDefault(self.default_state.clone()));
        }
        if let Some(unknown) = self.final_states.iter().find(|id| !seen.contains(id)) {
            return Err(StateSetError::UnknownFinal(unknown.clone()));
        }

        let mut flagged = self.states.iter().filter(|state| state.is_default);
        if let Some(first) = flagged.next() {
            if flagged.next().is_some() {
                return Err(StateSetError::MultipleDefaults);
            }
            if first.id != self.default_state {
                return Err(StateSetError::DefaultFlagMismatch {
                    flagged: first.id.clone(),
                    default_state: self.default_state.clone(),
                });
            }
        }

        if let Some(reopen) = &self.reopen_state {
            if !seen.contains(reopen) || self.is_terminal(reopen) || *reopen == self.default_state
            {
                return Err(StateSetError::InvalidReopen(reopen.clone()));
            }
        }

        Ok(())
    }

    pub fn ordered_states(&self) -> &[State] {
        &self.states
    }

    pub fn default_state(&self) -> &StateId {
        &self.default_state
    }

    pub fn final_states(&self) -> &[StateId] {
        &self.final_states
    }

    pub fn reopen_state(&self) -> Option<&StateId> {
        self.reopen_state.as_ref()
    }

    pub fn find(&self, id: &StateId) -> Option<&State> {
        self.states.iter().find(|state| state.id == *id)
    }

    pub fn contains(&self, id: &StateId) -> bool {
        self.find(id).is_some()
    }

    pub fn position(&self, id: &StateId) -> Option<usize> {
        self.states.iter().position(|state| state.id == *id)
    }

    pub fn default(&self) -> &State {
        // validation guarantees the default id is present and the list non-empty
        self.find(&self.default_state).unwrap_or(&self.states[0])
    }

    /// Looks a state up, substituting the default state for unknown ids.
    pub fn resolve(&self, id: &StateId) -> &State {
        if let Some(state) = self.find(id) {
            return state;
        }
        let fallback = self.default();
        tracing::warn!(
            state = %id,
            fallback = %fallback.id,
            "unknown state id, resolving to default state"
        );
        fallback
    }

    pub fn is_terminal(&self, id: &StateId) -> bool {
        self.final_states.contains(id)
    }

    /// Leaving a final state is the only transition flagged as unusual.
    pub fn is_valid_transition(&self, from: &StateId, to: &StateId) -> bool {
        from == to || !self.is_terminal(from)
    }

    /// First final state in presentation order.
    pub fn canonical_terminal(&self) -> Option<&State> {
        self.states
            .iter()
            .find(|state| self.is_terminal(&state.id))
    }

    pub fn reopen(&self) -> Option<&State> {
        self.reopen_state.as_ref().and_then(|id| self.find(id))
    }

    pub fn edited(&self, edit: &StateSetEdit) -> Result<StateSet, StateSetError> {
        match edit {
            StateSetEdit::AddState {
                state,
                position,
                terminal,
            } => {
                let added = self.with_state_added(state.clone(), *position)?;
                if *terminal {
                    added.with_final(&normalize(&state.id)?, true)
                } else {
                    Ok(added)
                }
            }
            StateSetEdit::RemoveState(id) => self.with_state_removed(id),
            StateSetEdit::SetDefault(id) => self.with_default(id),
            StateSetEdit::SetFinal { id, terminal } => self.with_final(id, *terminal),
            StateSetEdit::MoveState { id, index } => self.with_state_moved(id, *index),
            StateSetEdit::SetReopen(id) => self.with_reopen(id.as_ref()),
        }
    }

    pub fn with_state_added(
        &self,
        state: State,
        position: Option<usize>,
    ) -> Result<StateSet, StateSetError> {
        if self.contains(&state.id) {
            return Err(StateSetError::DuplicateState(state.id));
        }
        let mut raw = self.to_raw();
        let index = position.unwrap_or(raw.states.len()).min(raw.states.len());
        raw.states.insert(index, state);
        StateSet::try_from(raw)
    }

    pub fn with_state_removed(&self, id: &StateId) -> Result<StateSet, StateSetError> {
        let state = self
            .find(id)
            .ok_or_else(|| StateSetError::UnknownState(id.clone()))?;
        if state.is_protected {
            return Err(StateSetError::ProtectedState(id.clone()));
        }
        if *id == self.default_state {
            return Err(StateSetError::RemoveDefault(id.clone()));
        }
        if self.reopen_state.as_ref() == Some(id) {
            return Err(StateSetError::RemoveReopen(id.clone()));
        }

        let mut raw = self.to_raw();
        raw.states.retain(|candidate| candidate.id != *id);
        raw.final_states.retain(|candidate| candidate != id);
        StateSet::try_from(raw)
    }

    pub fn with_default(&self, id: &StateId) -> Result<StateSet, StateSetError> {
        self.require(id)?;
        let mut raw = self.to_raw();
        for state in &mut raw.states {
            state.is_default = state.id == *id;
        }
        raw.default_state = id.clone();
        StateSet::try_from(raw)
    }

    pub fn with_final(&self, id: &StateId, terminal: bool) -> Result<StateSet, StateSetError> {
        self.require(id)?;
        let mut raw = self.to_raw();
        if terminal {
            if !raw.final_states.contains(id) {
                raw.final_states.push(id.clone());
            }
        } else {
            raw.final_states.retain(|candidate| candidate != id);
        }
        StateSet::try_from(raw)
    }

    pub fn with_state_moved(&self, id: &StateId, index: usize) -> Result<StateSet, StateSetError> {
        let from = self
            .position(id)
            .ok_or_else(|| StateSetError::UnknownState(id.clone()))?;
        let mut raw = self.to_raw();
        let state = raw.states.remove(from);
        let target = index.min(raw.states.len());
        raw.states.insert(target, state);
        StateSet::try_from(raw)
    }

    pub fn with_reopen(&self, id: Option<&StateId>) -> Result<StateSet, StateSetError> {
        if let Some(id) = id {
            self.require(id)?;
        }
        let mut raw = self.to_raw();
        raw.reopen_state = id.cloned();
        StateSet::try_from(raw)
    }

    fn require(&self, id: &StateId) -> Result<&State, StateSetError> {
        self.find(id)
            .ok_or_else(|| StateSetError::UnknownState(id.clone()))
    }

    fn to_raw(&self) -> RawStateSet {
        RawStateSet {
            states: self.states.clone(),
            default_state: self.default_state.clone(),
            final_states: self.final_states.clone(),
            reopen_state: self.reopen_state.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawRegistryFile {
    #[serde(default)]
    state_sets: BTreeMap<String, serde_json::Value>,
}

/// State sets of one organization, one per entity class.
#[derive(Debug, Clone)]
pub struct StateSetRegistry {
    sets: BTreeMap<EntityClass, StateSet>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid state set TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown entity class '{0}' in state set file")]
    UnknownClass(String),
    #[error("no state set configured for {0}")]
    MissingClass(EntityClass),
    #[error("invalid state set for {class}: {source}")]
    InvalidStateSet {
        class: EntityClass,
        source: StateSetError,
    },
}

impl StateSetRegistry {
    /// The application's hard-coded defaults, used until an organization
    /// customizes a class.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_toml(WORKFLOWS_TOML)
    }

    pub(crate) fn from_toml(raw: &str) -> Result<Self, RegistryError> {
        let file: RawRegistryFile = toml::from_str(raw)?;
        let mut sets = BTreeMap::new();
        for (key, value) in file.state_sets {
            let class = EntityClass::from_str(&key)
                .map_err(|_| RegistryError::UnknownClass(key.clone()))?;
            let set = StateSet::from_json(&value)
                .map_err(|source| RegistryError::InvalidStateSet { class, source })?;
            sets.insert(class, set);
        }

        if let Some(missing) = EntityClass::ALL
            .into_iter()
            .find(|class| !sets.contains_key(class))
        {
            return Err(RegistryError::MissingClass(missing));
        }

        Ok(Self { sets })
    }

    pub fn with_override(mut self, class: EntityClass, set: StateSet) -> Self {
        self.sets.insert(class, set);
        self
    }

    pub fn require(&self, class: EntityClass) -> Result<&StateSet, RegistryError> {
        self.sets
            .get(&class)
            .ok_or(RegistryError::MissingClass(class))
    }

    pub fn list(&self) -> Vec<(EntityClass, &StateSet)> {
        self.sets.iter().map(|(class, set)| (*class, set)).collect()
    }
}


#[cfg(test)]
#[path = "workflow_tests_ext.rs"]
mod tests_ext;
