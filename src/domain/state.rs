use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a state inside one state set.
///
/// Organizations configure either numeric ids (task states) or string keys
/// (kanban columns); both are carried by the same type so the core never has
/// to guess which flavour it is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateId {
    Number(i64),
    Key(String),
}

impl StateId {
    /// Normalizes raw user or storage input into a state id.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(number) = trimmed.parse::<i64>() {
            return Some(StateId::Number(number));
        }
        Some(StateId::Key(trimmed.to_ascii_lowercase().replace('-', "_")))
    }

    /// The form `parse` yields for this id's text, so stored statuses read
    /// back equal to the configured id.
    pub fn normalized(&self) -> Option<Self> {
        match self {
            StateId::Number(_) => Some(self.clone()),
            StateId::Key(key) => StateId::parse(key),
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateId::Number(value) => write!(f, "{value}"),
            StateId::Key(value) => f.write_str(value),
        }
    }
}

impl FromStr for StateId {
    type Err = ParseStateIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        StateId::parse(value).ok_or(ParseStateIdError)
    }
}

impl From<i64> for StateId {
    fn from(value: i64) -> Self {
        StateId::Number(value)
    }
}

impl From<&str> for StateId {
    fn from(value: &str) -> Self {
        StateId::Key(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("state id cannot be empty")]
pub struct ParseStateIdError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct State {
    pub id: StateId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, rename = "isDefault", alias = "is_default")]
    pub is_default: bool,
    #[serde(default, rename = "isProtected", alias = "is_protected")]
    pub is_protected: bool,
}

impl State {
    pub fn new(id: impl Into<StateId>, label: &str) -> Self {
        Self {
            id: id.into(),
            label: label.to_string(),
            icon: None,
            color: None,
            is_default: false,
            is_protected: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{State, StateId};

    #[test]
    fn parse_normalizes_numbers_and_keys() {
        assert_eq!(StateId::parse(" 3 "), Some(StateId::Number(3)));
        assert_eq!(StateId::parse("-1"), Some(StateId::Number(-1)));
        assert_eq!(
            StateId::parse("In-Progress"),
            Some(StateId::from("in_progress"))
        );
        assert_eq!(StateId::parse("   "), None);
    }

    #[test]
    fn normalized_keys_match_parsed_storage_text() {
        assert_eq!(StateId::from("Done").normalized(), Some(StateId::from("done")));
        assert_eq!(StateId::from(" 7 ").normalized(), Some(StateId::Number(7)));
        assert_eq!(StateId::Number(3).normalized(), Some(StateId::Number(3)));
        assert_eq!(StateId::from("  ").normalized(), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for id in [StateId::Number(42), StateId::from("done")] {
            assert_eq!(StateId::parse(&id.to_string()), Some(id));
        }
    }

    #[test]
    fn deserializes_external_state_shape() {
        let state: State = serde_json::from_value(serde_json::json!({
            "id": 2,
            "label": "En progreso",
            "icon": "clock",
            "isDefault": false,
            "isProtected": true
        }))
        .expect("state should deserialize");
        assert_eq!(state.id, StateId::Number(2));
        assert_eq!(state.icon.as_deref(), Some("clock"));
        assert!(state.color.is_none());
        assert!(state.is_protected);

        let keyed: State = serde_json::from_value(serde_json::json!({
            "id": "done",
            "label": "Done",
            "is_default": true
        }))
        .expect("snake_case flags should be accepted");
        assert_eq!(keyed.id, StateId::from("done"));
        assert!(keyed.is_default);
    }
}
