use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityClass {
    Epic,
    Story,
    Task,
    TimeEntry,
}

impl EntityClass {
    pub const ALL: [EntityClass; 4] = [
        EntityClass::Epic,
        EntityClass::Story,
        EntityClass::Task,
        EntityClass::TimeEntry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityClass::Epic => "epic",
            EntityClass::Story => "story",
            EntityClass::Task => "task",
            EntityClass::TimeEntry => "time_entry",
        }
    }

    pub fn id_prefix(self) -> &'static str {
        match self {
            EntityClass::Epic => "ep",
            EntityClass::Story => "us",
            EntityClass::Task => "tk",
            EntityClass::TimeEntry => "te",
        }
    }

    /// Class whose progress aggregates this class. Projects sit above epics
    /// and are owned elsewhere.
    pub fn parent_class(self) -> Option<EntityClass> {
        match self {
            EntityClass::Epic => None,
            EntityClass::Story => Some(EntityClass::Epic),
            EntityClass::Task => Some(EntityClass::Story),
            EntityClass::TimeEntry => Some(EntityClass::Task),
        }
    }

    pub fn child_class(self) -> Option<EntityClass> {
        EntityClass::ALL
            .into_iter()
            .find(|candidate| candidate.parent_class() == Some(self))
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityClass {
    type Err = ParseEntityClassError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "epic" | "epics" => Ok(EntityClass::Epic),
            "story" | "stories" | "user_story" | "kanban" => Ok(EntityClass::Story),
            "task" | "tasks" => Ok(EntityClass::Task),
            "time_entry" | "time_entries" | "time" => Ok(EntityClass::TimeEntry),
            _ => Err(ParseEntityClassError {
                value: value.to_string(),
            }),
        }
    }
}

impl Serialize for EntityClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        EntityClass::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "invalid entity class '{value}': expected one of epic, story, task, time_entry"
)]
pub struct ParseEntityClassError {
    value: String,
}
