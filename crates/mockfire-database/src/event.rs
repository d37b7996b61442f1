use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;

/// Event names accepted by `once`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Value,
    ChildAdded,
    ChildRemoved,
    ChildChanged,
    ChildMoved,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::ChildAdded => "child_added",
            Self::ChildRemoved => "child_removed",
            Self::ChildChanged => "child_changed",
            Self::ChildMoved => "child_moved",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "value" => Self::Value,
            "child_added" => Self::ChildAdded,
            "child_removed" => Self::ChildRemoved,
            "child_changed" => Self::ChildChanged,
            "child_moved" => Self::ChildMoved,
            other => {
                return Err(DatabaseError::InvalidArgument(format!(
                    "unknown event type '{other}'"
                )))
            }
        })
    }
}
