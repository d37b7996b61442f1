use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TypeError, TypeResult};

/// An ordering hint attached to a node.
///
/// Priorities are either numbers or strings. A node without a priority sorts
/// before every node that has one; numbers sort before strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Priority {
    Number(f64),
    String(String),
}

impl Priority {
    /// Interpret a JSON value as a priority. `null` means "no priority".
    pub fn from_value(value: &Value) -> TypeResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(|f| Some(Self::Number(f)))
                .ok_or_else(|| TypeError::InvalidPriority(format!("{n} is not representable"))),
            Value::String(s) => Ok(Some(Self::String(s.clone()))),
            other => Err(TypeError::InvalidPriority(format!(
                "priority must be a string, number, or null, got {other}"
            ))),
        }
    }

    /// The JSON rendering of this priority.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
        }
    }

    /// Compare two optional priorities in child order.
    pub fn compare(a: Option<&Priority>, b: Option<&Priority>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(Self::Number(x)), Some(Self::Number(y))) => x.total_cmp(y),
            (Some(Self::Number(_)), Some(Self::String(_))) => Ordering::Less,
            (Some(Self::String(_)), Some(Self::Number(_))) => Ordering::Greater,
            (Some(Self::String(x)), Some(Self::String(y))) => x.cmp(y),
        }
    }
}

impl From<f64> for Priority {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Priority {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
