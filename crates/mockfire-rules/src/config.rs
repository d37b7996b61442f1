use serde::{Deserialize, Serialize};

/// Configuration for the rules evaluator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// When `true`, every stage is skipped and every operation is allowed.
    /// The staged snapshot is still produced.
    pub permissive: bool,
    /// Pin the value of `now` in rule expressions. Wall-clock time otherwise.
    pub fixed_now_ms: Option<u64>,
    /// Deny reads and writes of paths that no `.read` / `.write` rule
    /// covers. Such paths are open otherwise.
    pub deny_by_default: bool,
}

impl RulesConfig {
    /// A configuration that allows everything.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Default::default()
        }
    }

    /// A configuration that denies paths no rule covers.
    pub fn deny_by_default() -> Self {
        Self {
            deny_by_default: true,
            ..Default::default()
        }
    }

    /// A configuration whose `now` is frozen at `now_ms`.
    pub fn at(now_ms: u64) -> Self {
        Self {
            fixed_now_ms: Some(now_ms),
            ..Default::default()
        }
    }
}
