use std::fmt;
use std::time::Duration;

use mockfire_store::DataTree;
use mockfire_types::{DbPath, Priority};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RulesResult;
use crate::expr::Scope;
use crate::ruleset::RuleMatch;
use crate::snapshot::Snapshot;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A path-scoped operation submitted for evaluation.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Read {
        path: DbPath,
    },
    Write {
        path: DbPath,
        value: Value,
        priority: Option<Priority>,
    },
    Update {
        path: DbPath,
        patch: Map<String, Value>,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Read { .. } => OperationKind::Read,
            Self::Write { .. } => OperationKind::Write,
            Self::Update { .. } => OperationKind::Update,
        }
    }

    pub fn path(&self) -> &DbPath {
        match self {
            Self::Read { path } | Self::Write { path, .. } | Self::Update { path, .. } => path,
        }
    }
}

/// Which kind of operation was evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Read,
    Write,
    Update,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Update => "update",
        })
    }
}

// ---------------------------------------------------------------------------
// StageDecision / StageResult
// ---------------------------------------------------------------------------

/// The outcome of a single stage evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    Pass,
    Fail { reason: String },
}

impl StageDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }
}

/// Which verdict of an evaluation a stage contributes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Feeds `permitted`.
    Permission,
    /// Feeds `validated`.
    Validation,
}

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_name: String,
    pub verdict: Verdict,
    pub passed: bool,
    /// Populated on failure.
    pub reason: Option<String>,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// RuleContext
// ---------------------------------------------------------------------------

/// Everything a stage can see while evaluating one operation.
pub struct RuleContext<'a> {
    /// The snapshot the operation runs against.
    pub before: &'a Snapshot,
    /// The tree as it would be after the operation.
    pub after: &'a DataTree,
    /// Evaluation time in milliseconds since the UNIX epoch.
    pub now_ms: u64,
    /// Results from stages that already ran.
    pub previous_stages: Vec<StageResult>,
}

impl<'a> RuleContext<'a> {
    /// Expression scope positioned at a matched rule node.
    pub fn scope<'s>(&'s self, at: &'s RuleMatch<'_>) -> Scope<'s> {
        Scope {
            auth: self.before.auth(),
            before: self.before.tree(),
            after: self.after,
            path: &at.path,
            captures: &at.captures,
            now_ms: self.now_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// EvaluationStage trait
// ---------------------------------------------------------------------------

/// A single pass of the evaluator.
///
/// Every stage runs for every operation; an evaluation is allowed only when
/// all of them pass. The trait is object-safe so stages can be stored in a
/// `Vec<Box<dyn EvaluationStage>>`.
pub trait EvaluationStage: Send + Sync {
    /// Human-readable name of this stage (e.g. "permission").
    fn name(&self) -> &str;

    /// The verdict this stage's result feeds.
    fn verdict(&self) -> Verdict;

    /// Evaluate the operation and return a decision.
    fn evaluate(
        &self,
        operation: &Operation,
        context: &RuleContext<'_>,
    ) -> RulesResult<StageDecision>;
}
