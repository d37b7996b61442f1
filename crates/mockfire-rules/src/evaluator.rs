use std::time::{Instant, SystemTime, UNIX_EPOCH};

use mockfire_store::DataTree;
use mockfire_types::{DbPath, Priority, User};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::RulesConfig;
use crate::error::RulesResult;
use crate::ruleset::Ruleset;
use crate::snapshot::Snapshot;
use crate::stage::{
    EvaluationStage, Operation, OperationKind, RuleContext, StageDecision, StageResult, Verdict,
};
use crate::stages::{PermissionStage, ValidationStage};

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// The outcome of evaluating one operation against a snapshot.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub operation: OperationKind,
    pub path: DbPath,
    /// Rule context of the identity the operation ran as.
    pub auth: Option<Value>,
    /// Whether access rules allowed the operation.
    pub permitted: bool,
    /// Whether validation rules accepted the resulting data.
    pub validated: bool,
    /// The staged successor snapshot. Produced even when the operation is
    /// denied; callers decide whether to adopt it.
    pub next: Snapshot,
    /// The value at `path`: the stored value for reads, the staged value for
    /// writes and updates.
    pub value: Option<Value>,
    /// Per-stage results in evaluation order.
    pub stages: Vec<StageResult>,
}

impl Evaluation {
    /// Returns `true` if the operation was both permitted and validated.
    pub fn is_allowed(&self) -> bool {
        self.permitted && self.validated
    }

    /// Reasons given by failing stages, joined; `None` when allowed.
    pub fn denial_reason(&self) -> Option<String> {
        let reasons: Vec<&str> = self
            .stages
            .iter()
            .filter(|s| !s.passed)
            .filter_map(|s| s.reason.as_deref())
            .collect();
        if reasons.is_empty() {
            None
        } else {
            Some(reasons.join("; "))
        }
    }

    /// A serializable summary, without the snapshot.
    pub fn report(&self) -> EvaluationReport {
        EvaluationReport {
            operation: self.operation,
            path: self.path.clone(),
            auth: self.auth.clone(),
            permitted: self.permitted,
            validated: self.validated,
            allowed: self.is_allowed(),
            value: self.value.clone(),
            stages: self.stages.clone(),
        }
    }
}

/// Serializable view of an [`Evaluation`].
#[derive(Clone, Debug, Serialize)]
pub struct EvaluationReport {
    pub operation: OperationKind,
    pub path: DbPath,
    pub auth: Option<Value>,
    pub permitted: bool,
    pub validated: bool,
    pub allowed: bool,
    pub value: Option<Value>,
    pub stages: Vec<StageResult>,
}

// ---------------------------------------------------------------------------
// RuleEngine
// ---------------------------------------------------------------------------

/// The rule engine adapter contract.
///
/// Implementations are pure: they never mutate the snapshot they are given
/// and always hand back a successor for the caller to adopt or discard.
pub trait RuleEngine: Send + Sync {
    /// Build the first snapshot from rules and seed data, signed out.
    fn initial_snapshot(&self, rules: Ruleset, seed: Value) -> RulesResult<Snapshot>;

    /// The same data and rules, evaluated as `user`.
    fn rebind_auth(&self, snapshot: &Snapshot, user: Option<&User>) -> Snapshot;

    fn evaluate_read(&self, snapshot: &Snapshot, path: &DbPath) -> RulesResult<Evaluation>;

    fn evaluate_write(
        &self,
        snapshot: &Snapshot,
        path: &DbPath,
        value: Value,
        priority: Option<Priority>,
    ) -> RulesResult<Evaluation>;

    fn evaluate_update(
        &self,
        snapshot: &Snapshot,
        path: &DbPath,
        patch: &Map<String, Value>,
    ) -> RulesResult<Evaluation>;
}

// ---------------------------------------------------------------------------
// RulesEvaluator
// ---------------------------------------------------------------------------

/// The built-in rule engine: a pipeline of stages run over every operation.
///
/// Unlike a fail-fast pipeline, every stage always runs so that both the
/// `permitted` and `validated` verdicts are reported.
pub struct RulesEvaluator {
    stages: Vec<Box<dyn EvaluationStage>>,
    config: RulesConfig,
}

impl RulesEvaluator {
    /// Create an evaluator with an empty pipeline.
    ///
    /// Use [`Self::add_stage`] to add stages, or
    /// [`Self::with_default_stages`] for the standard pipeline.
    pub fn new(config: RulesConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Create an evaluator with the default pipeline:
    /// Permission -> Validation
    pub fn with_default_stages(config: RulesConfig) -> Self {
        let permission = if config.deny_by_default {
            PermissionStage::deny_by_default()
        } else {
            PermissionStage::new()
        };
        let mut evaluator = Self::new(config);
        evaluator.add_stage(Box::new(permission));
        evaluator.add_stage(Box::new(ValidationStage));
        evaluator
    }

    /// Append a stage to the end of the pipeline.
    pub fn add_stage(&mut self, stage: Box<dyn EvaluationStage>) {
        self.stages.push(stage);
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    fn now_ms(&self) -> u64 {
        self.config.fixed_now_ms.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64
        })
    }

    /// Evaluate an operation through the full pipeline.
    pub fn evaluate(&self, snapshot: &Snapshot, operation: &Operation) -> RulesResult<Evaluation> {
        let after = match operation {
            Operation::Read { .. } => snapshot.tree().clone(),
            Operation::Write {
                path,
                value,
                priority,
            } => snapshot.tree().set(path, value.clone(), priority.clone())?,
            Operation::Update { path, patch } => snapshot.tree().update(path, patch)?,
        };
        let path = operation.path().clone();

        let mut context = RuleContext {
            before: snapshot,
            after: &after,
            now_ms: self.now_ms(),
            previous_stages: Vec::with_capacity(self.stages.len()),
        };

        if !self.config.permissive {
            for stage in &self.stages {
                let stage_start = Instant::now();
                let decision = stage.evaluate(operation, &context)?;
                let elapsed = stage_start.elapsed();

                let (passed, reason) = match decision {
                    StageDecision::Pass => (true, None),
                    StageDecision::Fail { reason } => (false, Some(reason)),
                };
                context.previous_stages.push(StageResult {
                    stage_name: stage.name().to_string(),
                    verdict: stage.verdict(),
                    passed,
                    reason,
                    elapsed,
                });
            }
        }

        let stages = context.previous_stages;
        let verdict = |kind: Verdict| {
            stages
                .iter()
                .filter(|s| s.verdict == kind)
                .all(|s| s.passed)
        };
        let permitted = verdict(Verdict::Permission);
        let validated = verdict(Verdict::Validation);

        let (next, value) = match operation {
            Operation::Read { .. } => (snapshot.clone(), snapshot.tree().get(&path).cloned()),
            _ => {
                let value = after.get(&path).cloned();
                (snapshot.with_tree(after), value)
            }
        };

        tracing::debug!(
            operation = %operation.kind(),
            path = %path,
            permitted,
            validated,
            version = next.version(),
            "evaluated operation"
        );

        Ok(Evaluation {
            operation: operation.kind(),
            path,
            auth: snapshot.auth().cloned(),
            permitted,
            validated,
            next,
            value,
            stages,
        })
    }
}

impl Default for RulesEvaluator {
    fn default() -> Self {
        Self::with_default_stages(RulesConfig::default())
    }
}

impl RuleEngine for RulesEvaluator {
    fn initial_snapshot(&self, rules: Ruleset, seed: Value) -> RulesResult<Snapshot> {
        Ok(Snapshot::new(DataTree::from_value(seed)?, rules, None))
    }

    fn rebind_auth(&self, snapshot: &Snapshot, user: Option<&User>) -> Snapshot {
        snapshot.with_auth(user.map(User::auth_context))
    }

    fn evaluate_read(&self, snapshot: &Snapshot, path: &DbPath) -> RulesResult<Evaluation> {
        self.evaluate(snapshot, &Operation::Read { path: path.clone() })
    }

    fn evaluate_write(
        &self,
        snapshot: &Snapshot,
        path: &DbPath,
        value: Value,
        priority: Option<Priority>,
    ) -> RulesResult<Evaluation> {
        self.evaluate(
            snapshot,
            &Operation::Write {
                path: path.clone(),
                value,
                priority,
            },
        )
    }

    fn evaluate_update(
        &self,
        snapshot: &Snapshot,
        path: &DbPath,
        patch: &Map<String, Value>,
    ) -> RulesResult<Evaluation> {
        self.evaluate(
            snapshot,
            &Operation::Update {
                path: path.clone(),
                patch: patch.clone(),
            },
        )
    }
}
