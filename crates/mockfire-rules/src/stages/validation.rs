use serde_json::Value;

use crate::error::RulesResult;
use crate::ruleset::RuleMatch;
use crate::stage::{EvaluationStage, Operation, RuleContext, StageDecision, Verdict};

/// Data-shape check for writes.
///
/// Every `.validate` rule governing a written path must hold: those on its
/// ancestors, on the written node itself and on every node of the new
/// subtree that has a rule. Nodes left empty by the write are skipped, so
/// deletes always validate. Reads always pass.
pub struct ValidationStage;

impl ValidationStage {
    fn check(at: &RuleMatch<'_>, context: &RuleContext<'_>) -> Option<String> {
        if !context.after.exists(&at.path) {
            return None;
        }
        let rule = at.node.validate.as_ref()?;
        if rule.check(&context.scope(at)) {
            None
        } else {
            Some(format!(".validate failed at {}: {}", at.path, rule.source()))
        }
    }

    /// Validate the new subtree below `at`, depth first in key order.
    fn check_descendants(at: &RuleMatch<'_>, context: &RuleContext<'_>) -> Option<String> {
        if !at.node.has_validation() {
            return None;
        }
        let Some(Value::Object(children)) = context.after.get(&at.path) else {
            return None;
        };
        for key in children.keys() {
            let Some(child) = at.descend(key) else {
                continue;
            };
            if let Some(reason) = Self::check(&child, context) {
                return Some(reason);
            }
            if let Some(reason) = Self::check_descendants(&child, context) {
                return Some(reason);
            }
        }
        None
    }
}

impl EvaluationStage for ValidationStage {
    fn name(&self) -> &str {
        "validation"
    }

    fn verdict(&self) -> Verdict {
        Verdict::Validation
    }

    fn evaluate(
        &self,
        operation: &Operation,
        context: &RuleContext<'_>,
    ) -> RulesResult<StageDecision> {
        if matches!(operation, Operation::Read { .. }) {
            return Ok(StageDecision::Pass);
        }
        let rules = context.before.rules();

        for target in super::targets(operation)? {
            let lineage = rules.lineage(&target);
            for at in &lineage {
                if let Some(reason) = Self::check(at, context) {
                    return Ok(StageDecision::Fail { reason });
                }
            }
            // The rules tree may end above the target.
            if let Some(node) = lineage.last().filter(|at| at.path == target) {
                if let Some(reason) = Self::check_descendants(node, context) {
                    return Ok(StageDecision::Fail { reason });
                }
            }
        }
        Ok(StageDecision::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::Ruleset;
    use crate::snapshot::Snapshot;
    use mockfire_store::DataTree;
    use mockfire_types::DbPath;
    use serde_json::json;

    fn decide(rules: Value, data: Value, operation: Operation) -> StageDecision {
        let before = Snapshot::new(
            DataTree::from_value(data).unwrap(),
            Ruleset::from_json(&rules).unwrap(),
            None,
        );
        let after = match &operation {
            Operation::Read { .. } => before.tree().clone(),
            Operation::Write {
                path,
                value,
                priority,
            } => before
                .tree()
                .set(path, value.clone(), priority.clone())
                .unwrap(),
            Operation::Update { path, patch } => before.tree().update(path, patch).unwrap(),
        };
        let context = RuleContext {
            before: &before,
            after: &after,
            now_ms: 0,
            previous_stages: Vec::new(),
        };
        ValidationStage.evaluate(&operation, &context).unwrap()
    }

    fn write(raw: &str, value: Value) -> Operation {
        Operation::Write {
            path: DbPath::parse(raw).unwrap(),
            value,
            priority: None,
        }
    }

    fn age_rules() -> Value {
        json!({"rules": {"users": {"$uid": {
            ".validate": "newData.hasChildren(['name'])",
            "age": {".validate": "newData.isNumber() && newData.val() >= 0"}
        }}}})
    }

    #[test]
    fn reads_always_validate() {
        let rules = json!({"rules": {".validate": false}});
        let op = Operation::Read {
            path: DbPath::root(),
        };
        assert!(decide(rules, json!({"a": 1}), op).is_pass());
    }

    #[test]
    fn node_and_descendants_are_checked() {
        let ok = write("users/ann", json!({"name": "Ann", "age": 3}));
        assert!(decide(age_rules(), json!(null), ok).is_pass());

        let missing_name = write("users/ann", json!({"age": 3}));
        assert!(decide(age_rules(), json!(null), missing_name).is_fail());

        let bad_age = write("users/ann", json!({"name": "Ann", "age": "old"}));
        match decide(age_rules(), json!(null), bad_age) {
            StageDecision::Fail { reason } => assert!(reason.contains("/users/ann/age"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn ancestors_are_checked() {
        let data = json!({"users": {"ann": {"name": "Ann", "age": 3}}});
        // Removing the name leaves the parent without one.
        let op = write("users/ann/name", Value::Null);
        assert!(decide(age_rules(), data.clone(), op).is_fail());

        let op = write("users/ann/age", json!(4));
        assert!(decide(age_rules(), data, op).is_pass());
    }

    #[test]
    fn deletes_skip_validation() {
        let data = json!({"users": {"ann": {"name": "Ann"}}});
        assert!(decide(age_rules(), data, write("users/ann", Value::Null)).is_pass());
    }

    #[test]
    fn update_targets_validate_individually() {
        let data = json!({"users": {"ann": {"name": "Ann", "age": 3}}});
        let patch = json!({"ann/age": -1}).as_object().cloned().unwrap();
        let op = Operation::Update {
            path: DbPath::parse("users").unwrap(),
            patch,
        };
        assert!(decide(age_rules(), data, op).is_fail());
    }
}
