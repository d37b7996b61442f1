use crate::error::RulesResult;
use crate::stage::{EvaluationStage, Operation, RuleContext, StageDecision, Verdict};

/// Access check.
///
/// A read or write of a path is permitted when any `.read` / `.write` rule on
/// the way from the root down to that path evaluates to true. Grants cascade:
/// a rule deeper in the tree cannot revoke access granted above it. An update
/// is permitted only when every patched path is.
///
/// A path with no rule of the requested kind anywhere on its lineage is
/// open, unless the stage was built with [`PermissionStage::deny_by_default`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PermissionStage {
    deny_unruled: bool,
}

impl PermissionStage {
    /// Unruled paths are open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unruled paths are denied, as on the hosted service.
    pub fn deny_by_default() -> Self {
        Self { deny_unruled: true }
    }
}

impl EvaluationStage for PermissionStage {
    fn name(&self) -> &str {
        "permission"
    }

    fn verdict(&self) -> Verdict {
        Verdict::Permission
    }

    fn evaluate(
        &self,
        operation: &Operation,
        context: &RuleContext<'_>,
    ) -> RulesResult<StageDecision> {
        let (kind, is_read) = match operation {
            Operation::Read { .. } => (".read", true),
            _ => (".write", false),
        };
        let rules = context.before.rules();

        for target in super::targets(operation)? {
            let mut ruled = false;
            let granted = rules.lineage(&target).iter().any(|at| {
                let rule = if is_read { &at.node.read } else { &at.node.write };
                match rule {
                    Some(rule) => {
                        ruled = true;
                        rule.check(&context.scope(at))
                    }
                    None => false,
                }
            });
            if granted {
                continue;
            }
            if ruled {
                return Ok(StageDecision::Fail {
                    reason: format!("no {kind} rule grants access to {target}"),
                });
            }
            if self.deny_unruled {
                return Ok(StageDecision::Fail {
                    reason: format!("no {kind} rule covers {target}"),
                });
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
    use serde_json::{json, Value};

    fn decide(rules: Value, auth: Option<Value>, operation: Operation) -> StageDecision {
        decide_with(PermissionStage::new(), rules, auth, operation)
    }

    fn decide_with(
        stage: PermissionStage,
        rules: Value,
        auth: Option<Value>,
        operation: Operation,
    ) -> StageDecision {
        let before = Snapshot::new(
            DataTree::empty(),
            Ruleset::from_json(&rules).unwrap(),
            auth,
        );
        let after = DataTree::empty();
        let context = RuleContext {
            before: &before,
            after: &after,
            now_ms: 0,
            previous_stages: Vec::new(),
        };
        stage.evaluate(&operation, &context).unwrap()
    }

    fn read(raw: &str) -> Operation {
        Operation::Read {
            path: DbPath::parse(raw).unwrap(),
        }
    }

    #[test]
    fn parent_grant_cascades() {
        let rules = json!({"rules": {
            ".read": false,
            "public": {".read": true, "secret": {".read": false}}
        }});
        assert!(decide(rules.clone(), None, read("public/secret/x")).is_pass());
        assert!(decide(rules, None, read("other")).is_fail());
    }

    #[test]
    fn unruled_paths_are_open() {
        let rules = json!({"rules": {".write": "false"}});
        assert!(decide(rules.clone(), None, read("x")).is_pass());
        assert!(decide(json!({"rules": {}}), None, read("")).is_pass());

        let write = Operation::Write {
            path: DbPath::parse("x").unwrap(),
            value: json!(1),
            priority: None,
        };
        match decide(rules, None, write) {
            StageDecision::Fail { reason } => assert!(reason.contains("grants"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn deny_by_default_closes_unruled_paths() {
        let strict = PermissionStage::deny_by_default();
        match decide_with(strict, json!({"rules": {".write": "false"}}), None, read("x")) {
            StageDecision::Fail { reason } => assert_eq!(reason, "no .read rule covers /x"),
            other => panic!("expected failure, got {other:?}"),
        }
        let rules = json!({"rules": {"public": {".read": true}}});
        assert!(decide_with(strict, rules, None, read("public/a")).is_pass());
    }

    #[test]
    fn update_needs_every_target() {
        let rules = json!({"rules": {"a": {".write": true}, "b": {".write": false}}});
        let patch = json!({"a/x": 1, "b": 2}).as_object().cloned().unwrap();
        let op = Operation::Update {
            path: DbPath::root(),
            patch,
        };
        match decide(rules, None, op) {
            StageDecision::Fail { reason } => assert!(reason.contains("/b"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn write_rule_sees_auth_and_captures() {
        let rules = json!({"rules": {"users": {"$uid": {".write": "auth != null && auth.uid === $uid"}}}});
        let write = |raw: &str| Operation::Write {
            path: DbPath::parse(raw).unwrap(),
            value: json!(1),
            priority: None,
        };
        let ann = Some(json!({"uid": "ann"}));
        assert!(decide(rules.clone(), ann.clone(), write("users/ann")).is_pass());
        assert!(decide(rules.clone(), ann, write("users/bob")).is_fail());
        assert!(decide(rules, None, write("users/ann")).is_fail());
    }
}
