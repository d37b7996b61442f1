//! Rule engine adapter for mockfire.
//!
//! Every read and write against a mockfire database is evaluated here
//! before it takes effect. A [`Ruleset`] is parsed from the familiar
//! `{"rules": {...}}` document, and a [`RulesEvaluator`] runs each
//! operation through a pipeline of stages (permission, then validation)
//! against an immutable [`Snapshot`]. The result is an [`Evaluation`]
//! carrying both verdicts and the staged successor snapshot.
//!
//! # Quick Start
//!
//! ```rust
//! use mockfire_rules::{RuleEngine, RulesConfig, RulesEvaluator, Ruleset};
//! use mockfire_types::DbPath;
//! use serde_json::json;
//!
//! let engine = RulesEvaluator::with_default_stages(RulesConfig::default());
//! let rules: Ruleset = r#"{"rules": {"public": {".read": true}}}"#.parse().unwrap();
//! let snapshot = engine.initial_snapshot(rules, json!({"public": {"motd": "hi"}})).unwrap();
//!
//! let path = DbPath::parse("public/motd").unwrap();
//! let evaluation = engine.evaluate_read(&snapshot, &path).unwrap();
//! assert!(evaluation.is_allowed());
//! assert_eq!(evaluation.value, Some(json!("hi")));
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod ruleset;
pub mod snapshot;
pub mod stage;
pub mod stages;

pub use config::RulesConfig;
pub use error::{RulesError, RulesResult};
pub use evaluator::{Evaluation, EvaluationReport, RuleEngine, RulesEvaluator};
pub use ruleset::{Rule, RuleMatch, RuleNode, Ruleset};
pub use snapshot::Snapshot;
pub use stage::{
    EvaluationStage, Operation, OperationKind, RuleContext, StageDecision, StageResult, Verdict,
};
pub use stages::{PermissionStage, ValidationStage};

#[cfg(test)]
mod tests {
    use super::*;
    use mockfire_types::{DbPath, Priority, User, UserInfo};
    use serde_json::{json, Value};

    fn path(raw: &str) -> DbPath {
        DbPath::parse(raw).unwrap()
    }

    fn engine() -> RulesEvaluator {
        RulesEvaluator::with_default_stages(RulesConfig::at(1_700_000_000_000))
    }

    fn snapshot(rules: Value, data: Value) -> Snapshot {
        engine()
            .initial_snapshot(Ruleset::from_json(&rules).unwrap(), data)
            .unwrap()
    }

    fn user(uid: &str) -> User {
        User::from_info(UserInfo::with_uid(uid)).unwrap()
    }

    // -----------------------------------------------------------------------
    // 1. Open rules allow everything and stage a new version
    // -----------------------------------------------------------------------
    #[test]
    fn open_rules_allow_writes() {
        let engine = engine();
        let base = engine.initial_snapshot(Ruleset::open(), Value::Null).unwrap();
        let eval = engine
            .evaluate_write(&base, &path("a/b"), json!(1), None)
            .unwrap();
        assert!(eval.is_allowed());
        assert_eq!(eval.stages.len(), 2);
        assert_eq!(eval.next.version(), base.version() + 1);
        assert_eq!(eval.next.tree().get(&path("a/b")), Some(&json!(1)));
        assert!(base.tree().is_empty());
        assert_eq!(eval.value, Some(json!(1)));
        assert!(eval.denial_reason().is_none());
    }

    // -----------------------------------------------------------------------
    // 2. Reads return the stored value and do not advance the version
    // -----------------------------------------------------------------------
    #[test]
    fn reads_keep_snapshot() {
        let base = snapshot(json!({"rules": {".read": true}}), json!({"a": {"b": 2}}));
        let eval = engine().evaluate_read(&base, &path("a")).unwrap();
        assert!(eval.is_allowed());
        assert_eq!(eval.value, Some(json!({"b": 2})));
        assert_eq!(eval.next, base);
        assert_eq!(eval.operation, OperationKind::Read);
    }

    // -----------------------------------------------------------------------
    // 3. Denied writes still stage a successor and report both verdicts
    // -----------------------------------------------------------------------
    #[test]
    fn denied_write_reports_both_verdicts() {
        let rules = json!({"rules": {".write": false, ".validate": "newData.isNumber()"}});
        let base = snapshot(rules, Value::Null);
        let eval = engine()
            .evaluate_write(&base, &DbPath::root(), json!("text"), None)
            .unwrap();
        assert!(!eval.permitted);
        assert!(!eval.validated);
        assert!(!eval.is_allowed());
        assert_eq!(eval.stages.len(), 2);
        assert_eq!(eval.next.tree().value(), &json!("text"));
        let reason = eval.denial_reason().unwrap();
        assert!(reason.contains(".write"), "{reason}");
        assert!(reason.contains(".validate"), "{reason}");
    }

    // -----------------------------------------------------------------------
    // 4. Rebinding auth changes what rules see
    // -----------------------------------------------------------------------
    #[test]
    fn auth_rebinding_drives_rules() {
        let engine = engine();
        let rules = json!({"rules": {"users": {"$uid": {
            ".read": "auth != null && auth.uid == $uid",
            ".write": "auth != null && auth.uid == $uid"
        }}}});
        let base = snapshot(rules, json!({"users": {"ann": {"n": 1}}}));

        let anonymous = engine.evaluate_read(&base, &path("users/ann")).unwrap();
        assert!(!anonymous.permitted);

        let ann = engine.rebind_auth(&base, Some(&user("ann")));
        assert_eq!(ann.version(), base.version() + 1);
        assert_eq!(ann.tree(), base.tree());
        assert!(engine.evaluate_read(&ann, &path("users/ann")).unwrap().permitted);
        assert!(!engine.evaluate_read(&ann, &path("users/bob")).unwrap().permitted);

        let signed_out = engine.rebind_auth(&ann, None);
        assert!(signed_out.auth().is_none());
        assert!(!engine.evaluate_read(&signed_out, &path("users/ann")).unwrap().permitted);
    }

    // -----------------------------------------------------------------------
    // 5. Updates are all-or-nothing across targets
    // -----------------------------------------------------------------------
    #[test]
    fn update_checks_every_target() {
        let engine = engine();
        let rules = json!({"rules": {
            "open": {".write": true},
            "closed": {".write": false}
        }});
        let base = snapshot(rules, Value::Null);
        let patch = json!({"open/x": 1, "closed/y": 2}).as_object().cloned().unwrap();
        let eval = engine.evaluate_update(&base, &DbPath::root(), &patch).unwrap();
        assert!(!eval.permitted);
        assert!(eval.validated);

        let patch = json!({"open/x": 1, "open/y": 2}).as_object().cloned().unwrap();
        let eval = engine.evaluate_update(&base, &DbPath::root(), &patch).unwrap();
        assert!(eval.is_allowed());
        assert_eq!(eval.value, Some(json!({"open": {"x": 1, "y": 2}})));
    }

    // -----------------------------------------------------------------------
    // 6. Malformed writes are errors, not denials
    // -----------------------------------------------------------------------
    #[test]
    fn invalid_keys_are_errors() {
        let base = snapshot(json!({"rules": {".write": true}}), Value::Null);
        let err = engine()
            .evaluate_write(&base, &DbPath::root(), json!({"bad.key": 1}), None)
            .unwrap_err();
        assert!(matches!(err, RulesError::Store(_)));

        let patch = json!({"a": 1, "a/b": 2}).as_object().cloned().unwrap();
        assert!(engine()
            .evaluate_update(&base, &DbPath::root(), &patch)
            .is_err());
    }

    // -----------------------------------------------------------------------
    // 7. Permissive mode skips stages
    // -----------------------------------------------------------------------
    #[test]
    fn permissive_mode_allows_everything() {
        let engine = RulesEvaluator::with_default_stages(RulesConfig::permissive());
        let base = engine
            .initial_snapshot(
                Ruleset::from_json(&json!({"rules": {".write": false}})).unwrap(),
                Value::Null,
            )
            .unwrap();
        let eval = engine
            .evaluate_write(&base, &path("x"), json!(true), None)
            .unwrap();
        assert!(eval.is_allowed());
        assert!(eval.stages.is_empty());
    }

    // -----------------------------------------------------------------------
    // 8. `now` and priorities are visible to rules
    // -----------------------------------------------------------------------
    #[test]
    fn now_and_priority_in_rules() {
        let rules = json!({"rules": {
            ".write": true,
            "stamp": {".validate": "newData.val() <= now"},
            "ranked": {".validate": "newData.getPriority() != null"}
        }});
        let base = snapshot(rules, Value::Null);
        let engine = engine();

        let past = engine
            .evaluate_write(&base, &path("stamp"), json!(1_000), None)
            .unwrap();
        assert!(past.validated);
        let future = engine
            .evaluate_write(&base, &path("stamp"), json!(1_800_000_000_000u64), None)
            .unwrap();
        assert!(!future.validated);

        let unranked = engine
            .evaluate_write(&base, &path("ranked"), json!("x"), None)
            .unwrap();
        assert!(!unranked.validated);
        let ranked = engine
            .evaluate_write(&base, &path("ranked"), json!("x"), Some(Priority::from(1.0)))
            .unwrap();
        assert!(ranked.validated);
    }

    // -----------------------------------------------------------------------
    // 9. Custom stages join the pipeline
    // -----------------------------------------------------------------------
    struct DenyDeletes;

    impl EvaluationStage for DenyDeletes {
        fn name(&self) -> &str {
            "deny-deletes"
        }

        fn verdict(&self) -> Verdict {
            Verdict::Permission
        }

        fn evaluate(
            &self,
            operation: &Operation,
            context: &RuleContext<'_>,
        ) -> RulesResult<StageDecision> {
            match operation {
                Operation::Write { path, .. } if !context.after.exists(path) => {
                    Ok(StageDecision::Fail {
                        reason: "deletes are disabled".into(),
                    })
                }
                _ => Ok(StageDecision::Pass),
            }
        }
    }

    #[test]
    fn custom_stage_contributes_verdict() {
        let mut engine = RulesEvaluator::with_default_stages(RulesConfig::default());
        engine.add_stage(Box::new(DenyDeletes));
        assert_eq!(engine.stage_count(), 3);

        let base = engine
            .initial_snapshot(Ruleset::open(), json!({"a": 1}))
            .unwrap();
        let eval = engine
            .evaluate_write(&base, &path("a"), Value::Null, None)
            .unwrap();
        assert!(!eval.permitted);
        assert!(eval.validated);
        assert_eq!(eval.denial_reason().as_deref(), Some("deletes are disabled"));
    }

    // -----------------------------------------------------------------------
    // 10. Reports serialize for tooling
    // -----------------------------------------------------------------------
    #[test]
    fn report_serializes() {
        let base = snapshot(json!({"rules": {".read": true}}), json!({"a": 1}));
        let report = engine().evaluate_read(&base, &path("a")).unwrap().report();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["operation"], json!("read"));
        assert_eq!(value["path"], json!("/a"));
        assert_eq!(value["allowed"], json!(true));
        assert_eq!(value["value"], json!(1));
        assert_eq!(value["stages"][0]["stage_name"], json!("permission"));
        assert_eq!(value["stages"][0]["verdict"], json!("permission"));
    }

    // -----------------------------------------------------------------------
    // 11. Unruled paths are open unless the config denies them
    // -----------------------------------------------------------------------
    #[test]
    fn unruled_reads_follow_config() {
        let rules = json!({"rules": {".write": "false"}});
        let base = snapshot(rules.clone(), Value::Null);
        let eval = engine().evaluate_read(&base, &path("x")).unwrap();
        assert!(eval.is_allowed());
        assert_eq!(eval.value, None);
        assert!(!engine()
            .evaluate_write(&base, &path("x"), json!(1), None)
            .unwrap()
            .permitted);

        let strict = RulesEvaluator::with_default_stages(RulesConfig::deny_by_default());
        let base = strict
            .initial_snapshot(Ruleset::from_json(&rules).unwrap(), Value::Null)
            .unwrap();
        assert!(!strict.evaluate_read(&base, &path("x")).unwrap().permitted);
    }
}
