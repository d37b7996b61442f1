use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use mockfire_rules::{Evaluation, RuleEngine, RulesConfig, RulesEvaluator, Ruleset, StageResult};
use mockfire_types::{DbPath, Priority, User, UserInfo};
use serde_json::Value;

use crate::cli::*;

/// Run one command. Returns whether the operation was allowed.
pub fn run_command(cli: Cli) -> anyhow::Result<bool> {
    let ruleset = match &cli.rules {
        Some(path) => load_rules(path)?,
        None => Ruleset::open(),
    };
    let data = match &cli.data {
        Some(path) => read_json(path)?,
        None => Value::Null,
    };
    let user = cli
        .uid
        .as_deref()
        .map(|uid| User::from_info(UserInfo::with_uid(uid)))
        .transpose()?;

    let config = RulesConfig {
        fixed_now_ms: cli.now,
        deny_by_default: cli.deny_by_default,
        ..RulesConfig::default()
    };
    let evaluator = RulesEvaluator::with_default_stages(config);
    let snapshot = evaluator.initial_snapshot(ruleset, data)?;
    let snapshot = evaluator.rebind_auth(&snapshot, user.as_ref());

    let evaluation = match &cli.command {
        Command::Check => return cmd_check(&cli, snapshot.rules()),
        Command::Read(args) => evaluator.evaluate_read(&snapshot, &DbPath::parse(&args.path)?)?,
        Command::Write(args) => {
            let priority = match &args.priority {
                Some(raw) => Priority::from_value(&parse_json(raw, "priority")?)?,
                None => None,
            };
            evaluator.evaluate_write(
                &snapshot,
                &DbPath::parse(&args.path)?,
                parse_json(&args.value, "value")?,
                priority,
            )?
        }
        Command::Update(args) => {
            let Value::Object(patch) = parse_json(&args.patch, "patch")? else {
                bail!("patch must be a JSON object");
            };
            evaluator.evaluate_update(&snapshot, &DbPath::parse(&args.path)?, &patch)?
        }
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evaluation.report())?),
        OutputFormat::Text => print_evaluation(&evaluation, cli.verbose),
    }
    Ok(evaluation.is_allowed())
}

fn cmd_check(cli: &Cli, ruleset: &Ruleset) -> anyhow::Result<bool> {
    let Some(path) = &cli.rules else {
        bail!("check needs --rules");
    };
    match cli.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({"rules": path.display().to_string(), "valid": true})
        ),
        OutputFormat::Text => {
            let guarded = if ruleset.root().has_validation() {
                " (with .validate rules)"
            } else {
                ""
            };
            println!("{} {}{}", "✓".green().bold(), path.display().to_string().bold(), guarded);
        }
    }
    Ok(true)
}

fn print_evaluation(evaluation: &Evaluation, verbose: bool) {
    let who = match evaluation.auth.as_ref().and_then(|auth| auth.get("uid")) {
        Some(Value::String(uid)) => uid.cyan().to_string(),
        _ => "signed out".dimmed().to_string(),
    };
    println!(
        "{} {} as {}",
        evaluation.operation.to_string().bold(),
        evaluation.path.to_string().yellow(),
        who
    );
    println!("  permitted: {}", verdict(evaluation.permitted));
    println!("  validated: {}", verdict(evaluation.validated));

    for stage in &evaluation.stages {
        if !stage.passed || verbose {
            print_stage(stage);
        }
    }

    if evaluation.is_allowed() {
        println!("{} allowed", "✓".green().bold());
    } else {
        println!("{} denied", "✗".red().bold());
    }
}

fn print_stage(stage: &StageResult) {
    let mark = if stage.passed { "✓".green() } else { "✗".red() };
    match &stage.reason {
        Some(reason) => println!("    {} {}: {}", mark, stage.stage_name, reason),
        None => println!(
            "    {} {} ({}µs)",
            mark,
            stage.stage_name,
            stage.elapsed.as_micros()
        ),
    }
}

fn verdict(passed: bool) -> colored::ColoredString {
    if passed {
        "yes".green()
    } else {
        "no".red()
    }
}

fn load_rules(path: &Path) -> anyhow::Result<Ruleset> {
    let document = read_json(path)?;
    Ruleset::from_json(&document).with_context(|| format!("invalid rules in {}", path.display()))
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn parse_json(raw: &str, what: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{what} is not valid JSON: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn rules_file(dir: &tempfile::TempDir, rules: Value) -> PathBuf {
        let path = dir.path().join("rules.json");
        std::fs::write(&path, rules.to_string()).unwrap();
        path
    }

    fn run(args: &[&str]) -> anyhow::Result<bool> {
        run_command(Cli::try_parse_from(args).unwrap())
    }

    #[test]
    fn owner_write_allowed_stranger_denied() {
        let dir = tempfile::tempdir().unwrap();
        let rules = rules_file(
            &dir,
            serde_json::json!({"rules": {"users": {"$uid": {
                ".write": "auth != null && auth.uid === $uid",
                ".validate": "newData.hasChildren(['name'])"
            }}}}),
        );
        let rules = rules.to_str().unwrap();

        let base = ["mockfire", "--rules", rules];
        let write = ["write", "users/ann", r#"{"name":"Ann"}"#];
        let as_ann: Vec<&str> = base.iter().chain(&["--uid", "ann"]).chain(&write).copied().collect();
        assert!(run(&as_ann).unwrap());

        let as_bob: Vec<&str> = base.iter().chain(&["--uid", "bob"]).chain(&write).copied().collect();
        assert!(!run(&as_bob).unwrap());

        let invalid: Vec<&str> = base
            .iter()
            .chain(&["--uid", "ann", "write", "users/ann", r#"{"age":3}"#])
            .copied()
            .collect();
        assert!(!run(&invalid).unwrap());
    }

    #[test]
    fn reads_follow_data_and_rules() {
        let dir = tempfile::tempdir().unwrap();
        let rules = rules_file(&dir, serde_json::json!({"rules": {
            "public": {".read": true},
            "private": {".read": false}
        }}));
        let rules = rules.to_str().unwrap();
        assert!(run(&["mockfire", "--rules", rules, "read", "public/news"]).unwrap());
        assert!(!run(&["mockfire", "--rules", rules, "read", "private"]).unwrap());
        assert!(run(&["mockfire", "--rules", rules, "read", "other"]).unwrap());
        assert!(!run(&["mockfire", "--rules", rules, "--deny-by-default", "read", "other"]).unwrap());
    }

    #[test]
    fn update_and_open_rules() {
        assert!(run(&["mockfire", "update", "/", r#"{"a/b": 1, "c": 2}"#]).unwrap());
        assert!(run(&["mockfire", "update", "/", "[1]"]).is_err());
        assert!(run(&["mockfire", "update", "/", r#"{"a": 1, "a/b": 2}"#]).is_err());
    }

    #[test]
    fn check_reports_rule_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = rules_file(&dir, serde_json::json!({"rules": {".read": "auth != null"}}));
        assert!(run(&["mockfire", "--rules", good.to_str().unwrap(), "check"]).unwrap());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"rules": {".read": "auth =="}}"#).unwrap();
        assert!(run(&["mockfire", "--rules", bad.to_str().unwrap(), "check"]).is_err());

        assert!(run(&["mockfire", "check"]).is_err());
    }

    #[test]
    fn bad_inputs_are_errors() {
        assert!(run(&["mockfire", "write", "a", "{not json"]).is_err());
        assert!(run(&["mockfire", "write", "a.b", "1"]).is_err());
        assert!(run(&["mockfire", "write", "a", "1", "--priority", "true"]).is_err());
        assert!(run(&["mockfire", "--data", "/nonexistent/data.json", "read", "a"]).is_err());
    }
}
