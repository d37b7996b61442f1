use std::collections::BTreeMap;
use std::str::FromStr;

use mockfire_types::{validate_key, DbPath};
use serde_json::Value;

use crate::error::{RulesError, RulesResult};
use crate::expr::{self, Expr, Scope};

/// A single `.read`, `.write` or `.validate` rule.
#[derive(Clone, Debug, PartialEq)]
pub enum Rule {
    /// A literal `true` / `false`.
    Literal(bool),
    /// An expression, kept with its source text for diagnostics.
    Expression { source: String, expr: Expr },
}

impl Rule {
    fn from_json(value: &Value, location: &str) -> RulesResult<Self> {
        match value {
            Value::Bool(b) => Ok(Self::Literal(*b)),
            Value::String(source) => match source.trim() {
                "true" => Ok(Self::Literal(true)),
                "false" => Ok(Self::Literal(false)),
                _ => Ok(Self::Expression {
                    source: source.clone(),
                    expr: expr::parse(source)?,
                }),
            },
            other => Err(RulesError::parse(
                location,
                format!("rule must be a boolean or an expression string, got {other}"),
            )),
        }
    }

    /// Evaluate the rule. Runtime errors count as `false`.
    pub fn check(&self, scope: &Scope<'_>) -> bool {
        match self {
            Self::Literal(b) => *b,
            Self::Expression { source, expr } => match expr::evaluate(expr, scope) {
                Ok(verdict) => verdict,
                Err(e) => {
                    tracing::debug!(rule = %source, path = %scope.path, error = %e, "rule errored; treating as false");
                    false
                }
            },
        }
    }

    /// Source text of the rule.
    pub fn source(&self) -> String {
        match self {
            Self::Literal(b) => b.to_string(),
            Self::Expression { source, .. } => source.clone(),
        }
    }
}

/// One level of the rules tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleNode {
    pub read: Option<Rule>,
    pub write: Option<Rule>,
    pub validate: Option<Rule>,
    children: BTreeMap<String, RuleNode>,
    wildcard: Option<(String, Box<RuleNode>)>,
}

impl RuleNode {
    fn from_json(value: &Value, path: &DbPath) -> RulesResult<Self> {
        let Value::Object(entries) = value else {
            return Err(RulesError::parse(path, "rule node must be an object"));
        };

        let mut node = RuleNode::default();
        for (key, child) in entries {
            let location = if path.is_root() {
                format!("/{key}")
            } else {
                format!("{path}/{key}")
            };
            match key.as_str() {
                ".read" => node.read = Some(Rule::from_json(child, &location)?),
                ".write" => node.write = Some(Rule::from_json(child, &location)?),
                ".validate" => node.validate = Some(Rule::from_json(child, &location)?),
                // Indexes only matter to server-side queries.
                ".indexOn" => {}
                other if other.starts_with('.') => {
                    return Err(RulesError::parse(location, format!("unknown rule '{other}'")));
                }
                capture if capture.starts_with('$') => {
                    if let Some((existing, _)) = &node.wildcard {
                        return Err(RulesError::parse(
                            location,
                            format!("a level may have one wildcard; already has {existing}"),
                        ));
                    }
                    let name = &capture[1..];
                    validate_key(name).map_err(|e| RulesError::parse(&location, e.to_string()))?;
                    let child_path = path
                        .push_key(name)
                        .map_err(|e| RulesError::parse(&location, e.to_string()))?;
                    node.wildcard = Some((
                        capture.to_string(),
                        Box::new(RuleNode::from_json(child, &child_path)?),
                    ));
                }
                name => {
                    let child_path = path
                        .push_key(name)
                        .map_err(|e| RulesError::parse(&location, e.to_string()))?;
                    node.children
                        .insert(name.to_string(), RuleNode::from_json(child, &child_path)?);
                }
            }
        }
        Ok(node)
    }

    /// The rule node governing child `key`, plus the wildcard it binds.
    ///
    /// An exact child beats the wildcard.
    pub fn child(&self, key: &str) -> Option<(&RuleNode, Option<&str>)> {
        if let Some(exact) = self.children.get(key) {
            return Some((exact, None));
        }
        self.wildcard
            .as_ref()
            .map(|(capture, node)| (node.as_ref(), Some(capture.as_str())))
    }

    /// Returns `true` if this node or any descendant carries a `.validate`.
    pub fn has_validation(&self) -> bool {
        self.validate.is_some()
            || self.children.values().any(RuleNode::has_validation)
            || self
                .wildcard
                .as_ref()
                .is_some_and(|(_, node)| node.has_validation())
    }
}

/// A rule node reached while walking a path, with the wildcard bindings in
/// effect at that point.
#[derive(Clone, Debug)]
pub struct RuleMatch<'a> {
    pub path: DbPath,
    pub node: &'a RuleNode,
    pub captures: BTreeMap<String, String>,
}

impl<'a> RuleMatch<'a> {
    /// Descend into child `key`, if a rule node governs it.
    pub fn descend(&self, key: &str) -> Option<RuleMatch<'a>> {
        let (node, capture) = self.node.child(key)?;
        let path = self.path.push_key(key).ok()?;
        let mut captures = self.captures.clone();
        if let Some(capture) = capture {
            captures.insert(capture.to_string(), key.to_string());
        }
        Some(RuleMatch {
            path,
            node,
            captures,
        })
    }
}

/// A parsed rules document: `{"rules": {...}}`.
#[derive(Clone, Debug, PartialEq)]
pub struct Ruleset {
    root: RuleNode,
}

impl Ruleset {
    /// Parse a rules document.
    pub fn from_json(document: &Value) -> RulesResult<Self> {
        let Value::Object(top) = document else {
            return Err(RulesError::parse("/", "rules document must be an object"));
        };
        if let Some(extra) = top.keys().find(|k| k.as_str() != "rules") {
            return Err(RulesError::parse(
                "/",
                format!("unexpected top-level key '{extra}'"),
            ));
        }
        let rules = top
            .get("rules")
            .ok_or_else(|| RulesError::parse("/", "missing 'rules' key"))?;
        Ok(Self {
            root: RuleNode::from_json(rules, &DbPath::root())?,
        })
    }

    /// The fully open ruleset: anyone may read and write anything.
    ///
    /// Equivalent to `{"rules": {".read": true, ".write": true}}`.
    pub fn open() -> Self {
        Self {
            root: RuleNode {
                read: Some(Rule::Literal(true)),
                write: Some(Rule::Literal(true)),
                ..RuleNode::default()
            },
        }
    }

    /// The root rule node.
    pub fn root(&self) -> &RuleNode {
        &self.root
    }

    /// The root as a match with no captures.
    pub fn root_match(&self) -> RuleMatch<'_> {
        RuleMatch {
            path: DbPath::root(),
            node: &self.root,
            captures: BTreeMap::new(),
        }
    }

    /// Rule nodes from the root down to `path`, stopping where the rules
    /// tree runs out.
    pub fn lineage(&self, path: &DbPath) -> Vec<RuleMatch<'_>> {
        let mut current = self.root_match();
        let mut matches = Vec::with_capacity(path.depth() + 1);
        for segment in path.segments() {
            let next = current.descend(segment);
            matches.push(current);
            match next {
                Some(next) => current = next,
                None => return matches,
            }
        }
        matches.push(current);
        matches
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::open()
    }
}

impl FromStr for Ruleset {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let document: Value =
            serde_json::from_str(s).map_err(|e| RulesError::parse("/", e.to_string()))?;
        Self::from_json(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> DbPath {
        DbPath::parse(raw).unwrap()
    }

    #[test]
    fn parses_literals_and_expressions() {
        let rules: Ruleset = r#"{"rules": {".read": "true", "users": {"$uid": {".write": "auth.uid === $uid"}}}}"#
            .parse()
            .unwrap();
        assert_eq!(rules.root().read, Some(Rule::Literal(true)));
        assert!(rules.root().write.is_none());

        let lineage = rules.lineage(&path("users/ann"));
        assert_eq!(lineage.len(), 3);
        assert_eq!(lineage[2].captures.get("$uid").map(String::as_str), Some("ann"));
        assert!(matches!(lineage[2].node.write, Some(Rule::Expression { .. })));
    }

    #[test]
    fn exact_child_beats_wildcard() {
        let rules = Ruleset::from_json(&json!({"rules": {
            "items": {
                "special": {".read": false},
                "$id": {".read": true}
            }
        }}))
        .unwrap();

        let special = rules.lineage(&path("items/special"));
        assert_eq!(special[2].node.read, Some(Rule::Literal(false)));
        assert!(special[2].captures.is_empty());

        let other = rules.lineage(&path("items/other"));
        assert_eq!(other[2].node.read, Some(Rule::Literal(true)));
    }

    #[test]
    fn lineage_stops_where_rules_end() {
        let rules = Ruleset::from_json(&json!({"rules": {"a": {".read": true}}})).unwrap();
        let lineage = rules.lineage(&path("a/b/c"));
        assert_eq!(lineage.len(), 2);
        assert_eq!(lineage[1].path, path("a"));
        assert_eq!(rules.lineage(&path("z")).len(), 1);
    }

    #[test]
    fn index_on_is_ignored() {
        let rules =
            Ruleset::from_json(&json!({"rules": {"posts": {".indexOn": ["date"]}}})).unwrap();
        assert!(rules.root().child("posts").is_some());
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(Ruleset::from_json(&json!({"rules": {".frobnicate": true}})).is_err());
        assert!(Ruleset::from_json(&json!({"rules": {"$a": {}, "$b": {}}})).is_err());
        assert!(Ruleset::from_json(&json!({"rules": {".read": 1}})).is_err());
        assert!(Ruleset::from_json(&json!({"rules": {".read": "auth =="}})).is_err());
        assert!(Ruleset::from_json(&json!({"nope": {}})).is_err());
        assert!(Ruleset::from_json(&json!([])).is_err());
        assert!("not json".parse::<Ruleset>().is_err());
    }

    #[test]
    fn open_ruleset_matches_document() {
        let parsed =
            Ruleset::from_json(&json!({"rules": {".read": true, ".write": true}})).unwrap();
        assert_eq!(parsed, Ruleset::open());
        assert_eq!(Ruleset::default(), Ruleset::open());
    }

    #[test]
    fn has_validation_looks_deep() {
        let rules =
            Ruleset::from_json(&json!({"rules": {"a": {"$b": {".validate": "true"}}}})).unwrap();
        assert!(rules.root().has_validation());
        assert!(!Ruleset::open().root().has_validation());
    }
}
