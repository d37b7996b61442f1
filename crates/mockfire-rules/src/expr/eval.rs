use std::collections::BTreeMap;

use mockfire_store::DataTree;
use mockfire_types::DbPath;
use serde_json::{Map, Value};

use crate::error::{RulesError, RulesResult};
use crate::expr::parser::{BinaryOp, Expr, UnaryOp};

const SNAPSHOT_METHODS: &[&str] = &[
    "val",
    "exists",
    "child",
    "parent",
    "hasChild",
    "hasChildren",
    "isString",
    "isNumber",
    "isBoolean",
    "getPriority",
];

const STRING_METHODS: &[&str] = &[
    "contains",
    "beginsWith",
    "endsWith",
    "toLowerCase",
    "toUpperCase",
    "replace",
];

/// Everything a rule expression can see.
pub struct Scope<'a> {
    /// The signed-in identity's rule context, or `None` when signed out.
    pub auth: Option<&'a Value>,
    /// The tree before the operation.
    pub before: &'a DataTree,
    /// The tree after the operation (same as `before` for reads).
    pub after: &'a DataTree,
    /// Location of the rule being evaluated.
    pub path: &'a DbPath,
    /// `$wildcard` bindings along `path`.
    pub captures: &'a BTreeMap<String, String>,
    /// Milliseconds since the UNIX epoch.
    pub now_ms: u64,
}

/// Runtime value of a rule sub-expression.
#[derive(Clone, Debug)]
enum RuleValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(Map<String, Value>),
    List(Vec<RuleValue>),
    Snapshot { tree: DataTree, path: DbPath },
    Method { receiver: Box<RuleValue>, name: String },
}

impl RuleValue {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(map.clone()),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
            Self::List(_) => "array",
            Self::Snapshot { .. } => "snapshot",
            Self::Method { .. } => "method",
        }
    }

    fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::Str(_)
        )
    }

    /// String rendering used by `+` concatenation.
    fn concat_text(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Null => Some("null".into()),
            _ => None,
        }
    }
}

fn fail<T>(message: impl Into<String>) -> RulesResult<T> {
    Err(RulesError::Eval(message.into()))
}

/// Evaluate a rule expression to a verdict.
///
/// The expression must produce a boolean; anything else is an error.
pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> RulesResult<bool> {
    match eval(expr, scope)? {
        RuleValue::Bool(b) => Ok(b),
        other => fail(format!(
            "rule must evaluate to a boolean, got {}",
            other.type_name()
        )),
    }
}

fn eval(expr: &Expr, scope: &Scope<'_>) -> RulesResult<RuleValue> {
    match expr {
        Expr::Null => Ok(RuleValue::Null),
        Expr::Bool(b) => Ok(RuleValue::Bool(*b)),
        Expr::Number(n) => Ok(RuleValue::Number(*n)),
        Expr::Str(s) => Ok(RuleValue::Str(s.clone())),
        Expr::Array(items) => Ok(RuleValue::List(
            items
                .iter()
                .map(|item| eval(item, scope))
                .collect::<RulesResult<_>>()?,
        )),
        Expr::Variable(name) => variable(name, scope),
        Expr::Member { object, property } => member(eval(object, scope)?, property),
        Expr::Index { object, index } => {
            let object = eval(object, scope)?;
            let index = eval(index, scope)?;
            match (object, index) {
                (RuleValue::Object(map), RuleValue::Str(key)) => Ok(map
                    .get(&key)
                    .map(RuleValue::from_json)
                    .unwrap_or(RuleValue::Null)),
                (RuleValue::List(items), RuleValue::Number(n)) if n >= 0.0 && n.fract() == 0.0 => {
                    Ok(items.get(n as usize).cloned().unwrap_or(RuleValue::Null))
                }
                (RuleValue::List(_), RuleValue::Number(n)) => {
                    fail(format!("list index {n} is not a non-negative integer"))
                }
                (object, index) => fail(format!(
                    "cannot index {} with {}",
                    object.type_name(),
                    index.type_name()
                )),
            }
        }
        Expr::Call { callee, args } => {
            let RuleValue::Method { receiver, name } = eval(callee, scope)? else {
                return fail("expression is not callable");
            };
            let args = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<RulesResult<Vec<_>>>()?;
            call(*receiver, &name, args)
        }
        Expr::Unary { op, operand } => match (op, eval(operand, scope)?) {
            (UnaryOp::Not, RuleValue::Bool(b)) => Ok(RuleValue::Bool(!b)),
            (UnaryOp::Neg, RuleValue::Number(n)) => Ok(RuleValue::Number(-n)),
            (op, value) => fail(format!("cannot apply {op:?} to {}", value.type_name())),
        },
        Expr::Binary { op, left, right } => binary(*op, left, right, scope),
        Expr::Conditional {
            test,
            then,
            otherwise,
        } => match eval(test, scope)? {
            RuleValue::Bool(true) => eval(then, scope),
            RuleValue::Bool(false) => eval(otherwise, scope),
            other => fail(format!(
                "conditional test must be a boolean, got {}",
                other.type_name()
            )),
        },
    }
}

fn variable(name: &str, scope: &Scope<'_>) -> RulesResult<RuleValue> {
    match name {
        "auth" => Ok(scope
            .auth
            .map(RuleValue::from_json)
            .unwrap_or(RuleValue::Null)),
        "root" => Ok(RuleValue::Snapshot {
            tree: scope.before.clone(),
            path: DbPath::root(),
        }),
        "data" => Ok(RuleValue::Snapshot {
            tree: scope.before.clone(),
            path: scope.path.clone(),
        }),
        "newData" => Ok(RuleValue::Snapshot {
            tree: scope.after.clone(),
            path: scope.path.clone(),
        }),
        "now" => Ok(RuleValue::Number(scope.now_ms as f64)),
        capture if capture.starts_with('$') => match scope.captures.get(capture) {
            Some(value) => Ok(RuleValue::Str(value.clone())),
            None => fail(format!("unbound wildcard variable {capture}")),
        },
        unknown => fail(format!("unknown variable '{unknown}'")),
    }
}

fn member(object: RuleValue, property: &str) -> RulesResult<RuleValue> {
    match object {
        RuleValue::Snapshot { .. } if SNAPSHOT_METHODS.contains(&property) => {
            Ok(RuleValue::Method {
                receiver: Box::new(object),
                name: property.to_string(),
            })
        }
        RuleValue::Str(s) if property == "length" => Ok(RuleValue::Number(s.chars().count() as f64)),
        RuleValue::Str(_) if STRING_METHODS.contains(&property) => Ok(RuleValue::Method {
            receiver: Box::new(object),
            name: property.to_string(),
        }),
        RuleValue::Object(map) => Ok(map
            .get(property)
            .map(RuleValue::from_json)
            .unwrap_or(RuleValue::Null)),
        RuleValue::Null => fail(format!("cannot read property '{property}' of null")),
        other => fail(format!(
            "{} has no property '{property}'",
            other.type_name()
        )),
    }
}

fn arity(name: &str, args: &[RuleValue], expected: usize) -> RulesResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        fail(format!(
            "{name}() takes {expected} argument(s), got {}",
            args.len()
        ))
    }
}

fn string_arg(name: &str, arg: &RuleValue) -> RulesResult<String> {
    match arg {
        RuleValue::Str(s) => Ok(s.clone()),
        other => fail(format!(
            "{name}() expects a string argument, got {}",
            other.type_name()
        )),
    }
}

fn call(receiver: RuleValue, name: &str, args: Vec<RuleValue>) -> RulesResult<RuleValue> {
    match receiver {
        RuleValue::Snapshot { tree, path } => snapshot_method(&tree, &path, name, &args),
        RuleValue::Str(s) => string_method(&s, name, &args),
        other => fail(format!("{} has no method {name}()", other.type_name())),
    }
}

fn snapshot_method(
    tree: &DataTree,
    path: &DbPath,
    name: &str,
    args: &[RuleValue],
) -> RulesResult<RuleValue> {
    let relative = |arg: &RuleValue| -> RulesResult<DbPath> {
        let raw = string_arg(name, arg)?;
        path.child(&raw)
            .map_err(|e| RulesError::Eval(format!("{name}(): {e}")))
    };

    match name {
        "val" => {
            arity(name, args, 0)?;
            Ok(tree
                .get(path)
                .map(RuleValue::from_json)
                .unwrap_or(RuleValue::Null))
        }
        "exists" => {
            arity(name, args, 0)?;
            Ok(RuleValue::Bool(tree.exists(path)))
        }
        "child" => {
            arity(name, args, 1)?;
            Ok(RuleValue::Snapshot {
                tree: tree.clone(),
                path: relative(&args[0])?,
            })
        }
        "parent" => {
            arity(name, args, 0)?;
            match path.parent() {
                Some(parent) => Ok(RuleValue::Snapshot {
                    tree: tree.clone(),
                    path: parent,
                }),
                None => fail("parent() called on the root"),
            }
        }
        "hasChild" => {
            arity(name, args, 1)?;
            Ok(RuleValue::Bool(tree.exists(&relative(&args[0])?)))
        }
        "hasChildren" => match args {
            [] => Ok(RuleValue::Bool(tree.child_count(path) > 0)),
            [RuleValue::List(keys)] => {
                for key in keys {
                    if !tree.exists(&relative(key)?) {
                        return Ok(RuleValue::Bool(false));
                    }
                }
                Ok(RuleValue::Bool(true))
            }
            _ => fail("hasChildren() takes no arguments or one array of keys"),
        },
        "isString" | "isNumber" | "isBoolean" => {
            arity(name, args, 0)?;
            let value = tree.get(path);
            Ok(RuleValue::Bool(match name {
                "isString" => value.is_some_and(Value::is_string),
                "isNumber" => value.is_some_and(Value::is_number),
                _ => value.is_some_and(Value::is_boolean),
            }))
        }
        "getPriority" => {
            arity(name, args, 0)?;
            Ok(tree
                .priority(path)
                .map(|p| RuleValue::from_json(&p.to_value()))
                .unwrap_or(RuleValue::Null))
        }
        other => fail(format!("snapshot has no method {other}()")),
    }
}

fn string_method(s: &str, name: &str, args: &[RuleValue]) -> RulesResult<RuleValue> {
    match name {
        "contains" | "beginsWith" | "endsWith" => {
            arity(name, args, 1)?;
            let needle = string_arg(name, &args[0])?;
            Ok(RuleValue::Bool(match name {
                "contains" => s.contains(&needle),
                "beginsWith" => s.starts_with(&needle),
                _ => s.ends_with(&needle),
            }))
        }
        "toLowerCase" => {
            arity(name, args, 0)?;
            Ok(RuleValue::Str(s.to_lowercase()))
        }
        "toUpperCase" => {
            arity(name, args, 0)?;
            Ok(RuleValue::Str(s.to_uppercase()))
        }
        "replace" => {
            arity(name, args, 2)?;
            let from = string_arg(name, &args[0])?;
            let to = string_arg(name, &args[1])?;
            Ok(RuleValue::Str(s.replace(&from, &to)))
        }
        other => fail(format!("string has no method {other}()")),
    }
}

fn binary(op: BinaryOp, left: &Expr, right: &Expr, scope: &Scope<'_>) -> RulesResult<RuleValue> {
    // Logical operators short-circuit.
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        let RuleValue::Bool(l) = eval(left, scope)? else {
            return fail(format!("{op:?} requires boolean operands"));
        };
        if (op == BinaryOp::And && !l) || (op == BinaryOp::Or && l) {
            return Ok(RuleValue::Bool(l));
        }
        return match eval(right, scope)? {
            RuleValue::Bool(r) => Ok(RuleValue::Bool(r)),
            _ => fail(format!("{op:?} requires boolean operands")),
        };
    }

    let l = eval(left, scope)?;
    let r = eval(right, scope)?;
    match op {
        BinaryOp::Eq => equals(&l, &r).map(RuleValue::Bool),
        BinaryOp::Ne => equals(&l, &r).map(|eq| RuleValue::Bool(!eq)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&l, &r) {
                (RuleValue::Number(a), RuleValue::Number(b)) => a.partial_cmp(b),
                (RuleValue::Str(a), RuleValue::Str(b)) => Some(a.cmp(b)),
                _ => None,
            };
            let Some(ordering) = ordering else {
                return fail(format!(
                    "cannot compare {} with {}",
                    l.type_name(),
                    r.type_name()
                ));
            };
            Ok(RuleValue::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Add => match (&l, &r) {
            (RuleValue::Number(a), RuleValue::Number(b)) => Ok(RuleValue::Number(a + b)),
            (RuleValue::Str(_), _) | (_, RuleValue::Str(_)) => {
                match (l.concat_text(), r.concat_text()) {
                    (Some(a), Some(b)) => Ok(RuleValue::Str(a + &b)),
                    _ => fail(format!(
                        "cannot add {} and {}",
                        l.type_name(),
                        r.type_name()
                    )),
                }
            }
            _ => fail(format!("cannot add {} and {}", l.type_name(), r.type_name())),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (RuleValue::Number(a), RuleValue::Number(b)) = (&l, &r) else {
                return fail(format!("{op:?} requires numeric operands"));
            };
            Ok(RuleValue::Number(match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            }))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

fn equals(l: &RuleValue, r: &RuleValue) -> RulesResult<bool> {
    match (l, r) {
        (RuleValue::Null, other) | (other, RuleValue::Null) => {
            Ok(matches!(other, RuleValue::Null))
        }
        (RuleValue::Bool(a), RuleValue::Bool(b)) => Ok(a == b),
        (RuleValue::Number(a), RuleValue::Number(b)) => Ok(a == b),
        (RuleValue::Str(a), RuleValue::Str(b)) => Ok(a == b),
        (a, b) if a.is_primitive() && b.is_primitive() => Ok(false),
        (a, b) => fail(format!(
            "cannot compare {} with {}",
            a.type_name(),
            b.type_name()
        )),
    }
}
