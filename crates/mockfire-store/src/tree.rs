use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use mockfire_types::{compare_keys, validate_key, DbPath, Priority};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

const PRIORITY_KEY: &str = ".priority";
const VALUE_KEY: &str = ".value";

/// One immutable version of the data tree.
///
/// Cloning is cheap: the value and the priority table are shared behind
/// `Arc`s. Writes return a new tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTree {
    root: Arc<Value>,
    priorities: Arc<BTreeMap<DbPath, Priority>>,
}

impl DataTree {
    /// An empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a tree from seed data, normalizing it.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        Self::empty().set(&DbPath::root(), value, None)
    }

    /// The whole tree as a JSON value (`null` when empty).
    pub fn value(&self) -> &Value {
        &self.root
    }

    /// Returns `true` if the tree holds no data.
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }

    /// The value at `path`, or `None` if nothing is stored there.
    ///
    /// Traversal stops at the first missing key or leaf; an absent node is
    /// not an error.
    pub fn get(&self, path: &DbPath) -> Option<&Value> {
        let mut node = self.root.as_ref();
        for segment in path.segments() {
            node = node.as_object()?.get(segment)?;
        }
        if node.is_null() {
            None
        } else {
            Some(node)
        }
    }

    /// Returns `true` if a value is stored at `path`.
    pub fn exists(&self, path: &DbPath) -> bool {
        self.get(path).is_some()
    }

    /// The priority attached to the node at `path`.
    pub fn priority(&self, path: &DbPath) -> Option<&Priority> {
        self.priorities.get(path)
    }

    /// The subtree rooted at `path`, with priorities re-rooted to match.
    pub fn subtree(&self, path: &DbPath) -> DataTree {
        if path.is_root() {
            return self.clone();
        }
        let root = self.get(path).cloned().unwrap_or(Value::Null);
        let priorities = self
            .priorities
            .iter()
            .filter_map(|(p, prio)| p.strip_prefix(path).map(|rel| (rel, prio.clone())))
            .collect();
        Self {
            root: Arc::new(root),
            priorities: Arc::new(priorities),
        }
    }

    /// Keys of the children of `path`, in child order (priority, then key).
    pub fn ordered_keys(&self, path: &DbPath) -> Vec<String> {
        let Some(Value::Object(map)) = self.get(path) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort_by(|a, b| self.compare_children(path, a, b));
        keys
    }

    /// Compare two children of `path` in child order.
    pub fn compare_children(&self, path: &DbPath, a: &str, b: &str) -> Ordering {
        let pa = path.push_key(a).ok();
        let pb = path.push_key(b).ok();
        Priority::compare(
            pa.as_ref().and_then(|p| self.priority(p)),
            pb.as_ref().and_then(|p| self.priority(p)),
        )
        .then_with(|| compare_keys(a, b))
    }

    /// Number of direct children of `path`.
    pub fn child_count(&self, path: &DbPath) -> usize {
        match self.get(path) {
            Some(Value::Object(map)) => map.len(),
            _ => 0,
        }
    }

    /// Return a new tree with `value` stored at `path`.
    ///
    /// `priority` is attached to the written node; `.priority` keys inside
    /// `value` attach priorities to nested nodes. Priorities previously held
    /// at or below `path` are discarded.
    pub fn set(
        &self,
        path: &DbPath,
        value: Value,
        priority: Option<Priority>,
    ) -> StoreResult<DataTree> {
        let mut lifted = Vec::new();
        let (normalized, inline_priority) = normalize(value, path, &mut lifted)?;

        let mut root = (*self.root).clone();
        place(&mut root, path.segments(), normalized);

        let mut priorities: BTreeMap<DbPath, Priority> = self
            .priorities
            .iter()
            .filter(|(p, _)| !p.starts_with(path))
            .map(|(p, prio)| (p.clone(), prio.clone()))
            .collect();
        priorities.extend(lifted);
        if let Some(prio) = priority.or(inline_priority) {
            priorities.insert(path.clone(), prio);
        }

        let mut tree = Self {
            root: Arc::new(root),
            priorities: Arc::new(BTreeMap::new()),
        };
        priorities.retain(|p, _| tree.exists(p));
        tree.priorities = Arc::new(priorities);

        tracing::trace!(path = %path, "data tree write");
        Ok(tree)
    }

    /// Return a new tree with every entry of `patch` written below `path`.
    ///
    /// Patch keys are relative paths. Keys must not overlap: naming both a
    /// path and one of its descendants is rejected.
    pub fn update(&self, path: &DbPath, patch: &Map<String, Value>) -> StoreResult<DataTree> {
        let targets = Self::update_targets(path, patch)?;
        let mut tree = self.clone();
        for (target, value) in targets {
            tree = tree.set(&target, value, None)?;
        }
        Ok(tree)
    }

    /// Resolve patch keys to absolute paths, checking for overlap.
    pub fn update_targets(
        path: &DbPath,
        patch: &Map<String, Value>,
    ) -> StoreResult<Vec<(DbPath, Value)>> {
        let mut targets: Vec<(DbPath, Value)> = Vec::with_capacity(patch.len());
        for (key, value) in patch {
            let relative = DbPath::parse(key)?;
            if relative.is_root() {
                return Err(StoreError::InvalidValue {
                    path: path.clone(),
                    reason: "update keys must name a child path".into(),
                });
            }
            let target = path.join(&relative);
            for (existing, _) in &targets {
                if target.starts_with(existing) {
                    return Err(StoreError::OverlappingUpdate {
                        ancestor: existing.clone(),
                        descendant: target,
                    });
                }
                if existing.starts_with(&target) {
                    return Err(StoreError::OverlappingUpdate {
                        ancestor: target,
                        descendant: existing.clone(),
                    });
                }
            }
            targets.push((target, value.clone()));
        }
        Ok(targets)
    }

    /// The tree rendered with `.priority` / `.value` markers.
    pub fn export(&self) -> Value {
        self.export_at(&DbPath::root(), &self.root)
    }

    fn export_at(&self, path: &DbPath, node: &Value) -> Value {
        let priority = self.priority(path).map(Priority::to_value);
        match node {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, child) in map {
                    let child_path = path.push_key(key).unwrap_or_else(|_| path.clone());
                    out.insert(key.clone(), self.export_at(&child_path, child));
                }
                if let Some(prio) = priority {
                    out.insert(PRIORITY_KEY.into(), prio);
                }
                Value::Object(out)
            }
            leaf => match priority {
                Some(prio) => {
                    let mut out = Map::new();
                    out.insert(VALUE_KEY.into(), leaf.clone());
                    out.insert(PRIORITY_KEY.into(), prio);
                    Value::Object(out)
                }
                None => leaf.clone(),
            },
        }
    }
}

/// Normalize a written value rooted at `path`.
///
/// Returns the stored value and the priority found inline on the root node.
/// Priorities found on nested nodes are pushed onto `lifted`.
fn normalize(
    value: Value,
    path: &DbPath,
    lifted: &mut Vec<(DbPath, Priority)>,
) -> StoreResult<(Value, Option<Priority>)> {
    match value {
        Value::Array(items) => {
            let map = items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect();
            normalize(Value::Object(map), path, lifted)
        }
        Value::Object(mut map) => {
            let priority = match map.remove(PRIORITY_KEY) {
                Some(raw) => Priority::from_value(&raw)?,
                None => None,
            };

            if let Some(inner) = map.remove(VALUE_KEY) {
                if !map.is_empty() {
                    return Err(StoreError::InvalidValue {
                        path: path.clone(),
                        reason: "'.value' cannot be combined with child keys".into(),
                    });
                }
                if inner.is_object() || inner.is_array() {
                    return Err(StoreError::InvalidValue {
                        path: path.clone(),
                        reason: "'.value' must hold a primitive".into(),
                    });
                }
                let priority = if inner.is_null() { None } else { priority };
                return Ok((inner, priority));
            }

            let mut out = Map::new();
            for (key, child) in map {
                validate_key(&key)?;
                let child_path = path.push_key(&key)?;
                let (normalized, child_priority) = normalize(child, &child_path, lifted)?;
                if normalized.is_null() {
                    continue;
                }
                if let Some(prio) = child_priority {
                    lifted.push((child_path, prio));
                }
                out.insert(key, normalized);
            }

            if out.is_empty() {
                Ok((Value::Null, None))
            } else {
                Ok((Value::Object(out), priority))
            }
        }
        Value::Null => Ok((Value::Null, None)),
        leaf => Ok((leaf, None)),
    }
}

/// Store `value` at `segments` below `node`, creating and pruning
/// intermediate objects as needed.
fn place(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    let now_empty = match node {
        Value::Object(map) => {
            let child = map.entry(head.clone()).or_insert(Value::Null);
            place(child, rest, value);
            if child.is_null() {
                map.remove(head);
            }
            map.is_empty()
        }
        _ => false,
    };
    if now_empty {
        *node = Value::Null;
    }
}
