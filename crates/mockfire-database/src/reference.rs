use std::fmt;
use std::sync::Arc;

use mockfire_types::{DbPath, Priority};
use serde::Serialize;
use serde_json::Value;

use crate::data_snapshot::DataSnapshot;
use crate::engine::DataEngine;
use crate::error::{DatabaseError, DatabaseResult};
use crate::event::EventType;
use crate::thenable::ThenableReference;

/// A handle on one location in the database.
///
/// Holds nothing but the engine and the path; navigation never touches data.
#[derive(Clone)]
pub struct Reference {
    engine: Arc<DataEngine>,
    path: DbPath,
}

impl Reference {
    pub(crate) fn new(engine: Arc<DataEngine>, path: DbPath) -> Self {
        Self { engine, path }
    }

    pub fn path(&self) -> &DbPath {
        &self.path
    }

    /// Last segment of the path; `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.path.key()
    }

    /// A handle on `relative` below this one. `relative` may span several
    /// segments (`"a/b/c"`).
    pub fn child(&self, relative: &str) -> DatabaseResult<Reference> {
        Ok(Self::new(
            Arc::clone(&self.engine),
            self.path.child(relative)?,
        ))
    }

    /// The parent location; `None` at the root.
    pub fn parent(&self) -> Option<Reference> {
        self.path
            .parent()
            .map(|parent| Self::new(Arc::clone(&self.engine), parent))
    }

    pub fn root(&self) -> Reference {
        Self::new(Arc::clone(&self.engine), DbPath::root())
    }

    /// Read once.
    ///
    /// `Value` yields the whole subtree. `ChildAdded` yields the first child
    /// in child order; it fails with [`DatabaseError::NoChildren`] when
    /// nothing is stored and [`DatabaseError::NotACollection`] on a leaf.
    ///
    /// # Panics
    ///
    /// `ChildRemoved`, `ChildChanged` and `ChildMoved` are not implemented.
    pub async fn once(&self, event: EventType) -> DatabaseResult<DataSnapshot> {
        match event {
            EventType::Value => {
                let tree = self.engine.read_tree(&self.path)?;
                Ok(DataSnapshot::new(self.clone(), tree))
            }
            EventType::ChildAdded => {
                let tree = self.engine.read_tree(&self.path)?;
                match tree.value() {
                    Value::Object(_) => {}
                    Value::Null => {
                        return Err(DatabaseError::NoChildren {
                            path: self.path.clone(),
                        })
                    }
                    _ => {
                        return Err(DatabaseError::NotACollection {
                            path: self.path.clone(),
                        })
                    }
                }
                let whole = DataSnapshot::new(self.clone(), tree);
                whole.children().into_iter().next().ok_or_else(|| {
                    DatabaseError::NoChildren {
                        path: self.path.clone(),
                    }
                })
            }
            unsupported => unimplemented!("once({unsupported})"),
        }
    }

    /// Replace the data here with `value`. Writing `null` removes it.
    pub async fn set<T: Serialize + ?Sized>(&self, value: &T) -> DatabaseResult<()> {
        self.engine.set(&self.path, serde_json::to_value(value)?)
    }

    /// Replace the data here and attach `priority` (a string, a number, or
    /// `null` to clear it).
    pub async fn set_with_priority<T, P>(&self, value: &T, priority: &P) -> DatabaseResult<()>
    where
        T: Serialize + ?Sized,
        P: Serialize + ?Sized,
    {
        let priority = Priority::from_value(&serde_json::to_value(priority)?)
            .map_err(|e| DatabaseError::InvalidArgument(e.to_string()))?;
        self.engine
            .set_with_priority(&self.path, serde_json::to_value(value)?, priority)
    }

    /// Write each entry of `values` (an object keyed by relative paths) as a
    /// single operation.
    pub async fn update<T: Serialize + ?Sized>(&self, values: &T) -> DatabaseResult<()> {
        match serde_json::to_value(values)? {
            Value::Object(patch) => self.engine.update(&self.path, &patch),
            other => Err(DatabaseError::InvalidArgument(format!(
                "update expects an object, got {other}"
            ))),
        }
    }

    pub async fn remove(&self) -> DatabaseResult<()> {
        self.engine.remove(&self.path)
    }

    /// Write `value` under a new chronologically ordered child key.
    ///
    /// The write happens immediately. The returned handle is usable as a
    /// reference right away and can be awaited for the write's outcome.
    /// Only an unusable generated key fails here; a denied write surfaces
    /// when the handle is awaited.
    pub fn push<T: Serialize + ?Sized>(&self, value: &T) -> DatabaseResult<ThenableReference> {
        let reference = self.push_ref()?;
        let outcome = serde_json::to_value(value)
            .map_err(DatabaseError::from)
            .and_then(|value| reference.engine.set(&reference.path, value));
        Ok(ThenableReference::new(reference, outcome))
    }

    /// A handle on a new chronologically ordered child key, without writing.
    pub fn push_ref(&self) -> DatabaseResult<Reference> {
        let key = self.engine.next_push_id();
        let path = self.path.push_key(&key)?;
        Ok(Self::new(Arc::clone(&self.engine), path))
    }

    /// # Panics
    ///
    /// Live listeners are not implemented.
    pub fn on<F>(&self, _event: EventType, _callback: F)
    where
        F: Fn(&DataSnapshot) + Send + Sync + 'static,
    {
        unimplemented!("on")
    }

    /// # Panics
    ///
    /// Live listeners are not implemented.
    pub fn off(&self, _event: Option<EventType>) {
        unimplemented!("off")
    }

    /// # Panics
    ///
    /// Transactions are not implemented.
    pub fn transaction<F>(&self, _update: F) -> DatabaseResult<DataSnapshot>
    where
        F: Fn(Option<Value>) -> Option<Value>,
    {
        unimplemented!("transaction")
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.engine, &other.engine) && self.path == other.path
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reference").field(&self.path.to_string()).finish()
    }
}
