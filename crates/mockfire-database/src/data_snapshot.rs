use mockfire_store::DataTree;
use mockfire_types::{DbPath, Priority};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DatabaseResult;
use crate::reference::Reference;

/// The data at a location, as returned by `once`.
///
/// Holds its own copy of the subtree; later writes do not change it.
#[derive(Clone, Debug)]
pub struct DataSnapshot {
    reference: Reference,
    tree: DataTree,
}

impl DataSnapshot {
    pub(crate) fn new(reference: Reference, tree: DataTree) -> Self {
        Self { reference, tree }
    }

    /// The stored value, `Value::Null` if nothing is there.
    pub fn val(&self) -> Value {
        self.tree.value().clone()
    }

    /// The stored value deserialized into `T`.
    pub fn val_as<T: DeserializeOwned>(&self) -> DatabaseResult<T> {
        Ok(serde_json::from_value(self.val())?)
    }

    /// The value with `.priority` / `.value` markers wherever priorities are
    /// set.
    pub fn export_val(&self) -> Value {
        self.tree.export()
    }

    /// Last segment of the location; `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.reference.key()
    }

    pub fn exists(&self) -> bool {
        !self.tree.is_empty()
    }

    pub fn priority(&self) -> Option<&Priority> {
        self.tree.priority(&DbPath::root())
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// The snapshot of a descendant. Always succeeds for a valid path; the
    /// result may not exist.
    pub fn child(&self, relative: &str) -> DatabaseResult<DataSnapshot> {
        let relative_path = DbPath::parse(relative)?;
        Ok(Self {
            reference: self.reference.child(relative)?,
            tree: self.tree.subtree(&relative_path),
        })
    }

    pub fn has_child(&self, relative: &str) -> DatabaseResult<bool> {
        Ok(self.tree.exists(&DbPath::parse(relative)?))
    }

    pub fn has_children(&self) -> bool {
        self.num_children() > 0
    }

    pub fn num_children(&self) -> usize {
        self.tree.child_count(&DbPath::root())
    }

    /// Child snapshots in child order: by priority, then by key.
    pub fn children(&self) -> Vec<DataSnapshot> {
        self.tree
            .ordered_keys(&DbPath::root())
            .into_iter()
            .filter_map(|key| self.child(&key).ok())
            .collect()
    }

    /// Call `action` on each child in order until it returns `true`.
    ///
    /// Returns `true` if iteration was stopped early.
    pub fn for_each(&self, mut action: impl FnMut(DataSnapshot) -> bool) -> bool {
        self.children().into_iter().any(|child| action(child))
    }
}
