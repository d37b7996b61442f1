use std::sync::Arc;

use mockfire_store::DataTree;
use serde_json::Value;

use crate::ruleset::Ruleset;

/// One immutable state of a rules-governed database: the data, the rules
/// guarding it and the identity operations are evaluated as.
///
/// Every transition produces a new snapshot with a higher `version`; the
/// previous one is never modified.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    tree: DataTree,
    rules: Arc<Ruleset>,
    auth: Option<Value>,
    version: u64,
}

impl Snapshot {
    pub fn new(tree: DataTree, rules: Ruleset, auth: Option<Value>) -> Self {
        Self {
            tree,
            rules: Arc::new(rules),
            auth,
            version: 0,
        }
    }

    pub fn tree(&self) -> &DataTree {
        &self.tree
    }

    pub fn rules(&self) -> &Ruleset {
        &self.rules
    }

    /// Rule context of the identity, or `None` when signed out.
    pub fn auth(&self) -> Option<&Value> {
        self.auth.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The successor holding `tree`.
    pub(crate) fn with_tree(&self, tree: DataTree) -> Self {
        Self {
            tree,
            rules: Arc::clone(&self.rules),
            auth: self.auth.clone(),
            version: self.version + 1,
        }
    }

    /// The successor evaluating as `auth`.
    pub(crate) fn with_auth(&self, auth: Option<Value>) -> Self {
        Self {
            tree: self.tree.clone(),
            rules: Arc::clone(&self.rules),
            auth,
            version: self.version + 1,
        }
    }
}
