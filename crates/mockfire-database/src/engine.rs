use std::sync::{Arc, PoisonError, RwLock};

use mockfire_auth::{Auth, Unsubscribe};
use mockfire_rules::{
    Evaluation, RuleEngine, RulesConfig, RulesEvaluator, Ruleset, Snapshot,
};
use mockfire_store::DataTree;
use mockfire_types::{DbPath, Priority, PushIdGenerator, User};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DatabaseError, DatabaseResult};

/// What the engine does with the staged snapshot of a denied write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePolicy {
    /// Discard it: a denied write has no observable effect.
    #[default]
    CommitOnSuccess,
    /// Adopt it anyway. The write is still reported as denied.
    AdoptStaged,
}

/// Holder of the live snapshot. Only [`DataEngine::adopt`] replaces it.
struct SnapshotCell {
    live: RwLock<Snapshot>,
}

impl SnapshotCell {
    fn new(snapshot: Snapshot) -> Self {
        Self {
            live: RwLock::new(snapshot),
        }
    }

    fn get(&self) -> Snapshot {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, next: Snapshot) {
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Owner of one live [`Snapshot`], executing rule-checked operations on it.
///
/// Every operation is evaluated by the rule engine against the live
/// snapshot. Allowed operations replace it with the engine's successor;
/// denied ones leave it alone unless the [`StagePolicy`] says otherwise.
///
/// Replacement is a plain swap, not compare-and-swap: callers are expected
/// to sequence their own writes against one engine.
pub struct DataEngine {
    rules: Arc<dyn RuleEngine>,
    cell: SnapshotCell,
    policy: StagePolicy,
    push_ids: PushIdGenerator,
}

impl DataEngine {
    /// An engine seeded with `ruleset` and `seed` data.
    pub fn new(
        rules: Arc<dyn RuleEngine>,
        ruleset: Ruleset,
        seed: Value,
        policy: StagePolicy,
    ) -> DatabaseResult<Arc<Self>> {
        let initial = rules.initial_snapshot(ruleset, seed)?;
        Ok(Self::from_snapshot(rules, initial, policy))
    }

    /// An engine with the built-in evaluator, open rules and no data.
    pub fn open() -> Arc<Self> {
        let snapshot = Snapshot::new(DataTree::empty(), Ruleset::open(), None);
        Self::from_snapshot(
            Arc::new(RulesEvaluator::with_default_stages(RulesConfig::default())),
            snapshot,
            StagePolicy::default(),
        )
    }

    fn from_snapshot(rules: Arc<dyn RuleEngine>, initial: Snapshot, policy: StagePolicy) -> Arc<Self> {
        Arc::new(Self {
            rules,
            cell: SnapshotCell::new(initial),
            policy,
            push_ids: PushIdGenerator::new(),
        })
    }

    pub fn policy(&self) -> StagePolicy {
        self.policy
    }

    /// The live snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.cell.get()
    }

    fn adopt(&self, next: Snapshot) {
        tracing::debug!(version = next.version(), "adopting snapshot");
        self.cell.replace(next);
    }

    /// Follow `auth`: every identity change rebinds the live snapshot before
    /// the change notification returns.
    ///
    /// Binds to the current user immediately. The subscription holds only a
    /// weak reference to the engine.
    pub fn bind_auth(self: &Arc<Self>, auth: &Auth) -> Unsubscribe {
        self.rebind(auth.current_user().as_ref());
        let engine = Arc::downgrade(self);
        auth.on_auth_state_changed(move |user: Option<&User>| {
            if let Some(engine) = engine.upgrade() {
                engine.rebind(user);
            }
        })
    }

    /// Evaluate subsequent operations as `user`.
    pub fn rebind(&self, user: Option<&User>) {
        let next = self.rules.rebind_auth(&self.cell.get(), user);
        tracing::debug!(uid = user.map(User::uid), "rebinding auth");
        self.adopt(next);
    }

    fn checked_read(&self, path: &DbPath) -> DatabaseResult<Evaluation> {
        let evaluation = self.rules.evaluate_read(&self.cell.get(), path)?;
        if !evaluation.is_allowed() {
            tracing::warn!(path = %path, reason = ?evaluation.denial_reason(), "read denied");
            return Err(DatabaseError::denied(&evaluation));
        }
        self.adopt(evaluation.next.clone());
        Ok(evaluation)
    }

    /// The value at `path`, or `None` if nothing is stored there.
    pub fn read(&self, path: &DbPath) -> DatabaseResult<Option<Value>> {
        Ok(self.checked_read(path)?.value)
    }

    /// The subtree at `path`, priorities included.
    pub fn read_tree(&self, path: &DbPath) -> DatabaseResult<DataTree> {
        Ok(self.checked_read(path)?.next.tree().subtree(path))
    }

    fn commit(&self, evaluation: Evaluation) -> DatabaseResult<()> {
        if evaluation.is_allowed() {
            self.adopt(evaluation.next);
            return Ok(());
        }
        tracing::warn!(
            operation = %evaluation.operation,
            path = %evaluation.path,
            permitted = evaluation.permitted,
            validated = evaluation.validated,
            reason = ?evaluation.denial_reason(),
            "operation denied"
        );
        let err = DatabaseError::denied(&evaluation);
        if self.policy == StagePolicy::AdoptStaged {
            self.adopt(evaluation.next);
        }
        Err(err)
    }

    /// Store `value` at `path`, replacing what was there.
    pub fn write(
        &self,
        path: &DbPath,
        value: Value,
        priority: Option<Priority>,
    ) -> DatabaseResult<()> {
        let evaluation = self
            .rules
            .evaluate_write(&self.cell.get(), path, value, priority)?;
        self.commit(evaluation)
    }

    /// Apply every entry of `patch` below `path` as one operation.
    pub fn update(&self, path: &DbPath, patch: &Map<String, Value>) -> DatabaseResult<()> {
        let evaluation = self.rules.evaluate_update(&self.cell.get(), path, patch)?;
        self.commit(evaluation)
    }

    pub fn set(&self, path: &DbPath, value: Value) -> DatabaseResult<()> {
        self.write(path, value, None)
    }

    pub fn set_with_priority(
        &self,
        path: &DbPath,
        value: Value,
        priority: Option<Priority>,
    ) -> DatabaseResult<()> {
        self.write(path, value, priority)
    }

    pub fn remove(&self, path: &DbPath) -> DatabaseResult<()> {
        self.write(path, Value::Null, None)
    }

    /// A fresh chronologically ordered child key.
    pub fn next_push_id(&self) -> String {
        self.push_ids.next_id()
    }
}

impl std::fmt::Debug for DataEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataEngine")
            .field("version", &self.cell.get().version())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
