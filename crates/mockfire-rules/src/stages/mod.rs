//! Built-in evaluation stages.

pub mod permission;
pub mod validation;

pub use permission::PermissionStage;
pub use validation::ValidationStage;

use mockfire_store::DataTree;
use mockfire_types::DbPath;

use crate::error::RulesResult;
use crate::stage::Operation;

/// Absolute paths an operation touches. An update touches each patched path.
fn targets(operation: &Operation) -> RulesResult<Vec<DbPath>> {
    Ok(match operation {
        Operation::Read { path } | Operation::Write { path, .. } => vec![path.clone()],
        Operation::Update { path, patch } => DataTree::update_targets(path, patch)?
            .into_iter()
            .map(|(target, _)| target)
            .collect(),
    })
}
