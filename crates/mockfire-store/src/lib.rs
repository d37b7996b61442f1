//! Immutable data tree for mockfire.
//!
//! A [`DataTree`] is one version of the whole database: a JSON value plus the
//! priorities attached to its nodes. Trees are never mutated in place. Every
//! write produces a new tree and leaves the original untouched, which is what
//! lets the data engine keep a prior version around when an operation is
//! denied.
//!
//! # Normal Form
//!
//! 1. `null` means "absent"; writing `null` deletes.
//! 2. Objects with no children do not exist and are pruned.
//! 3. Arrays are stored as objects keyed by index (`"0"`, `"1"`, ...).
//! 4. `.priority` and `.value` keys in written values are lifted into the
//!    priority table; every other key must be a valid path key.

pub mod error;
pub mod tree;

pub use error::{StoreError, StoreResult};
pub use tree::DataTree;
