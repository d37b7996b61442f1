//! Foundation types for mockfire.
//!
//! This crate provides the addressing, ordering, and identity primitives
//! shared by every other mockfire crate. It has no knowledge of rules or
//! stored data.
//!
//! # Key Types
//!
//! - [`DbPath`]: Normalized, validated slash-delimited location in the tree
//! - [`Priority`]: Optional ordering hint attached to a node
//! - [`User`] / [`UserInfo`]: The signed-in identity and its raw profile
//! - [`PushIdGenerator`]: Chronologically sortable child keys

pub mod error;
pub mod identity;
pub mod order;
pub mod path;
pub mod priority;
pub mod push_id;

pub use error::{TypeError, TypeResult};
pub use identity::{User, UserInfo, DEFAULT_PROVIDER_ID};
pub use order::compare_keys;
pub use path::{validate_key, DbPath, MAX_KEY_BYTES};
pub use priority::Priority;
pub use push_id::PushIdGenerator;
