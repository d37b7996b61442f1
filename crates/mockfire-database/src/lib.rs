//! Rule-checked in-memory realtime database for mockfire.
//!
//! A [`DataEngine`] owns the one live [`Snapshot`](mockfire_rules::Snapshot)
//! and runs every read and write through a
//! [`RuleEngine`](mockfire_rules::RuleEngine). [`Database`] and
//! [`Reference`] are the path-addressed surface tests talk to:
//!
//! ```rust
//! use mockfire_database::{DataEngine, Database, EventType};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let db = Database::new(DataEngine::open());
//! let user = db.reference("users/42").unwrap();
//! user.set(&json!({"name": "Ann"})).await.unwrap();
//!
//! let snap = user.once(EventType::Value).await.unwrap();
//! assert_eq!(snap.key(), Some("42"));
//! assert_eq!(snap.val(), json!({"name": "Ann"}));
//! # });
//! ```
//!
//! A denied operation fails with [`DatabaseError::Denied`] and, under the
//! default [`StagePolicy`], leaves the data exactly as it was.

pub mod data_snapshot;
pub mod database;
pub mod engine;
pub mod error;
pub mod event;
pub mod reference;
pub mod thenable;

pub use data_snapshot::DataSnapshot;
pub use database::Database;
pub use engine::{DataEngine, StagePolicy};
pub use error::{DatabaseError, DatabaseResult};
pub use event::EventType;
pub use reference::Reference;
pub use thenable::ThenableReference;
