//! App-level API for mockfire.
//!
//! An [`App`] pairs an [`Auth`](mockfire_auth::Auth) identity store with a
//! rule-checked [`Database`](mockfire_database::Database) that follows it:
//! signing in or out rebinds the `auth` variable seen by every rule.
//!
//! Apps live in a caller-owned [`AppRegistry`]. [`Firebase`] wraps one
//! process-wide registry for code that expects a default instance.
//!
//! ```rust
//! use mockfire_sdk::{AppRegistry, MockConfig};
//! use mockfire_types::UserInfo;
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let registry = AppRegistry::new();
//! let config = MockConfig {
//!     rules: Some(json!({"rules": {".read": true, ".write": "auth != null"}})),
//!     ..Default::default()
//! };
//! registry.initialize_app_with(config, None).unwrap();
//!
//! let db = registry.database().unwrap();
//! let motd = db.reference("motd").unwrap();
//! assert!(motd.set(&"hi").await.unwrap_err().is_denied());
//!
//! let auth = registry.auth().unwrap();
//! auth.set_custom_token_sign_in_handler(|token| Ok(UserInfo::with_uid(token)));
//! auth.sign_in_with_custom_token("ann").await.unwrap();
//! motd.set(&"hi").await.unwrap();
//! # });
//! ```

pub mod app;
pub mod error;
pub mod options;
pub mod registry;
pub mod shim;

pub use app::App;
pub use error::{SdkError, SdkResult};
pub use options::{AppOptions, MockConfig};
pub use registry::{AppRegistry, DEFAULT_APP_NAME};
pub use shim::Firebase;

pub use mockfire_auth::{Auth, AuthCredential, NextOrObserver, Observer, Unsubscribe};
pub use mockfire_database::{DataSnapshot, Database, EventType, Reference, StagePolicy};
pub use mockfire_rules::{RulesConfig, Ruleset};
pub use mockfire_types::{User, UserInfo};
