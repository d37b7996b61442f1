//! Identity store for mockfire.
//!
//! [`Auth`] holds the signed-in [`User`](mockfire_types::User), if any, and
//! tells its observers whenever that changes. It knows nothing about data or
//! rules; the database binds to it as just another observer.
//!
//! Sign-in never talks to a real provider. Tests register handlers that map
//! an [`AuthCredential`] or a custom token to a
//! [`UserInfo`](mockfire_types::UserInfo):
//!
//! ```rust
//! use mockfire_auth::Auth;
//! use mockfire_types::{User, UserInfo};
//!
//! let auth = Auth::new();
//! auth.set_custom_token_sign_in_handler(|token| Ok(UserInfo::with_uid(token)));
//! let unsubscribe = auth.on_auth_state_changed(|user: Option<&User>| {
//!     println!("now signed in as {:?}", user.map(User::uid));
//! });
//! assert!(auth.current_user().is_none());
//! unsubscribe.unsubscribe();
//! ```

pub mod auth;
pub mod credential;
pub mod error;
pub mod observer;

pub use auth::Auth;
pub use credential::AuthCredential;
pub use error::{AuthError, AuthResult, HandlerError};
pub use observer::{NextOrObserver, Observer, Unsubscribe};
