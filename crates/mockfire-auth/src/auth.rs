use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mockfire_types::{User, UserInfo};

use crate::credential::AuthCredential;
use crate::error::{AuthError, AuthResult, HandlerError};
use crate::observer::{NextOrObserver, Observer, Unsubscribe};

type CredentialHandler =
    Arc<dyn Fn(&AuthCredential) -> Result<UserInfo, HandlerError> + Send + Sync>;
type CustomTokenHandler = Arc<dyn Fn(&str) -> Result<UserInfo, HandlerError> + Send + Sync>;

/// Shared state behind an [`Auth`] handle.
#[derive(Default)]
pub(crate) struct AuthState {
    current: Option<User>,
    /// Registration slots. Unsubscribing empties a slot without shifting the
    /// others, so handles stay valid. Emptied slots are never reclaimed: the
    /// vector grows by one per registration for the life of the store.
    pub(crate) observers: Vec<Option<Arc<Observer>>>,
    credential_handler: Option<CredentialHandler>,
    custom_token_handler: Option<CustomTokenHandler>,
}

impl AuthState {
    fn live_observers(&self) -> Vec<Arc<Observer>> {
        self.observers.iter().flatten().cloned().collect()
    }
}

/// The identity store.
///
/// Holds the current user and notifies observers, in registration order,
/// whenever it changes. Sign-in is delegated to handlers supplied by the
/// test: `set_credential_sign_in_handler` and
/// `set_custom_token_sign_in_handler` decide which [`UserInfo`] a credential
/// or token maps to.
///
/// Observers run synchronously before the triggering call returns, outside
/// the internal lock, so a callback may call back into the store.
///
/// `Auth` is a cheap handle; clones share the same state.
#[derive(Clone, Default)]
pub struct Auth {
    state: Arc<Mutex<AuthState>>,
}

impl Auth {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configure the handler used by [`Auth::sign_in_with_credential`].
    pub fn set_credential_sign_in_handler<F>(&self, handler: F)
    where
        F: Fn(&AuthCredential) -> Result<UserInfo, HandlerError> + Send + Sync + 'static,
    {
        self.lock().credential_handler = Some(Arc::new(handler));
    }

    /// Configure the handler used by [`Auth::sign_in_with_custom_token`].
    pub fn set_custom_token_sign_in_handler<F>(&self, handler: F)
    where
        F: Fn(&str) -> Result<UserInfo, HandlerError> + Send + Sync + 'static,
    {
        self.lock().custom_token_handler = Some(Arc::new(handler));
    }

    /// Sign in by handing `credential` to the credential handler.
    pub async fn sign_in_with_credential(&self, credential: AuthCredential) -> AuthResult<User> {
        let handler = self
            .lock()
            .credential_handler
            .clone()
            .ok_or(AuthError::NoHandler {
                method: "sign_in_with_credential",
            })?;
        tracing::debug!(provider = credential.provider_id(), "signing in with credential");
        self.complete_sign_in(handler(&credential))
    }

    /// Sign in by handing `token` to the custom token handler.
    pub async fn sign_in_with_custom_token(&self, token: &str) -> AuthResult<User> {
        let handler = self
            .lock()
            .custom_token_handler
            .clone()
            .ok_or(AuthError::NoHandler {
                method: "sign_in_with_custom_token",
            })?;
        tracing::debug!("signing in with custom token");
        self.complete_sign_in(handler(token))
    }

    fn complete_sign_in(&self, outcome: Result<UserInfo, HandlerError>) -> AuthResult<User> {
        let user = match outcome {
            Ok(info) => User::from_info(info)?,
            Err(e) => {
                let err = AuthError::Handler(e);
                tracing::warn!(error = %err, "sign-in handler failed");
                let observers = self.lock().live_observers();
                for observer in &observers {
                    observer.error(&err);
                }
                return Err(err);
            }
        };

        tracing::info!(uid = user.uid(), provider = user.provider_id(), "signed in");
        self.transition(Some(user.clone()));
        Ok(user)
    }

    /// Sign the current user out. Always succeeds, even when nobody is
    /// signed in.
    pub async fn sign_out(&self) {
        tracing::info!("signed out");
        self.transition(None);
    }

    fn transition(&self, user: Option<User>) {
        let observers = {
            let mut state = self.lock();
            state.current = user.clone();
            state.live_observers()
        };
        for observer in &observers {
            observer.next(user.as_ref());
        }
    }

    /// Register an observer of identity changes.
    ///
    /// Accepts a bare `next` callback or a full [`Observer`]. The observer
    /// is not called on registration, only on later changes.
    ///
    /// The client's `onAuthStateChanged(next, error, complete)` form maps to
    /// the [`Observer`] builder:
    ///
    /// ```rust
    /// use mockfire_auth::{Auth, Observer};
    ///
    /// let auth = Auth::new();
    /// let unsubscribe = auth.on_auth_state_changed(
    ///     Observer::new(|user| println!("user: {:?}", user.map(|u| u.uid())))
    ///         .on_error(|err| eprintln!("sign-in failed: {err}"))
    ///         .on_complete(|| println!("auth shut down")),
    /// );
    /// auth.shutdown();
    /// unsubscribe.unsubscribe();
    /// ```
    pub fn on_auth_state_changed(&self, observer: impl Into<NextOrObserver>) -> Unsubscribe {
        let observer = Arc::new(observer.into().into_observer());
        let mut state = self.lock();
        state.observers.push(Some(observer));
        Unsubscribe::new(Arc::downgrade(&self.state), state.observers.len() - 1)
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.lock().current.clone()
    }

    /// Complete and drop every observer. Used when the owning app is
    /// deleted; later registrations still work.
    pub fn shutdown(&self) {
        let observers = {
            let mut state = self.lock();
            let live = state.live_observers();
            state.observers.iter_mut().for_each(|slot| *slot = None);
            live
        };
        tracing::debug!(observers = observers.len(), "auth shut down");
        for observer in &observers {
            observer.complete();
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Auth")
            .field("current", &state.current)
            .field("observers", &state.observers.iter().flatten().count())
            .finish()
    }
}
