use std::fmt;
use std::sync::{Mutex, PoisonError, Weak};

use mockfire_types::User;

use crate::auth::AuthState;
use crate::error::AuthError;

type NextFn = Box<dyn Fn(Option<&User>) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&AuthError) + Send + Sync>;
type CompleteFn = Box<dyn Fn() + Send + Sync>;

/// An auth-state observer: `next` on every identity change, `error` when a
/// sign-in handler fails, `complete` once when the store shuts down.
pub struct Observer {
    next: NextFn,
    error: ErrorFn,
    complete: CompleteFn,
}

impl Observer {
    /// An observer with no-op `error` and `complete` callbacks.
    pub fn new(next: impl Fn(Option<&User>) + Send + Sync + 'static) -> Self {
        Self {
            next: Box::new(next),
            error: Box::new(|_| {}),
            complete: Box::new(|| {}),
        }
    }

    pub fn on_error(mut self, error: impl Fn(&AuthError) + Send + Sync + 'static) -> Self {
        self.error = Box::new(error);
        self
    }

    pub fn on_complete(mut self, complete: impl Fn() + Send + Sync + 'static) -> Self {
        self.complete = Box::new(complete);
        self
    }

    pub(crate) fn next(&self, user: Option<&User>) {
        (self.next)(user)
    }

    pub(crate) fn error(&self, error: &AuthError) {
        (self.error)(error)
    }

    pub(crate) fn complete(&self) {
        (self.complete)()
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").finish_non_exhaustive()
    }
}

/// Either a bare `next` callback or a full [`Observer`].
pub enum NextOrObserver {
    Next(NextFn),
    Observer(Observer),
}

impl NextOrObserver {
    pub(crate) fn into_observer(self) -> Observer {
        match self {
            Self::Next(next) => Observer {
                next,
                error: Box::new(|_| {}),
                complete: Box::new(|| {}),
            },
            Self::Observer(observer) => observer,
        }
    }
}

impl<F> From<F> for NextOrObserver
where
    F: Fn(Option<&User>) + Send + Sync + 'static,
{
    fn from(next: F) -> Self {
        Self::Next(Box::new(next))
    }
}

impl From<Observer> for NextOrObserver {
    fn from(observer: Observer) -> Self {
        Self::Observer(observer)
    }
}

/// Handle returned by `on_auth_state_changed`.
///
/// Removes exactly the registration it was issued for. Calling
/// [`Unsubscribe::unsubscribe`] again, or after the store is gone, does
/// nothing.
#[derive(Debug)]
pub struct Unsubscribe {
    state: Weak<Mutex<AuthState>>,
    slot: usize,
}

impl Unsubscribe {
    pub(crate) fn new(state: Weak<Mutex<AuthState>>, slot: usize) -> Self {
        Self { state, slot }
    }

    pub fn unsubscribe(&self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = state.observers.get_mut(self.slot) {
            *slot = None;
        }
    }
}
