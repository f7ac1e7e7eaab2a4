//! Collaborators the client reports to but does not own.
//!
//! The client reads the access token from an [`AuthStore`], flips the global
//! loading flag on a [`UiStore`], and asks a [`Navigator`] to go to the login
//! route when the backend rejects the session. All three are injected through
//! [`ClientBuilder`](crate::ClientBuilder), so tests can substitute recording
//! implementations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// Holds the session's access token.
///
/// # Examples
///
/// ```
/// use apifetch::AuthStore;
/// use std::sync::Mutex;
///
/// struct KeyringAuth {
///     token: Mutex<Option<String>>,
/// }
///
/// impl AuthStore for KeyringAuth {
///     fn access_token(&self) -> Option<String> {
///         self.token.lock().unwrap().clone()
///     }
///
///     fn logout(&self) {
///         self.token.lock().unwrap().take();
///     }
/// }
/// ```
pub trait AuthStore: Send + Sync {
    /// Returns the current access token. Read once per request, when the request is prepared.
    fn access_token(&self) -> Option<String>;

    /// Clears the session. Called when a request comes back 401.
    fn logout(&self);

    /// Returns `true` if [`logout`](AuthStore::logout) already navigates to the login route.
    ///
    /// When it does, the client skips its own navigation so the user is only redirected once.
    fn logout_navigates(&self) -> bool {
        false
    }
}

/// Holds the global loading flag.
///
/// The flag is a plain boolean, not a counter: with several requests in flight,
/// the first one to settle turns it off.
pub trait UiStore: Send + Sync {
    /// Sets the global loading flag.
    fn set_global_loading(&self, loading: bool);
}

/// Performs route navigation in an interactive front end.
pub trait Navigator: Send + Sync {
    /// Navigates to the given route.
    fn navigate_to(&self, path: &str);

    /// Returns `true` if there is a live UI to navigate.
    ///
    /// Navigation is skipped when this returns `false`, for example while
    /// rendering on a server.
    fn is_interactive(&self) -> bool {
        true
    }
}

/// An in-process [`AuthStore`].
#[derive(Debug, Default)]
pub struct MemoryAuthStore {
    token: RwLock<Option<String>>,
}

impl MemoryAuthStore {
    /// Creates a store holding the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Replaces the token, e.g. after a successful login.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Returns `true` if a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl AuthStore for MemoryAuthStore {
    fn access_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn logout(&self) {
        self.token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// An in-process [`UiStore`].
#[derive(Debug, Default)]
pub struct MemoryUiStore {
    loading: AtomicBool,
}

impl MemoryUiStore {
    /// Creates a store with loading off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value of the global loading flag.
    pub fn is_global_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }
}

impl UiStore for MemoryUiStore {
    fn set_global_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }
}

/// Sets the loading flag for as long as it lives.
///
/// Dropping the guard turns the flag off exactly once, whether the request
/// completed, failed, or its future was dropped mid-flight.
pub(crate) struct LoadingGuard<'a> {
    ui: &'a dyn UiStore,
}

impl<'a> LoadingGuard<'a> {
    pub(crate) fn start(ui: &'a dyn UiStore) -> Self {
        ui.set_global_loading(true);
        Self { ui }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.ui.set_global_loading(false);
    }
}
