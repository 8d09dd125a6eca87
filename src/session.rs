//! Authenticated session state shared by every component that talks to the backend.
//!
//! The provider is an explicit object handed to whoever needs it. Consumers read the
//! current session or subscribe to changes (sign-in, sign-out, token refresh) through a
//! `tokio::sync::watch` channel. Acquiring and refreshing tokens happens elsewhere.

use tokio::sync::watch;

/// An authenticated session with the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user_email: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user_email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("user_email", &self.user_email)
            .finish()
    }
}

/// Holds the current session and notifies subscribers when it changes.
#[derive(Clone)]
pub struct SessionProvider {
    tx: watch::Sender<Option<Session>>,
}

impl SessionProvider {
    pub fn new(initial: Option<Session>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Provider seeded from an optional access token.
    pub fn from_token(token: Option<String>) -> Self {
        Self::new(token.map(Session::new))
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Replace the session. Subscribers are only woken when the value actually changes.
    pub fn set(&self, session: Option<Session>) {
        self.tx.send_if_modified(|current| {
            if *current == session {
                false
            } else {
                *current = session;
                true
            }
        });
    }

    pub fn sign_out(&self) {
        self.set(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new(None)
    }
}
