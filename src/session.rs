use std::sync::Arc;

use tokio::sync::watch;

use crate::backend::Backend;
use crate::csrf::TokenCache;
use crate::epoch::{Epoch, Ticket};
use crate::error::Error;
use crate::guard::InFlight;
use crate::types::{Credentials, Principal};

/// Where the session stands.
///
/// `Unresolved` only exists until the startup identity probe settles; nothing
/// ever transitions back into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unresolved,
    Authenticated(Principal),
    Unauthenticated,
}

/// Snapshot of the session as the presentation layer sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    state: SessionState,
}

impl SessionView {
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn session(&self) -> Option<&Principal> {
        match &self.state {
            SessionState::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Unresolved
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.session().is_some_and(Principal::is_admin)
    }
}

/// Proof of a live session, required by every gated LGPD call.
///
/// Only [`SessionStore::scope`] hands these out. A scope outlives nothing:
/// once the session it was taken from ends, it is rejected.
#[derive(Debug, Clone)]
pub struct AuthScope {
    principal: Principal,
    ticket: Ticket,
}

impl AuthScope {
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// `false` once the session this scope was taken from has changed.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.ticket.is_current()
    }

    pub(crate) fn ensure_current(&self) -> Result<(), Error> {
        if self.is_current() {
            Ok(())
        } else {
            Err(Error::Unauthenticated)
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.ticket.issued()
    }
}

/// Owns the authenticated identity; the only writer of [`SessionState`].
pub struct SessionStore<B> {
    backend: Arc<B>,
    tokens: Arc<TokenCache<B>>,
    state: watch::Sender<SessionView>,
    epoch: Epoch,
    login_flight: InFlight,
}

impl<B: Backend> SessionStore<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, tokens: Arc<TokenCache<B>>) -> Self {
        let (state, _) = watch::channel(SessionView::default());
        Self {
            backend,
            tokens,
            state,
            epoch: Epoch::new(),
            login_flight: InFlight::new(),
        }
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.state.borrow().clone()
    }

    /// Receive a new [`SessionView`] on every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.state.subscribe()
    }

    /// A capability for gated calls, or [`Error::Unauthenticated`].
    ///
    /// # Errors
    ///
    /// Fails while the session is unresolved or signed out.
    pub fn scope(&self) -> Result<AuthScope, Error> {
        // Ticket first: a transition racing this call leaves it stale.
        let ticket = self.epoch.ticket();
        match &self.state.borrow().state {
            SessionState::Authenticated(principal) => Ok(AuthScope {
                principal: principal.clone(),
                ticket,
            }),
            _ => Err(Error::Unauthenticated),
        }
    }

    #[must_use]
    pub fn is_login_pending(&self) -> bool {
        self.login_flight.is_pending()
    }

    /// Startup: settle the token fetch, then probe the identity.
    pub async fn initialize(&self) -> SessionView {
        self.tokens.fetch().await;
        self.check_auth().await
    }

    /// Resolve `Unresolved` from `GET /api/auth/me`.
    ///
    /// A failed probe, or one lacking an id or role, settles as
    /// `Unauthenticated`. Does nothing once the state is resolved, and drops
    /// its result if a login or logout landed while it was in flight.
    pub async fn check_auth(&self) -> SessionView {
        if !self.view().is_loading() {
            return self.view();
        }
        let ticket = self.epoch.ticket();

        let principal = match self.backend.me().await {
            Ok(probe) => probe.into_principal(),
            Err(e) => {
                tracing::debug!(error = %e, "Identity probe failed");
                None
            }
        };

        if !ticket.is_current() {
            tracing::debug!("Discarding identity probe superseded by a session change");
            return self.view();
        }

        let next = match principal {
            Some(principal) => {
                tracing::info!(user_id = %principal.id, "Session restored");
                SessionState::Authenticated(principal)
            }
            None => SessionState::Unauthenticated,
        };
        self.commit(next);
        self.view()
    }

    /// Sign in, then rotate the anti-forgery token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if a login is already outstanding, and the
    /// backend rejection otherwise; the state is left untouched on failure.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Principal, Error> {
        let _flight = self.login_flight.try_begin("login")?;
        let credentials = Credentials::new(username, password);

        let csrf = self.tokens.ensure().await;
        let principal = self.backend.login(&credentials, csrf.as_ref()).await?;

        self.commit(SessionState::Authenticated(principal.clone()));
        tracing::info!(user_id = %principal.id, "Login successful");

        // The backend rotates the token on privilege change.
        self.tokens.fetch().await;
        Ok(principal)
    }

    /// Sign out. Best effort: local state is cleared whatever the backend says.
    pub async fn logout(&self) {
        let csrf = self.tokens.peek();
        if let Err(e) = self.backend.logout(csrf.as_ref()).await {
            tracing::warn!(error = %e, "Logout request failed; clearing local session anyway");
        }
        self.end_session();
        tracing::info!("Logged out");
    }

    /// Clear the token and null the session in one step, so no observer
    /// sees a signed-in state without a token.
    pub(crate) fn end_session(&self) {
        self.state.send_modify(|view| {
            self.tokens.clear();
            view.state = SessionState::Unauthenticated;
        });
        self.epoch.advance();
    }

    /// The backend reported the session gone (401) on a gated call.
    pub(crate) fn expire(&self) {
        if self.view().is_authenticated() {
            tracing::info!("Session expired on the backend");
        }
        self.end_session();
    }

    fn commit(&self, next: SessionState) {
        self.state.send_modify(|view| view.state = next);
        self.epoch.advance();
    }
}

impl<B> std::fmt::Debug for SessionStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state.borrow().state)
            .field("epoch", &self.epoch.current())
            .finish()
    }
}
