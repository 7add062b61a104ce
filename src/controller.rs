use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::csrf::TokenCache;
use crate::lgpd::ConsentWorkflow;
use crate::notify::{Notice, Notifier};
use crate::session::{SessionStore, SessionView};
use crate::types::Route;
use crate::verification::EmailVerification;

const LOGGED_OUT: &str = "Até logo!";
const LOGGED_OUT_DETAIL: &str = "Você foi desconectado com sucesso.";

/// Application root: owns the token cache, the session store and the LGPD
/// workflow, and runs the startup sequence.
///
/// Create one per application and share it; nothing in this crate is global.
pub struct Storefront<B> {
    tokens: Arc<TokenCache<B>>,
    session: Arc<SessionStore<B>>,
    lgpd: ConsentWorkflow<B>,
    verification: EmailVerification<B>,
    notifier: Arc<dyn Notifier>,
}

impl<B: Backend> Storefront<B> {
    #[must_use]
    pub fn new(backend: B, notifier: impl Notifier) -> Self {
        Self::with_shared(Arc::new(backend), Arc::new(notifier))
    }

    /// Build from an already shared backend and notifier.
    #[must_use]
    pub fn with_shared(backend: Arc<B>, notifier: Arc<dyn Notifier>) -> Self {
        let tokens = Arc::new(TokenCache::new(backend.clone()));
        let session = Arc::new(SessionStore::new(backend.clone(), tokens.clone()));
        let lgpd = ConsentWorkflow::new(
            backend.clone(),
            tokens.clone(),
            session.clone(),
            notifier.clone(),
        );
        let verification = EmailVerification::new(backend, notifier.clone());
        Self {
            tokens,
            session,
            lgpd,
            verification,
            notifier,
        }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenCache<B> {
        &self.tokens
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore<B> {
        &self.session
    }

    #[must_use]
    pub fn lgpd(&self) -> &ConsentWorkflow<B> {
        &self.lgpd
    }

    #[must_use]
    pub fn verification(&self) -> &EmailVerification<B> {
        &self.verification
    }

    /// Fetch the anti-forgery token, then resolve the session.
    pub async fn start(&self) -> SessionView {
        let view = self.session.initialize().await;
        tracing::debug!(authenticated = view.is_authenticated(), "Startup complete");
        view
    }

    /// Run [`start`](Self::start) as its own task.
    pub fn spawn_start(self: &Arc<Self>) -> JoinHandle<SessionView> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.start().await })
    }

    /// Sign out, drop every cached privacy view, and say goodbye.
    ///
    /// Always succeeds locally; returns where to navigate next.
    pub async fn logout(&self) -> Route {
        self.session.logout().await;
        self.lgpd.invalidate();
        self.notifier
            .notify(Notice::success(LOGGED_OUT, LOGGED_OUT_DETAIL));
        Route::login()
    }
}

#[cfg(feature = "http")]
impl Storefront<crate::backend::HttpBackend> {
    /// Wire everything to the HTTP backend at `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the HTTP client cannot be built.
    pub fn connect(
        config: crate::config::ClientConfig,
        notifier: impl Notifier,
    ) -> Result<Self, crate::Error> {
        let backend = crate::backend::HttpBackend::new(config)?;
        Ok(Self::new(backend, notifier))
    }

    /// [`connect`](Self::connect) with configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for missing or invalid
    /// variables.
    pub fn from_env(notifier: impl Notifier) -> Result<Self, crate::Error> {
        Self::connect(crate::config::ClientConfig::from_env()?, notifier)
    }
}

impl<B> std::fmt::Debug for Storefront<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("tokens", &self.tokens)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
