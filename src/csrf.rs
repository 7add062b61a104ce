use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::Backend;
use crate::types::CsrfToken;

/// Holds the current anti-forgery token.
///
/// One instance per [`Storefront`](crate::Storefront); every call site that
/// issues a mutating request receives it explicitly. At most one token is
/// current; a rejected stale token is never retried from here.
pub struct TokenCache<B> {
    backend: Arc<B>,
    current: Mutex<Option<CsrfToken>>,
}

impl<B: Backend> TokenCache<B> {
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            current: Mutex::new(None),
        }
    }

    /// Fetch a fresh token and cache it.
    ///
    /// Never fails: an expired session is a normal state, so transport and
    /// status errors are logged and reported as `None`, meaning "proceed
    /// without a token". A failed fetch leaves any cached token in place.
    pub async fn fetch(&self) -> Option<CsrfToken> {
        match self.backend.fetch_csrf_token().await {
            Ok(token) => {
                *self.current.lock() = Some(token.clone());
                Some(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch anti-forgery token");
                None
            }
        }
    }

    /// The cached token, without touching the network.
    #[must_use]
    pub fn peek(&self) -> Option<CsrfToken> {
        self.current.lock().clone()
    }

    /// Drop the cached token so it cannot be replayed.
    pub fn clear(&self) {
        self.current.lock().take();
    }

    /// The cached token, fetching one only when none is cached.
    ///
    /// Two concurrent calls on an empty cache may both fetch; the later
    /// response wins. The fetch is idempotent on the backend.
    pub async fn ensure(&self) -> Option<CsrfToken> {
        if let Some(token) = self.peek() {
            return Some(token);
        }
        self.fetch().await
    }
}

impl<B> std::fmt::Debug for TokenCache<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("cached", &self.current.lock().is_some())
            .finish()
    }
}
