use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use super::deletion::{AccountDeletionIntent, PASSWORD_REQUIRED};
use super::types::{
    ConsentHistoryEntry, ConsentKind, ConsentPatch, ConsentRecord, DataExportRequest,
    DeletionMode, LgpdData,
};
use crate::backend::Backend;
use crate::csrf::TokenCache;
use crate::epoch::Epoch;
use crate::error::Error;
use crate::guard::InFlight;
use crate::notify::{Notice, Notifier};
use crate::session::{AuthScope, SessionStore};
use crate::types::Route;

const CONSENT_UPDATED: &str = "Preferências atualizadas";
const CONSENT_UPDATED_DETAIL: &str = "Suas preferências de privacidade foram salvas.";
const CONSENT_FAILED: &str = "Não foi possível atualizar suas preferências.";
const EXPORT_REQUESTED: &str = "Solicitação enviada";
const EXPORT_REQUESTED_DETAIL: &str = "Sua solicitação de exportação de dados foi registrada. \
     Você receberá um email quando estiver pronta.";
const EXPORT_FAILED: &str = "Não foi possível solicitar a exportação de dados.";
const ACCOUNT_ANONYMIZED: &str = "Conta anonimizada";
const ACCOUNT_DELETED: &str = "Conta excluída";
const ACCOUNT_REMOVED_DETAIL: &str = "Sua solicitação foi processada com sucesso.";
const ACCOUNT_REMOVAL_FAILED: &str = "Falha ao excluir conta";

/// What the privacy dashboard should render right now.
#[derive(Debug, Clone)]
pub enum Gate {
    /// The startup probe has not settled; show a loader, do not redirect.
    Loading,
    /// No session; navigate away.
    Redirect(Route),
    /// Signed in; use the scope for every call.
    Ready(AuthScope),
}

/// Successful account removal.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct AccountRemoval {
    pub mode: DeletionMode,
    pub redirect: Route,
}

struct Cached<T> {
    generation: u64,
    value: T,
}

#[derive(Default)]
struct QueryCache {
    data: Option<Cached<LgpdData>>,
    history: Option<Cached<Vec<ConsentHistoryEntry>>>,
}

fn data_slot(cache: &mut QueryCache) -> &mut Option<Cached<LgpdData>> {
    &mut cache.data
}

fn history_slot(cache: &mut QueryCache) -> &mut Option<Cached<Vec<ConsentHistoryEntry>>> {
    &mut cache.history
}

/// LGPD consent and data-rights operations.
///
/// Reads are cached per session and never optimistically patched: every
/// successful write invalidates the views it affects, and a read that
/// overlapped a write is issued again. Nothing here retries a failed call.
pub struct ConsentWorkflow<B> {
    backend: Arc<B>,
    tokens: Arc<TokenCache<B>>,
    session: Arc<SessionStore<B>>,
    notifier: Arc<dyn Notifier>,
    cache: Mutex<QueryCache>,
    invalidations: Epoch,
    consent_flight: InFlight,
    export_flight: InFlight,
    deletion_flight: InFlight,
}

impl<B: Backend> ConsentWorkflow<B> {
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        tokens: Arc<TokenCache<B>>,
        session: Arc<SessionStore<B>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            backend,
            tokens,
            session,
            notifier,
            cache: Mutex::new(QueryCache::default()),
            invalidations: Epoch::new(),
            consent_flight: InFlight::new(),
            export_flight: InFlight::new(),
            deletion_flight: InFlight::new(),
        }
    }

    /// Route guard for the privacy dashboard.
    #[must_use]
    pub fn gate(&self) -> Gate {
        if self.session.view().is_loading() {
            return Gate::Loading;
        }
        match self.session.scope() {
            Ok(scope) => Gate::Ready(scope),
            Err(_) => Gate::Redirect(Route::login()),
        }
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// User record, consents, orders and export requests.
    ///
    /// # Errors
    ///
    /// [`Error::Unauthenticated`] if the scope is stale or the backend says the
    /// session expired (the session is torn down); the backend error otherwise.
    pub async fn data(&self, scope: &AuthScope) -> Result<LgpdData, Error> {
        self.read(scope, "privacy data read", data_slot, move || {
            self.backend.lgpd_data()
        })
        .await
    }

    /// Consent flags from the data snapshot.
    ///
    /// # Errors
    ///
    /// Same as [`data`](Self::data).
    pub async fn consents(&self, scope: &AuthScope) -> Result<ConsentRecord, Error> {
        Ok(self.data(scope).await?.consents())
    }

    /// Export jobs as the backend currently reports them. Not polled.
    ///
    /// # Errors
    ///
    /// Same as [`data`](Self::data).
    pub async fn export_requests(
        &self,
        scope: &AuthScope,
    ) -> Result<Vec<DataExportRequest>, Error> {
        Ok(self.data(scope).await?.data_export_requests)
    }

    /// Full consent history, in backend order (newest first).
    ///
    /// # Errors
    ///
    /// Same as [`data`](Self::data).
    pub async fn history(&self, scope: &AuthScope) -> Result<Vec<ConsentHistoryEntry>, Error> {
        self.read(scope, "consent history read", history_slot, move || {
            self.backend.consent_history()
        })
        .await
    }

    /// The newest `limit` history entries.
    ///
    /// # Errors
    ///
    /// Same as [`data`](Self::data).
    pub async fn recent_history(
        &self,
        scope: &AuthScope,
        limit: usize,
    ) -> Result<Vec<ConsentHistoryEntry>, Error> {
        let mut history = self.history(scope).await?;
        history.truncate(limit);
        Ok(history)
    }

    async fn read<T, F, Fut>(
        &self,
        scope: &AuthScope,
        operation: &'static str,
        slot: fn(&mut QueryCache) -> &mut Option<Cached<T>>,
        fetch: F,
    ) -> Result<T, Error>
    where
        T: Clone,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        loop {
            scope.ensure_current()?;

            let hit = slot(&mut self.cache.lock())
                .as_ref()
                .filter(|cached| cached.generation == scope.generation())
                .map(|cached| cached.value.clone());
            if let Some(value) = hit {
                return Ok(value);
            }

            let ticket = self.invalidations.ticket();
            let value = match fetch().await {
                Ok(value) => value,
                Err(e) => return Err(self.read_failed(e, operation)),
            };

            if !scope.is_current() {
                tracing::debug!(operation, "Discarding read for a session that has ended");
                return Err(Error::Unauthenticated);
            }
            if ticket.is_current() {
                *slot(&mut self.cache.lock()) = Some(Cached {
                    generation: scope.generation(),
                    value: value.clone(),
                });
                return Ok(value);
            }
            tracing::debug!(operation, "Read overlapped a confirmed write; reading again");
        }
    }

    fn read_failed(&self, error: Error, operation: &'static str) -> Error {
        tracing::warn!(operation, error = %error, "LGPD read failed");
        if error.is_unauthorized() {
            self.session.expire();
            self.invalidate();
            return Error::Unauthenticated;
        }
        error
    }

    // ── Writes ─────────────────────────────────────────────────────────

    /// Change one or more consent flags.
    ///
    /// The returned record is the backend's; cached reads are invalidated
    /// rather than patched because the backend also appends a history entry.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an empty patch (no request issued),
    /// [`Error::Busy`] while another update is outstanding,
    /// [`Error::Unauthenticated`] for a stale scope or expired session,
    /// the backend error otherwise. Failures are also sent to the notifier.
    pub async fn update_consent(
        &self,
        scope: &AuthScope,
        patch: ConsentPatch,
    ) -> Result<ConsentRecord, Error> {
        if patch.is_empty() {
            return Err(Error::Validation("consent patch sets no flag".into()));
        }
        scope.ensure_current()?;
        let _flight = self.consent_flight.try_begin("consent update")?;

        let csrf = self.tokens.ensure().await;
        match self.backend.update_consent(&patch, csrf.as_ref()).await {
            Ok(record) => {
                self.invalidate();
                self.notifier
                    .notify(Notice::success(CONSENT_UPDATED, CONSENT_UPDATED_DETAIL));
                Ok(record)
            }
            Err(e) => Err(self.write_failed(e, "consent update", CONSENT_FAILED)),
        }
    }

    /// Toggle a single consent flag.
    ///
    /// # Errors
    ///
    /// Same as [`update_consent`](Self::update_consent).
    pub async fn set_consent(
        &self,
        scope: &AuthScope,
        kind: ConsentKind,
        value: bool,
    ) -> Result<ConsentRecord, Error> {
        self.update_consent(scope, ConsentPatch::single(kind, value))
            .await
    }

    /// File a new data export job; it starts `pending`.
    ///
    /// Every call creates a new job, even while an earlier one is still
    /// pending. The backend emails the user when the job finishes.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] while another request is outstanding,
    /// [`Error::Unauthenticated`] for a stale scope or expired session,
    /// the backend error otherwise. Failures are also sent to the notifier.
    pub async fn request_export(&self, scope: &AuthScope) -> Result<DataExportRequest, Error> {
        scope.ensure_current()?;
        let _flight = self.export_flight.try_begin("export request")?;

        let csrf = self.tokens.ensure().await;
        match self.backend.request_data_export(csrf.as_ref()).await {
            Ok(request) => {
                self.invalidate_data();
                self.notifier
                    .notify(Notice::success(EXPORT_REQUESTED, EXPORT_REQUESTED_DETAIL));
                tracing::info!(export_id = %request.id, "Data export requested");
                Ok(request)
            }
            Err(e) => Err(self.write_failed(e, "export request", EXPORT_FAILED)),
        }
    }

    /// Anonymize or delete the account, then end the local session.
    ///
    /// An empty password is rejected before anything else, with a notice and
    /// no request. Otherwise the password is cleared from `intent` whatever
    /// the outcome, and every failure is also sent to the notifier.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an empty password,
    /// [`Error::Busy`] while another removal is outstanding,
    /// [`Error::Unauthenticated`] for a stale scope or expired session,
    /// the backend error (e.g. wrong password) otherwise.
    pub async fn delete_account(
        &self,
        scope: &AuthScope,
        intent: &mut AccountDeletionIntent,
    ) -> Result<AccountRemoval, Error> {
        if !intent.has_password() {
            self.notifier.notify(Notice::error(PASSWORD_REQUIRED));
            return Err(Error::Validation(PASSWORD_REQUIRED.into()));
        }
        let request = intent.take_request()?;
        if let Err(e) = scope.ensure_current() {
            return Err(self.reject(e, "account removal", ACCOUNT_REMOVAL_FAILED));
        }
        let _flight = match self.deletion_flight.try_begin("account removal") {
            Ok(flight) => flight,
            Err(e) => return Err(self.reject(e, "account removal", ACCOUNT_REMOVAL_FAILED)),
        };

        let csrf = self.tokens.ensure().await;
        match self.backend.delete_account(&request, csrf.as_ref()).await {
            Ok(()) => {
                let mode = request.mode();
                self.session.end_session();
                self.invalidate();
                let title = match mode {
                    DeletionMode::Anonymize => ACCOUNT_ANONYMIZED,
                    DeletionMode::Delete => ACCOUNT_DELETED,
                };
                self.notifier
                    .notify(Notice::success(title, ACCOUNT_REMOVED_DETAIL));
                tracing::info!(user_id = %scope.principal().id, ?mode, "Account removed");
                Ok(AccountRemoval {
                    mode,
                    redirect: Route::Landing,
                })
            }
            Err(e) => Err(self.write_failed(e, "account removal", ACCOUNT_REMOVAL_FAILED)),
        }
    }

    /// Local refusal before any request: notify, leave the session alone.
    fn reject(&self, error: Error, operation: &'static str, fallback: &str) -> Error {
        tracing::debug!(operation, error = %error, "LGPD request refused locally");
        self.notifier
            .notify(Notice::error(error.user_message(fallback)));
        error
    }

    fn write_failed(&self, error: Error, operation: &'static str, fallback: &str) -> Error {
        tracing::warn!(operation, error = %error, "LGPD request failed");
        self.notifier
            .notify(Notice::error(error.user_message(fallback)));
        if error.is_unauthorized() {
            self.session.expire();
            self.invalidate();
            return Error::Unauthenticated;
        }
        error
    }

    // ── Cache ──────────────────────────────────────────────────────────

    /// Drop every cached view; the next read goes to the backend.
    pub fn invalidate(&self) {
        self.invalidations.advance();
        let mut cache = self.cache.lock();
        cache.data = None;
        cache.history = None;
    }

    fn invalidate_data(&self) {
        self.invalidations.advance();
        self.cache.lock().data = None;
    }

    #[must_use]
    pub fn is_consent_update_pending(&self) -> bool {
        self.consent_flight.is_pending()
    }

    #[must_use]
    pub fn is_export_pending(&self) -> bool {
        self.export_flight.is_pending()
    }

    #[must_use]
    pub fn is_deletion_pending(&self) -> bool {
        self.deletion_flight.is_pending()
    }
}
