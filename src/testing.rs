//! Scripted in-memory backend for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use time::OffsetDateTime;
use tokio::sync::Notify;

use crate::backend::{ApiMessage, Backend};
use crate::error::Error;
use crate::lgpd::{
    ConsentHistoryEntry, ConsentKind, ConsentPatch, ConsentRecord, DataExportRequest,
    DeletionMode, DeletionRequest, ExportRequestId, ExportStatus, LgpdData, LgpdUser,
};
use crate::types::{Credentials, CsrfToken, IdentityProbe, Principal, Role, UserId};

pub(crate) const USERNAME: &str = "user@example.com";
pub(crate) const PASSWORD: &str = "correct-pw";
pub(crate) const VALID_EMAIL_TOKEN: &str = "good-token";

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub op: &'static str,
    pub csrf: Option<String>,
}

struct MockState {
    calls: Vec<Call>,
    csrf_issued: u64,
    csrf_fails: bool,
    logout_fails: bool,
    account: Principal,
    signed_in: bool,
    probe_override: Option<IdentityProbe>,
    consents: ConsentRecord,
    history: Vec<ConsentHistoryEntry>,
    exports: Vec<DataExportRequest>,
    failures: HashMap<&'static str, (u16, Option<String>)>,
    removed: Option<DeletionMode>,
}

/// Models the storefront backend: a single account, a cookie session that is
/// either present or not, and per-endpoint failure injection.
pub(crate) struct MockBackend {
    state: Mutex<MockState>,
    holds: Mutex<HashMap<&'static str, Arc<Notify>>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                calls: Vec::new(),
                csrf_issued: 0,
                csrf_fails: false,
                logout_fails: false,
                account: Principal::new(UserId(1), USERNAME, Role::Customer),
                signed_in: false,
                probe_override: None,
                consents: ConsentRecord::default(),
                history: Vec::new(),
                exports: Vec::new(),
                failures: HashMap::new(),
                removed: None,
            }),
            holds: Mutex::new(HashMap::new()),
        }
    }

    /// Start with a live cookie session.
    pub(crate) fn signed_in(self) -> Self {
        self.state.lock().signed_in = true;
        self
    }

    pub(crate) fn with_role(self, role: Role) -> Self {
        self.state.lock().account.role = role;
        self
    }

    pub(crate) fn fail_csrf(&self, fail: bool) {
        self.state.lock().csrf_fails = fail;
    }

    pub(crate) fn fail_logout(&self, fail: bool) {
        self.state.lock().logout_fails = fail;
    }

    /// Answer the identity probe with this payload instead of the session.
    pub(crate) fn probe_returns(&self, probe: IdentityProbe) {
        self.state.lock().probe_override = Some(probe);
    }

    /// Make every later call to `op` fail with `status`.
    pub(crate) fn fail(&self, op: &'static str, status: u16, message: Option<&str>) {
        self.state
            .lock()
            .failures
            .insert(op, (status, message.map(str::to_owned)));
    }

    pub(crate) fn recover(&self, op: &'static str) {
        self.state.lock().failures.remove(op);
    }

    /// Expire the server-side session.
    pub(crate) fn expire_session(&self) {
        self.state.lock().signed_in = false;
    }

    /// Park the next call to `op` until the returned handle is notified.
    pub(crate) fn hold(&self, op: &'static str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds.lock().insert(op, notify.clone());
        notify
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub(crate) fn ops(&self) -> Vec<&'static str> {
        self.state.lock().calls.iter().map(|c| c.op).collect()
    }

    pub(crate) fn count(&self, op: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.op == op).count()
    }

    pub(crate) fn last_call(&self, op: &str) -> Option<Call> {
        self.state
            .lock()
            .calls
            .iter()
            .rev()
            .find(|c| c.op == op)
            .cloned()
    }

    pub(crate) fn export_count(&self) -> usize {
        self.state.lock().exports.len()
    }

    pub(crate) fn removed(&self) -> Option<DeletionMode> {
        self.state.lock().removed
    }

    /// Push a backend-side status change to an export job.
    pub(crate) fn set_export_status(&self, id: i64, status: ExportStatus) {
        let mut state = self.state.lock();
        if let Some(request) = state
            .exports
            .iter_mut()
            .find(|r| r.id == ExportRequestId(id))
        {
            request.status = status;
            if status == ExportStatus::Completed {
                *request = request
                    .clone()
                    .with_download_url(format!("https://cdn.example.com/exports/{id}.zip"));
            }
        }
    }

    async fn enter(&self, op: &'static str, csrf: Option<&CsrfToken>) -> Result<(), Error> {
        self.state.lock().calls.push(Call {
            op,
            csrf: csrf.map(|t| t.as_str().to_owned()),
        });
        let hold = self.holds.lock().remove(op);
        if let Some(hold) = hold {
            hold.notified().await;
        }
        let failure = self.state.lock().failures.get(op).cloned();
        match failure {
            Some((status, message)) => Err(Error::Api {
                operation: op,
                status,
                message,
            }),
            None => Ok(()),
        }
    }

    fn require_session(&self, op: &'static str) -> Result<(), Error> {
        if self.state.lock().signed_in {
            Ok(())
        } else {
            Err(Error::Api {
                operation: op,
                status: 401,
                message: Some("Não autenticado".into()),
            })
        }
    }
}

fn describe(patch: &ConsentPatch) -> String {
    ConsentKind::ALL
        .iter()
        .filter_map(|kind| {
            let value = match kind {
                ConsentKind::Marketing => patch.consent_marketing,
                ConsentKind::Terms => patch.consent_terms,
                ConsentKind::Privacy => patch.consent_privacy,
            }?;
            Some(format!("{kind:?}={value}"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl Backend for MockBackend {
    async fn fetch_csrf_token(&self) -> Result<CsrfToken, Error> {
        self.enter("csrf-token", None).await?;
        let mut state = self.state.lock();
        if state.csrf_fails {
            return Err(Error::Api {
                operation: "csrf-token",
                status: 503,
                message: None,
            });
        }
        state.csrf_issued += 1;
        Ok(CsrfToken::new(format!("csrf-{}", state.csrf_issued)))
    }

    async fn me(&self) -> Result<IdentityProbe, Error> {
        self.enter("me", None).await?;
        let state = self.state.lock();
        if let Some(probe) = &state.probe_override {
            return Ok(probe.clone());
        }
        if state.signed_in {
            Ok(state.account.clone().into())
        } else {
            Err(Error::Api {
                operation: "me",
                status: 401,
                message: Some("Não autenticado".into()),
            })
        }
    }

    async fn login(
        &self,
        credentials: &Credentials,
        csrf: Option<&CsrfToken>,
    ) -> Result<Principal, Error> {
        self.enter("login", csrf).await?;
        let mut state = self.state.lock();
        if credentials.username() == state.account.username && credentials.password() == PASSWORD
        {
            state.signed_in = true;
            Ok(state.account.clone())
        } else {
            Err(Error::Api {
                operation: "login",
                status: 401,
                message: Some("Credenciais inválidas".into()),
            })
        }
    }

    async fn logout(&self, csrf: Option<&CsrfToken>) -> Result<(), Error> {
        self.enter("logout", csrf).await?;
        let mut state = self.state.lock();
        if state.logout_fails {
            return Err(Error::Api {
                operation: "logout",
                status: 502,
                message: None,
            });
        }
        state.signed_in = false;
        Ok(())
    }

    async fn verify_email(&self, token: &str) -> Result<ApiMessage, Error> {
        self.enter("verify-email", None).await?;
        if token == VALID_EMAIL_TOKEN {
            Ok(ApiMessage {
                message: Some("Email verificado com sucesso!".into()),
            })
        } else {
            Err(Error::Api {
                operation: "verify-email",
                status: 400,
                message: Some("Token inválido ou expirado.".into()),
            })
        }
    }

    async fn resend_verification(&self, _email: &str) -> Result<(), Error> {
        self.enter("resend-verification", None).await
    }

    async fn lgpd_data(&self) -> Result<LgpdData, Error> {
        self.enter("lgpd-data", None).await?;
        self.require_session("lgpd-data")?;
        let state = self.state.lock();
        let account = &state.account;
        let mut user = LgpdUser::new(
            account.id,
            account.username.clone(),
            account.role,
            OffsetDateTime::UNIX_EPOCH,
        );
        user.email_verified = true;
        let mut data = LgpdData::new(user, state.consents);
        data.data_export_requests = state.exports.clone();
        Ok(data)
    }

    async fn consent_history(&self) -> Result<Vec<ConsentHistoryEntry>, Error> {
        self.enter("consent-history", None).await?;
        self.require_session("consent-history")?;
        Ok(self.state.lock().history.clone())
    }

    async fn update_consent(
        &self,
        patch: &ConsentPatch,
        csrf: Option<&CsrfToken>,
    ) -> Result<ConsentRecord, Error> {
        self.enter("consent", csrf).await?;
        self.require_session("consent")?;
        let mut state = self.state.lock();
        state.consents.apply(patch);
        state.history.insert(
            0,
            ConsentHistoryEntry {
                changed_at: OffsetDateTime::now_utc(),
                description: describe(patch),
            },
        );
        Ok(state.consents)
    }

    async fn request_data_export(
        &self,
        csrf: Option<&CsrfToken>,
    ) -> Result<DataExportRequest, Error> {
        self.enter("data-export", csrf).await?;
        self.require_session("data-export")?;
        let mut state = self.state.lock();
        let id = state.exports.len() as i64 + 1;
        let request = DataExportRequest::new(
            ExportRequestId(id),
            ExportStatus::Pending,
            OffsetDateTime::now_utc(),
        );
        state.exports.push(request.clone());
        Ok(request)
    }

    async fn delete_account(
        &self,
        request: &DeletionRequest,
        csrf: Option<&CsrfToken>,
    ) -> Result<(), Error> {
        self.enter("account", csrf).await?;
        self.require_session("account")?;
        let mut state = self.state.lock();
        if request.password() != PASSWORD {
            return Err(Error::Api {
                operation: "account",
                status: 400,
                message: Some("Senha incorreta".into()),
            });
        }
        state.signed_in = false;
        state.removed = Some(request.mode());
        Ok(())
    }
}
