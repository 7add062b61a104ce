//! The backend contract consumed by the session and LGPD layers.
//!
//! Every call crosses a credential-bearing channel: the cookie session is
//! implicit, the anti-forgery token is passed explicitly to mutating calls
//! and may be absent.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpBackend;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::lgpd::{
    ConsentHistoryEntry, ConsentPatch, ConsentRecord, DataExportRequest, DeletionRequest,
    LgpdData,
};
use crate::types::{Credentials, CsrfToken, IdentityProbe, Principal};

/// `{ message }` body used by the email verification endpoints and by
/// error responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}

/// Storefront backend.
///
/// [`HttpBackend`] is the production implementation; tests and embedders can
/// supply their own.
///
/// Non-success responses map to [`Error::Api`] carrying the backend's
/// `message`, so the caller decides what is fatal.
pub trait Backend: Send + Sync + 'static {
    /// `GET /api/auth/csrf-token`
    fn fetch_csrf_token(&self) -> impl Future<Output = Result<CsrfToken, Error>> + Send;

    /// `GET /api/auth/me`
    fn me(&self) -> impl Future<Output = Result<IdentityProbe, Error>> + Send;

    /// `POST /api/auth/login`
    fn login(
        &self,
        credentials: &Credentials,
        csrf: Option<&CsrfToken>,
    ) -> impl Future<Output = Result<Principal, Error>> + Send;

    /// `POST /api/auth/logout`
    fn logout(&self, csrf: Option<&CsrfToken>) -> impl Future<Output = Result<(), Error>> + Send;

    /// `GET /api/auth/verify-email?token=`
    fn verify_email(&self, token: &str) -> impl Future<Output = Result<ApiMessage, Error>> + Send;

    /// `POST /api/auth/resend-verification`
    fn resend_verification(&self, email: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// `GET /api/lgpd/data`
    fn lgpd_data(&self) -> impl Future<Output = Result<LgpdData, Error>> + Send;

    /// `GET /api/lgpd/consent-history`
    fn consent_history(
        &self,
    ) -> impl Future<Output = Result<Vec<ConsentHistoryEntry>, Error>> + Send;

    /// `PATCH /api/lgpd/consent`
    fn update_consent(
        &self,
        patch: &ConsentPatch,
        csrf: Option<&CsrfToken>,
    ) -> impl Future<Output = Result<ConsentRecord, Error>> + Send;

    /// `POST /api/lgpd/data-export`
    fn request_data_export(
        &self,
        csrf: Option<&CsrfToken>,
    ) -> impl Future<Output = Result<DataExportRequest, Error>> + Send;

    /// `DELETE /api/lgpd/account`
    fn delete_account(
        &self,
        request: &DeletionRequest,
        csrf: Option<&CsrfToken>,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}
