use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{ApiMessage, Backend};
use crate::config::{ClientConfig, paths};
use crate::error::Error;
use crate::lgpd::{
    ConsentHistoryEntry, ConsentPatch, ConsentRecord, DataExportRequest, DeletionRequest,
    LgpdData,
};
use crate::types::{Credentials, CsrfToken, IdentityProbe, Principal};

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsrfTokenResponse {
    csrf_token: CsrfToken,
}

/// reqwest-backed [`Backend`].
///
/// The client keeps a cookie store, so the session cookie set by login rides
/// along on every later call.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    config: ClientConfig,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Build a backend with its own cookie-holding HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the TLS backend cannot be initialised.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        Ok(Self {
            http: builder.build()?,
            config,
        })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    ///
    /// The client must have a cookie store or the session will not persist.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, Error> {
        Ok(self.http.get(self.config.endpoint(path)?))
    }

    fn mutate(
        &self,
        method: reqwest::Method,
        path: &str,
        csrf: Option<&CsrfToken>,
    ) -> Result<RequestBuilder, Error> {
        let request = self.http.request(method, self.config.endpoint(path)?);
        Ok(match csrf {
            Some(token) => request.header(self.config.csrf_header.as_str(), token.as_str()),
            None => request,
        })
    }

    /// Checks HTTP response status; returns the response on success or an
    /// error carrying the backend's `message`.
    async fn ensure_success(
        response: Response,
        operation: &'static str,
    ) -> Result<Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .ok()
            .and_then(|m| m.message);
        tracing::debug!(operation, status, "Backend rejected request");
        Err(Error::Api {
            operation,
            status,
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
        operation: &'static str,
    ) -> Result<T, Error> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Decode {
            operation,
            detail: e.to_string(),
        })
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<T, Error> {
        let response = Self::ensure_success(request.send().await?, operation).await?;
        Self::decode(response, operation).await
    }

    async fn fetch_empty(&self, request: RequestBuilder, operation: &'static str) -> Result<(), Error> {
        Self::ensure_success(request.send().await?, operation).await?;
        Ok(())
    }
}

impl Backend for HttpBackend {
    async fn fetch_csrf_token(&self) -> Result<CsrfToken, Error> {
        let body: CsrfTokenResponse = self
            .fetch_json(self.get(paths::CSRF_TOKEN)?, "csrf token fetch")
            .await?;
        Ok(body.csrf_token)
    }

    async fn me(&self) -> Result<IdentityProbe, Error> {
        self.fetch_json(self.get(paths::ME)?, "identity probe").await
    }

    async fn login(
        &self,
        credentials: &Credentials,
        csrf: Option<&CsrfToken>,
    ) -> Result<Principal, Error> {
        let request = self
            .mutate(reqwest::Method::POST, paths::LOGIN, csrf)?
            .json(credentials);
        self.fetch_json(request, "login").await
    }

    async fn logout(&self, csrf: Option<&CsrfToken>) -> Result<(), Error> {
        let request = self.mutate(reqwest::Method::POST, paths::LOGOUT, csrf)?;
        self.fetch_empty(request, "logout").await
    }

    async fn verify_email(&self, token: &str) -> Result<ApiMessage, Error> {
        let mut url = self.config.endpoint(paths::VERIFY_EMAIL)?;
        url.query_pairs_mut().append_pair("token", token);
        self.fetch_json(self.http.get(url), "email verification").await
    }

    async fn resend_verification(&self, email: &str) -> Result<(), Error> {
        let request = self
            .mutate(reqwest::Method::POST, paths::RESEND_VERIFICATION, None)?
            .json(&json!({ "email": email }));
        self.fetch_empty(request, "verification resend").await
    }

    async fn lgpd_data(&self) -> Result<LgpdData, Error> {
        self.fetch_json(self.get(paths::LGPD_DATA)?, "privacy data read")
            .await
    }

    async fn consent_history(&self) -> Result<Vec<ConsentHistoryEntry>, Error> {
        self.fetch_json(self.get(paths::CONSENT_HISTORY)?, "consent history read")
            .await
    }

    async fn update_consent(
        &self,
        patch: &ConsentPatch,
        csrf: Option<&CsrfToken>,
    ) -> Result<ConsentRecord, Error> {
        let request = self
            .mutate(reqwest::Method::PATCH, paths::CONSENT, csrf)?
            .json(patch);
        self.fetch_json(request, "consent update").await
    }

    async fn request_data_export(
        &self,
        csrf: Option<&CsrfToken>,
    ) -> Result<DataExportRequest, Error> {
        let request = self.mutate(reqwest::Method::POST, paths::DATA_EXPORT, csrf)?;
        self.fetch_json(request, "export request").await
    }

    async fn delete_account(
        &self,
        request: &DeletionRequest,
        csrf: Option<&CsrfToken>,
    ) -> Result<(), Error> {
        let call = self
            .mutate(reqwest::Method::DELETE, paths::ACCOUNT, csrf)?
            .json(request);
        self.fetch_empty(call, "account removal").await
    }
}
