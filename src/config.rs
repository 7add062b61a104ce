use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Header carrying the anti-forgery token on mutating requests.
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRF-Token";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend endpoint paths, relative to the API base URL.
pub(crate) mod paths {
    pub(crate) const CSRF_TOKEN: &str = "api/auth/csrf-token";
    pub(crate) const ME: &str = "api/auth/me";
    pub(crate) const LOGIN: &str = "api/auth/login";
    pub(crate) const LOGOUT: &str = "api/auth/logout";
    pub(crate) const VERIFY_EMAIL: &str = "api/auth/verify-email";
    pub(crate) const RESEND_VERIFICATION: &str = "api/auth/resend-verification";
    pub(crate) const LGPD_DATA: &str = "api/lgpd/data";
    pub(crate) const CONSENT_HISTORY: &str = "api/lgpd/consent-history";
    pub(crate) const CONSENT: &str = "api/lgpd/consent";
    pub(crate) const DATA_EXPORT: &str = "api/lgpd/data-export";
    pub(crate) const ACCOUNT: &str = "api/lgpd/account";
}

/// Storefront backend client configuration.
///
/// The base URL is the only required field and is a constructor parameter.
///
/// ```rust,ignore
/// use storefront_session::ClientConfig;
///
/// let config = ClientConfig::new("https://loja.example.com".parse()?)
///     .with_csrf_header("X-XSRF-Token")
///     .with_timeout(std::time::Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) csrf_header: String,
    pub(crate) timeout: Duration,
    pub(crate) user_agent: Option<String>,
}

impl ClientConfig {
    /// Create a configuration rooted at `base_url`.
    ///
    /// A trailing slash is added when missing so endpoint paths join under it
    /// instead of replacing its last segment.
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            csrf_header: DEFAULT_CSRF_HEADER.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `STOREFRONT_API_URL`: backend base URL
    ///
    /// # Optional env vars
    /// - `STOREFRONT_CSRF_HEADER`: anti-forgery header name (default `X-CSRF-Token`)
    /// - `STOREFRONT_HTTP_TIMEOUT_SECS`: per-request timeout in seconds (default 30)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or a value does not parse.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("STOREFRONT_API_URL")
            .map_err(|_| Error::Config("STOREFRONT_API_URL is required".into()))?;
        let base_url: Url = base_url
            .parse()
            .map_err(|e| Error::Config(format!("STOREFRONT_API_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Ok(header) = std::env::var("STOREFRONT_CSRF_HEADER") {
            let header = header.trim();
            if header.is_empty() {
                return Err(Error::Config("STOREFRONT_CSRF_HEADER is empty".into()));
            }
            config = config.with_csrf_header(header);
        }
        if let Ok(secs) = std::env::var("STOREFRONT_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("STOREFRONT_HTTP_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_csrf_header(mut self, name: impl Into<String>) -> Self {
        self.csrf_header = name.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// API base URL (always ends with `/`).
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Anti-forgery header name.
    #[must_use]
    pub fn csrf_header(&self) -> &str {
        &self.csrf_header
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Resolve an endpoint path against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid endpoint {path}: {e}")))
    }
}
