/// Errors surfaced by the token, session and LGPD layers.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No response was received (connection refused, timeout, TLS failure).
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error(
        "{operation} failed with status {status}: {}",
        .message.as_deref().unwrap_or("no message")
    )]
    Api {
        operation: &'static str,
        status: u16,
        message: Option<String>,
    },

    /// The backend answered with a payload that does not match the contract.
    #[error("{operation}: malformed response: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },

    /// Rejected locally before any request was issued.
    #[error("{0}")]
    Validation(String),

    /// The operation needs a live session and there is none.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The same operation is already outstanding.
    #[error("{0} already in progress")]
    Busy(&'static str),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// `true` when the failure means the session is gone (401 or no local session).
    ///
    /// A 403 is not included: that is how the backend rejects a stale
    /// anti-forgery token, which leaves the session intact.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Unauthenticated => true,
            Self::Api { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// `true` when no response was received at all.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        #[cfg(feature = "http")]
        if let Self::Http(_) = self {
            return true;
        }
        false
    }

    /// Message to show the user: the backend's own message when it sent one,
    /// the validation text for local rejections, `default` otherwise.
    #[must_use]
    pub fn user_message<'a>(&'a self, default: &'a str) -> &'a str {
        match self {
            Self::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message,
            Self::Validation(message) => message,
            _ => default,
        }
    }
}
