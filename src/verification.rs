//! Email verification link handling and the resend form.

use std::sync::Arc;

use crate::backend::Backend;
use crate::error::Error;
use crate::guard::InFlight;
use crate::notify::{Notice, Notifier};

const TOKEN_MISSING: &str = "Token de verificação não encontrado.";
const VERIFIED: &str = "Email verificado com sucesso!";
const VERIFY_FAILED: &str = "Erro ao verificar email. Tente novamente.";
const EMAIL_REQUIRED: &str = "Por favor, informe seu email.";
const RESEND_SENT: &str = "Email enviado";
const RESEND_SENT_DETAIL: &str =
    "Se o email estiver cadastrado, você receberá um novo link de verificação.";
const RESEND_FAILED: &str = "Erro ao enviar email. Tente novamente.";

/// Result of following a verification link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified { message: String },
    Failed { message: String },
}

impl VerificationOutcome {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Verified { message } | Self::Failed { message } => message,
        }
    }
}

pub struct EmailVerification<B> {
    backend: Arc<B>,
    notifier: Arc<dyn Notifier>,
    resend_flight: InFlight,
}

impl<B: Backend> EmailVerification<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notifier,
            resend_flight: InFlight::new(),
        }
    }

    /// Redeem the token from a verification link.
    ///
    /// A missing or blank token fails without a request.
    pub async fn verify_email(&self, token: Option<&str>) -> VerificationOutcome {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return VerificationOutcome::Failed {
                message: TOKEN_MISSING.to_string(),
            };
        };

        match self.backend.verify_email(token).await {
            Ok(body) => {
                tracing::info!("Email verified");
                VerificationOutcome::Verified {
                    message: body
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| VERIFIED.to_string()),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Email verification failed");
                let message = if e.is_transport() {
                    VERIFY_FAILED
                } else {
                    e.user_message(VERIFY_FAILED)
                };
                VerificationOutcome::Failed {
                    message: message.to_string(),
                }
            }
        }
    }

    /// Ask for a new verification link.
    ///
    /// The acknowledgement is the same whether or not the address is
    /// registered; backend rejections are folded into it. Only a failure to
    /// reach the backend is reported.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a blank email (no request issued),
    /// [`Error::Busy`] while a resend is outstanding, the transport or decode
    /// error otherwise.
    pub async fn resend_verification(&self, email: &str) -> Result<(), Error> {
        let email = email.trim();
        if email.is_empty() {
            self.notifier.notify(Notice::error(EMAIL_REQUIRED));
            return Err(Error::Validation(EMAIL_REQUIRED.into()));
        }
        let _flight = self.resend_flight.try_begin("verification resend")?;

        match self.backend.resend_verification(email).await {
            Ok(()) => {}
            Err(e @ Error::Api { .. }) => {
                tracing::debug!(error = %e, "Resend rejected; acknowledging anyway");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Verification resend failed");
                self.notifier.notify(Notice::error(RESEND_FAILED));
                return Err(e);
            }
        }
        self.notifier
            .notify(Notice::success(RESEND_SENT, RESEND_SENT_DETAIL));
        Ok(())
    }

    #[must_use]
    pub fn is_resend_pending(&self) -> bool {
        self.resend_flight.is_pending()
    }
}
