use serde::Serialize;

use super::types::DeletionMode;
use crate::error::Error;

pub(crate) const PASSWORD_REQUIRED: &str = "Por favor, digite sua senha para confirmar.";

/// The user's pending account-removal choice.
///
/// The mode is fixed at construction, before the confirmation dialog opens,
/// so a request can never go out with an undecided mode. The password is
/// consumed by the request: whatever the outcome, it is cleared once sent.
#[derive(Clone)]
pub struct AccountDeletionIntent {
    mode: DeletionMode,
    password: String,
}

impl AccountDeletionIntent {
    #[must_use]
    pub fn new(mode: DeletionMode) -> Self {
        Self {
            mode,
            password: String::new(),
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    #[must_use]
    pub fn mode(&self) -> DeletionMode {
        self.mode
    }

    #[must_use]
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Take the request body out of the intent, leaving the password empty.
    pub(crate) fn take_request(&mut self) -> Result<DeletionRequest, Error> {
        if self.password.is_empty() {
            return Err(Error::Validation(PASSWORD_REQUIRED.into()));
        }
        Ok(DeletionRequest {
            password: std::mem::take(&mut self.password),
            mode: self.mode,
        })
    }
}

impl std::fmt::Debug for AccountDeletionIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountDeletionIntent")
            .field("mode", &self.mode)
            .field("has_password", &self.has_password())
            .finish()
    }
}

/// Body of `DELETE /api/lgpd/account`. Only obtainable from an
/// [`AccountDeletionIntent`] with a non-empty password.
#[derive(Clone, Serialize)]
pub struct DeletionRequest {
    password: String,
    mode: DeletionMode,
}

impl DeletionRequest {
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn mode(&self) -> DeletionMode {
        self.mode
    }
}

impl std::fmt::Debug for DeletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionRequest")
            .field("mode", &self.mode)
            .field("password", &"***")
            .finish()
    }
}
