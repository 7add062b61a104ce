use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Role, UserId};

/// The three LGPD consent flags held for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    #[serde(default)]
    pub consent_marketing: bool,
    #[serde(default)]
    pub consent_terms: bool,
    #[serde(default)]
    pub consent_privacy: bool,
}

impl ConsentRecord {
    #[must_use]
    pub fn get(&self, kind: ConsentKind) -> bool {
        match kind {
            ConsentKind::Marketing => self.consent_marketing,
            ConsentKind::Terms => self.consent_terms,
            ConsentKind::Privacy => self.consent_privacy,
        }
    }

    /// Apply a partial update, leaving unset flags untouched.
    pub fn apply(&mut self, patch: &ConsentPatch) {
        if let Some(v) = patch.consent_marketing {
            self.consent_marketing = v;
        }
        if let Some(v) = patch.consent_terms {
            self.consent_terms = v;
        }
        if let Some(v) = patch.consent_privacy {
            self.consent_privacy = v;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentKind {
    Marketing,
    Terms,
    Privacy,
}

impl ConsentKind {
    #[cfg(test)]
    pub(crate) const ALL: [Self; 3] = [Self::Marketing, Self::Terms, Self::Privacy];
}

/// Partial consent update (`PATCH /api/lgpd/consent`). Unset flags are omitted
/// from the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_marketing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_terms: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_privacy: Option<bool>,
}

impl ConsentPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch touching a single flag.
    #[must_use]
    pub fn single(kind: ConsentKind, value: bool) -> Self {
        Self::new().set(kind, value)
    }

    #[must_use]
    pub fn set(mut self, kind: ConsentKind, value: bool) -> Self {
        match kind {
            ConsentKind::Marketing => self.consent_marketing = Some(value),
            ConsentKind::Terms => self.consent_terms = Some(value),
            ConsentKind::Privacy => self.consent_privacy = Some(value),
        }
        self
    }

    #[must_use]
    pub fn marketing(self, value: bool) -> Self {
        self.set(ConsentKind::Marketing, value)
    }

    #[must_use]
    pub fn terms(self, value: bool) -> Self {
        self.set(ConsentKind::Terms, value)
    }

    #[must_use]
    pub fn privacy(self, value: bool) -> Self {
        self.set(ConsentKind::Privacy, value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consent_marketing.is_none()
            && self.consent_terms.is_none()
            && self.consent_privacy.is_none()
    }
}

/// One server-side consent history line. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentHistoryEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub changed_at: OffsetDateTime,
    pub description: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    From, Into,
)]
#[serde(transparent)]
pub struct ExportRequestId(pub i64);

/// Data export job state. Transitions are driven by the backend only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExportStatus {
    /// Dashboard label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::Processing => "Processando",
            Self::Completed => "Concluída",
            Self::Failed => "Falhou",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// An asynchronous data export job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DataExportRequest {
    pub id: ExportRequestId,
    pub status: ExportStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    download_url: Option<String>,
}

impl DataExportRequest {
    #[must_use]
    pub fn new(id: ExportRequestId, status: ExportStatus, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            status,
            created_at,
            download_url: None,
        }
    }

    #[must_use]
    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    /// Download link; only a completed export has one.
    #[must_use]
    pub fn download_url(&self) -> Option<&str> {
        match self.status {
            ExportStatus::Completed => self.download_url.as_deref(),
            _ => None,
        }
    }
}

/// Account details as returned inside the LGPD data snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct LgpdUser {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl LgpdUser {
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>, role: Role, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            username: username.into(),
            role,
            email_verified: false,
            created_at,
        }
    }
}

/// Everything the backend holds about the account (`GET /api/lgpd/data`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct LgpdData {
    pub user: LgpdUser,
    #[serde(default)]
    consents: Option<ConsentRecord>,
    /// Order payloads are owned by the order service; only their count is used here.
    #[serde(default)]
    pub orders: Vec<serde_json::Value>,
    #[serde(default)]
    pub data_export_requests: Vec<DataExportRequest>,
}

impl LgpdData {
    #[must_use]
    pub fn new(user: LgpdUser, consents: ConsentRecord) -> Self {
        Self {
            user,
            consents: Some(consents),
            orders: Vec::new(),
            data_export_requests: Vec::new(),
        }
    }

    /// Consent flags; a missing record reads as everything declined.
    #[must_use]
    pub fn consents(&self) -> ConsentRecord {
        self.consents.unwrap_or_default()
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

/// Account removal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionMode {
    /// Strip personal identifiers, keep transaction history.
    Anonymize,
    /// Permanently remove everything.
    Delete,
}
