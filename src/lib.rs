#![doc = include_str!("../README.md")]

pub mod backend;
pub mod config;
mod controller;
pub mod csrf;
mod epoch;
pub mod error;
mod guard;
pub mod lgpd;
pub mod notify;
pub mod session;
#[cfg(test)]
mod testing;
pub mod types;
pub mod verification;

// Re-exports for convenient access
#[cfg(feature = "http")]
pub use backend::HttpBackend;
pub use backend::{ApiMessage, Backend};
pub use config::ClientConfig;
pub use controller::Storefront;
pub use csrf::TokenCache;
pub use error::Error;
pub use lgpd::{
    AccountDeletionIntent, AccountRemoval, ConsentHistoryEntry, ConsentKind, ConsentPatch,
    ConsentRecord, ConsentWorkflow, DataExportRequest, DeletionMode, ExportRequestId,
    ExportStatus, Gate, LgpdData, LgpdUser,
};
pub use notify::{Notice, NoticeLevel, NoticeQueue, Notifier, TracingNotifier};
pub use session::{AuthScope, SessionState, SessionStore, SessionView};
pub use types::{Credentials, CsrfToken, IdentityProbe, Principal, Role, Route, UserId};
pub use verification::{EmailVerification, VerificationOutcome};
