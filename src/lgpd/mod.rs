//! LGPD privacy dashboard: consent flags, consent history, data export
//! requests and account anonymization or deletion.

mod deletion;
mod types;
mod workflow;

pub use deletion::{AccountDeletionIntent, DeletionRequest};
pub use types::{
    ConsentHistoryEntry, ConsentKind, ConsentPatch, ConsentRecord, DataExportRequest,
    DeletionMode, ExportRequestId, ExportStatus, LgpdData, LgpdUser,
};
pub use workflow::{AccountRemoval, ConsentWorkflow, Gate};
