//! Generation counters for discarding results whose owner has moved on.
//!
//! Take a [`Ticket`] before suspending on a network call; when the call
//! returns, apply its result only if the ticket is still current.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default)]
pub struct Epoch(Arc<AtomicU64>);

impl Epoch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Invalidate every ticket issued so far. Returns the new generation.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[must_use]
    pub fn ticket(&self) -> Ticket {
        Ticket {
            epoch: Arc::clone(&self.0),
            issued: self.current(),
        }
    }
}

/// Snapshot of an [`Epoch`] generation.
#[derive(Debug, Clone)]
pub struct Ticket {
    epoch: Arc<AtomicU64>,
    issued: u64,
}

impl Ticket {
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.epoch.load(Ordering::Acquire) == self.issued
    }

    #[must_use]
    pub fn issued(&self) -> u64 {
        self.issued
    }
}
