use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;

/// Rejects a second writer while the first is still outstanding.
///
/// The presentation layer disables the triggering control while
/// [`is_pending`](InFlight::is_pending) is true; this is the backstop when it
/// does not.
#[derive(Debug, Default)]
pub struct InFlight {
    busy: AtomicBool,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the operation as started.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if it is already running.
    pub fn try_begin(&self, operation: &'static str) -> Result<InFlightGuard<'_>, Error> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy(operation))?;
        Ok(InFlightGuard { busy: &self.busy })
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag on drop, including on early return and panic.
#[must_use = "the operation is only marked in flight while the guard lives"]
pub struct InFlightGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
