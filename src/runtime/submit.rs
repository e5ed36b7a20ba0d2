use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::utils::{CannonError, CannonResult};

/// Allows one in-flight request per user action
///
/// A second submission while the first is outstanding fails with
/// [`CannonError::Busy`] before anything is sent.
#[derive(Debug)]
pub struct SubmitGuard {
    action: &'static str,
    busy: AtomicBool,
}

impl SubmitGuard {
    pub const fn new(action: &'static str) -> Self {
        Self {
            action,
            busy: AtomicBool::new(false),
        }
    }

    /// Claim the guard; it is released when the returned token drops
    pub fn try_begin(&self) -> CannonResult<InFlight<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("rejected duplicate submission: {}", self.action);
            return Err(CannonError::Busy(self.action));
        }

        Ok(InFlight { busy: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn action(&self) -> &'static str {
        self.action
    }
}

/// Proof that a submission is outstanding
#[must_use = "the guard is released as soon as this is dropped"]
#[derive(Debug)]
pub struct InFlight<'a> {
    busy: &'a AtomicBool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
