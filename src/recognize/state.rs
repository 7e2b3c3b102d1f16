use std::sync::atomic::{AtomicBool, Ordering};
use strum::{Display, EnumString};

/// Whether a recognition is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ProcessingState {
    Idle,
    Processing,
}

#[derive(Debug, Default)]
pub(crate) struct StateFlag(AtomicBool);

impl StateFlag {
    pub fn get(&self) -> ProcessingState {
        if self.0.load(Ordering::Acquire) {
            ProcessingState::Processing
        } else {
            ProcessingState::Idle
        }
    }

    /// Move Idle -> Processing. Returns `None` if already processing.
    pub fn try_begin(&self) -> Option<ProcessingGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingGuard(&self.0))
    }
}

/// Resets the flag to Idle when dropped.
#[derive(Debug)]
pub(crate) struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
