//! Cooperative cancellation for extraction work running on blocking threads

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::ExtractionError;

/// Shared flag set by the job owner when the result is no longer wanted. Long-running
/// steps call [`CancelFlag::check`] between pages and stop once it trips.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once the flag is set
    pub fn check(&self) -> Result<(), ExtractionError> {
        if self.is_cancelled() {
            Err(ExtractionError::Cancelled)
        } else {
            Ok(())
        }
    }
}
