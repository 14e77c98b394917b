use std::time::Instant;

/// Monotonic time tracking for the ledger
///
/// Uses Instant for monotonic measurements with nanosecond precision, so
/// ordering guards never go backwards when the wall clock is adjusted.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimeSource {
    /// Epoch for relative time measurements
    epoch: Instant,
}

impl TimeSource {
    /// Create a new time source with current time as epoch
    #[inline(always)]
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    /// Get current time in nanoseconds since epoch
    #[inline(always)]
    pub fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

impl Default for TimeSource {
    fn default() -> Self {
        Self::new()
    }
}
