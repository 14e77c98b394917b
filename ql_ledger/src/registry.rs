use std::collections::HashMap;

use parking_lot::Mutex;

use crate::admission::Admission;
use crate::admission::Refusal;
use crate::entry::LimitEntry;
use crate::error::LedgerError;
use crate::error::Result;
use crate::time::TimeSource;
use crate::weight::QueryWeight;

/// Process-local store of ledger entries, shared by all in-flight queries
///
/// Entries are keyed by limit id. A declared weight targets a dimension,
/// so it charges every registered window on that dimension (e.g. an order
/// costs one count against both the 10-second and the daily order limit).
///
/// Every operation takes the map lock once, which makes each operation
/// atomic and lets `reserve` fuse its admission test with the optimistic
/// increment: two concurrent reserves can never both observe
/// pre-increment usage and jointly overshoot a threshold.
pub struct RateLimitRegistry {
    limits: Mutex<HashMap<i64, LimitEntry>>,
    clock: TimeSource,
}

impl RateLimitRegistry {
    pub fn new() -> Self {
        Self { limits: Mutex::new(HashMap::new()), clock: TimeSource::new() }
    }

    /// Current time on the registry clock, in nanoseconds
    ///
    /// Callers capture this once at dispatch time and hand the same value
    /// to `reserve` and to the reconciliation that follows the response.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.clock.now_nanos()
    }

    /// Whether a ledger entry exists under the given limit id
    pub fn contains_limit(&self, id: i64) -> bool {
        self.limits.lock().contains_key(&id)
    }

    /// Insert an entry only if absent; returns false when already present
    ///
    /// Re-registration of a known limit must go through `modify_limit` so
    /// accrued usage survives repeated discovery handshakes.
    pub fn try_register_limit(&self, id: i64, entry: LimitEntry) -> bool {
        let mut limits = self.limits.lock();
        if limits.contains_key(&id) {
            return false;
        }
        limits.insert(id, entry);
        true
    }

    /// Update a known limit's threshold in place, usage untouched
    pub fn modify_limit(&self, id: i64, new_threshold: u32) -> Result<()> {
        let mut limits = self.limits.lock();
        match limits.get_mut(&id) {
            Some(entry) => {
                entry.threshold = new_threshold;
                Ok(())
            }
            None => Err(LedgerError::UnknownLimit(id)),
        }
    }

    /// Pure admission projection: refused iff any weight's projected usage
    /// exceeds its limit's threshold
    ///
    /// Reports the first violated limit. Weights on dimensions with no
    /// registered entry admit trivially.
    pub fn test_usage(&self, weights: &[QueryWeight]) -> Admission {
        let mut limits = self.limits.lock();
        let now = self.clock.now_nanos();

        match Self::first_violation(&mut limits, weights, now) {
            Some(refusal) => Admission::Refused(refusal),
            None => Admission::Admitted,
        }
    }

    /// Fused test-and-reserve: admit and optimistically charge all weights
    /// under a single lock acquisition, or refuse without mutating
    ///
    /// This is the dispatch-time reservation step. The increment happens
    /// before the caller suspends on the transport round trip, so every
    /// concurrently dispatching query already observes the reserved usage.
    pub fn reserve(&self, weights: &[QueryWeight], now: u64) -> Admission {
        let mut limits = self.limits.lock();

        if let Some(refusal) = Self::first_violation(&mut limits, weights, now) {
            return Admission::Refused(refusal);
        }

        Self::charge(&mut limits, weights, now);
        Admission::Admitted
    }

    /// Optimistically add each weight's amount to its dimension's entries
    ///
    /// No admission check: callers that need one use `reserve`.
    pub fn increment_usage(&self, weights: &[QueryWeight], now: u64) {
        let mut limits = self.limits.lock();
        Self::charge(&mut limits, weights, now);
    }

    /// Overwrite a limit's usage with a remote-reported absolute value
    ///
    /// The write is discarded (returning false) when `now` is older than
    /// the entry's recorded update, so a slow response cannot regress a
    /// ledger entry already advanced by a newer observation.
    pub fn update_usage(&self, id: i64, absolute: u32, now: u64) -> bool {
        let mut limits = self.limits.lock();
        let Some(entry) = limits.get_mut(&id) else {
            return false;
        };

        entry.roll_window(self.clock.now_nanos());
        if now < entry.updated_at {
            return false;
        }

        entry.usage = absolute;
        entry.updated_at = now;
        true
    }

    /// Cloned snapshot of one entry, for diagnostics and logging
    pub fn entry(&self, id: i64) -> Option<LimitEntry> {
        let mut limits = self.limits.lock();
        let now = self.clock.now_nanos();
        limits.get_mut(&id).map(|entry| {
            entry.roll_window(now);
            entry.clone()
        })
    }

    fn first_violation(limits: &mut HashMap<i64, LimitEntry>, weights: &[QueryWeight], now: u64) -> Option<Refusal> {
        for weight in weights {
            for (id, entry) in limits.iter_mut() {
                if entry.dimension != weight.dimension {
                    continue;
                }

                entry.roll_window(now);
                let projected = entry.usage.saturating_add(weight.amount);
                if projected > entry.threshold {
                    return Some(Refusal {
                        limit_id: *id,
                        name: entry.name.clone(),
                        usage: entry.usage,
                        attempted: weight.amount,
                        threshold: entry.threshold,
                    });
                }
            }
        }
        None
    }

    fn charge(limits: &mut HashMap<i64, LimitEntry>, weights: &[QueryWeight], now: u64) {
        for weight in weights {
            for entry in limits.values_mut() {
                if entry.dimension != weight.dimension {
                    continue;
                }

                entry.roll_window(now);
                entry.usage = entry.usage.saturating_add(weight.amount);
                if now > entry.updated_at {
                    entry.updated_at = now;
                }
            }
        }
    }
}

impl Default for RateLimitRegistry {
    fn default() -> Self {
        Self::new()
    }
}
