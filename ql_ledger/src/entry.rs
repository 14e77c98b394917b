use std::fmt;
use std::time::Duration;

/// Unit of a limit's reset window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl IntervalUnit {
    /// Number of seconds in one unit
    #[inline]
    pub const fn seconds(self) -> u64 {
        match self {
            IntervalUnit::Second => 1,
            IntervalUnit::Minute => 60,
            IntervalUnit::Hour => 3_600,
            IntervalUnit::Day => 86_400,
        }
    }

    /// Single-letter suffix used in usage header names and display labels
    #[inline]
    pub const fn suffix(self) -> char {
        match self {
            IntervalUnit::Second => 's',
            IntervalUnit::Minute => 'm',
            IntervalUnit::Hour => 'h',
            IntervalUnit::Day => 'd',
        }
    }
}

/// A limit's reset window, e.g. 1 minute or 10 seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResetInterval {
    pub unit: IntervalUnit,
    pub count: u32,
}

impl ResetInterval {
    pub const fn new(unit: IntervalUnit, count: u32) -> Self {
        Self { unit, count }
    }

    /// Window length as a Duration
    #[inline]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.unit.seconds() * u64::from(self.count))
    }

    /// Window length in nanoseconds, used for id folding and rollover
    #[inline]
    pub fn as_nanos(&self) -> u64 {
        self.unit.seconds() * u64::from(self.count) * 1_000_000_000
    }

    /// Compact label, e.g. "1m", "10s", "1d"
    pub fn label(&self) -> String {
        format!("{}{}", self.count, self.unit.suffix())
    }
}

impl fmt::Display for ResetInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}

/// Quota axis enforced by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// Weighted request cost per IP
    RequestWeight,
    /// Order count per account
    OrderCount,
    /// Raw request count regardless of weight
    RawRequests,
}

impl LimitKind {
    /// Small integer code folded into dimension ids
    #[inline]
    pub const fn code(self) -> i64 {
        match self {
            LimitKind::RequestWeight => 1,
            LimitKind::OrderCount => 2,
            LimitKind::RawRequests => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            LimitKind::RequestWeight => "request-weight",
            LimitKind::OrderCount => "order-count",
            LimitKind::RawRequests => "raw-requests",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A limit as reported by the remote service
///
/// Transient: consumed once during registration to populate a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitDescriptor {
    pub kind: LimitKind,
    pub interval: ResetInterval,
    pub threshold: u32,
    /// Usage already accrued, when the service reports it at discovery time
    pub reported_usage: Option<u32>,
}

impl LimitDescriptor {
    pub const fn new(kind: LimitKind, interval: ResetInterval, threshold: u32) -> Self {
        Self { kind, interval, threshold, reported_usage: None }
    }

    pub const fn with_reported_usage(mut self, usage: u32) -> Self {
        self.reported_usage = Some(usage);
        self
    }
}

/// The ledger's record of one limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitEntry {
    /// Dimension identity this limit belongs to
    pub dimension: i64,

    /// Reset window
    pub interval: ResetInterval,

    /// Maximum usage allowed within one window
    pub threshold: u32,

    /// Current usage within the active window
    pub usage: u32,

    /// Human-readable name for diagnostics
    pub name: String,

    /// Timestamp of the most recent usage change (nanos, registry clock)
    pub updated_at: u64,

    /// Start of the active window (nanos, registry clock)
    pub window_start: u64,
}

impl LimitEntry {
    pub fn new(dimension: i64, interval: ResetInterval, threshold: u32, name: String, now: u64) -> Self {
        Self { dimension, interval, threshold, usage: 0, name, updated_at: now, window_start: now }
    }

    /// Roll the window forward if at least one full interval has elapsed
    ///
    /// Windows reset at fixed boundaries aligned to the entry's creation
    /// time. `updated_at` advances to the new boundary so a reconciliation
    /// from the previous window cannot resurrect stale usage.
    pub(crate) fn roll_window(&mut self, now: u64) {
        let window_nanos = self.interval.as_nanos();
        let elapsed = now.saturating_sub(self.window_start);
        if elapsed < window_nanos {
            return;
        }

        let windows_elapsed = elapsed / window_nanos;
        self.window_start += windows_elapsed * window_nanos;
        self.usage = 0;
        self.updated_at = self.window_start;
    }
}
