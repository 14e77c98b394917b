/// Declared cost of one outbound call against one quota dimension
///
/// A single call may declare zero, one, or several weights, covering
/// multiple dimensions simultaneously (e.g. both an IP-weight cost and an
/// order-count cost).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWeight {
    /// Dimension identity the cost applies to
    pub dimension: i64,

    /// Cost amount charged against the dimension
    pub amount: u32,
}

impl QueryWeight {
    pub const fn new(dimension: i64, amount: u32) -> Self {
        Self { dimension, amount }
    }
}

/// Row-count tiered cost function
///
/// Some endpoints charge more weight above certain requested-row
/// thresholds (candlestick queries being the usual case). Tiers are
/// checked in order; the first tier whose bound covers the request wins,
/// and requests above every bound fall back to the final amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieredWeight {
    /// (inclusive upper row bound, amount) pairs, ascending by bound
    tiers: Vec<(u32, u32)>,

    /// Amount charged above the last bound
    fallback: u32,
}

impl TieredWeight {
    pub fn new(tiers: Vec<(u32, u32)>, fallback: u32) -> Self {
        debug_assert!(tiers.windows(2).all(|w| w[0].0 < w[1].0), "tier bounds must be ascending");
        Self { tiers, fallback }
    }

    /// Cost for a request asking for `rows` rows
    pub fn amount_for(&self, rows: u32) -> u32 {
        for &(bound, amount) in &self.tiers {
            if rows <= bound {
                return amount;
            }
        }
        self.fallback
    }
}
