//! Binance spot quota presets
//!
//! Binance enforces several overlapping limits per endpoint family:
//! - **REQUEST_WEIGHT**: weighted request cost per IP
//! - **ORDERS**: order count per account
//! - **RAW_REQUESTS**: raw request count regardless of weight
//!
//! Reference: https://binance-docs.github.io/apidocs/spot/en/#limits

use crate::entry::IntervalUnit;
use crate::entry::LimitDescriptor;
use crate::entry::LimitKind;
use crate::entry::ResetInterval;
use crate::weight::TieredWeight;

/// Discriminative endpoint for the spot REST family
pub const SPOT_FAMILY: &str = "/api";

/// Usage header reported for a limit, when the venue exposes one
///
/// Weight and order-count limits are echoed back per interval
/// (`x-mbx-used-weight-1m`, `x-mbx-order-count-10s`); raw request limits
/// carry no usage header.
pub fn usage_header(kind: LimitKind, interval: ResetInterval) -> Option<String> {
    match kind {
        LimitKind::RequestWeight => Some(format!("x-mbx-used-weight-{}", interval.label())),
        LimitKind::OrderCount => Some(format!("x-mbx-order-count-{}", interval.label())),
        LimitKind::RawRequests => None,
    }
}

/// Spot request limits, used as the fixed template when the discovery
/// call is unavailable
///
/// - 1_200 weight per minute
/// - 6_000 raw requests per 5 minutes
pub fn spot_quotas() -> Vec<LimitDescriptor> {
    vec![
        LimitDescriptor::new(LimitKind::RequestWeight, ResetInterval::new(IntervalUnit::Minute, 1), 1_200),
        LimitDescriptor::new(LimitKind::RawRequests, ResetInterval::new(IntervalUnit::Minute, 5), 6_000),
    ]
}

/// Spot order-placement limits
///
/// - 100 orders per 10 seconds
/// - 200,000 orders per day
pub fn order_quotas() -> Vec<LimitDescriptor> {
    vec![
        LimitDescriptor::new(LimitKind::OrderCount, ResetInterval::new(IntervalUnit::Second, 10), 100),
        LimitDescriptor::new(LimitKind::OrderCount, ResetInterval::new(IntervalUnit::Day, 1), 200_000),
    ]
}

/// Candlestick query weight, tiered by requested row count
pub fn kline_weight() -> TieredWeight {
    TieredWeight::new(vec![(100, 1), (500, 2), (1_000, 5)], 10)
}
