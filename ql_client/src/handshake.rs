use std::collections::HashMap;

use ql_ledger::IntervalUnit;
use ql_ledger::LimitDescriptor;
use ql_ledger::LimitEntry;
use ql_ledger::LimitKind;
use ql_ledger::RateLimitRegistry;
use ql_ledger::ResetInterval;
use ql_ledger::dimension_id;
use ql_ledger::limit_id;
use ql_ledger::venues::binance;
use serde::Deserialize;

use crate::headers::HeaderLimitMaps;

/// One limit as reported by the discovery call
#[derive(Debug, Deserialize)]
pub struct RateLimitInfo {
    #[serde(rename = "rateLimitType")]
    pub limit_type: String,
    pub interval: String,
    #[serde(rename = "intervalNum")]
    pub interval_num: u32,
    pub limit: u32,
    /// Usage already accrued, reported by some endpoints
    pub count: Option<u32>,
}

impl RateLimitInfo {
    /// Translate the wire form into a descriptor
    ///
    /// Unknown types or intervals yield None; the caller logs and skips
    /// them rather than failing the handshake.
    pub fn descriptor(&self) -> Option<LimitDescriptor> {
        let kind = match self.limit_type.as_str() {
            "REQUEST_WEIGHT" => LimitKind::RequestWeight,
            "ORDERS" => LimitKind::OrderCount,
            "RAW_REQUESTS" => LimitKind::RawRequests,
            _ => return None,
        };

        let unit = match self.interval.as_str() {
            "SECOND" => IntervalUnit::Second,
            "MINUTE" => IntervalUnit::Minute,
            "HOUR" => IntervalUnit::Hour,
            "DAY" => IntervalUnit::Day,
            _ => return None,
        };

        let mut descriptor = LimitDescriptor::new(kind, ResetInterval::new(unit, self.interval_num), self.limit);
        if let Some(count) = self.count {
            descriptor = descriptor.with_reported_usage(count);
        }
        Some(descriptor)
    }
}

/// Relevant slice of the discovery payload
#[derive(Debug, Deserialize)]
pub struct DiscoveryPayload {
    #[serde(rename = "rateLimits")]
    pub rate_limits: Vec<RateLimitInfo>,
}

/// Decode a discovery response into limit descriptors
///
/// Reports that do not translate (unknown type or interval) are skipped
/// with a warning.
pub fn parse_discovery(body: &[u8]) -> serde_json::Result<Vec<LimitDescriptor>> {
    let payload: DiscoveryPayload = serde_json::from_slice(body)?;

    let mut descriptors = Vec::with_capacity(payload.rate_limits.len());
    for info in &payload.rate_limits {
        match info.descriptor() {
            Some(descriptor) => descriptors.push(descriptor),
            None => {
                tracing::warn!(limit_type = %info.limit_type, interval = %info.interval, "Skipping unrecognized rate limit report");
            }
        }
    }
    Ok(descriptors)
}

/// Register or refresh one endpoint family's limits and derive its
/// header-to-limit map
///
/// Idempotent: a limit already in the ledger keeps its accrued usage and
/// only has its threshold refreshed. Usage reported by the discovery call
/// seeds the entry through the ordinary reconciliation path so the
/// ordering guard applies.
pub fn register_limits(registry: &RateLimitRegistry, maps: &HeaderLimitMaps, family: &str, descriptors: &[LimitDescriptor]) {
    let mut header_map = HashMap::new();

    for descriptor in descriptors {
        let dimension = dimension_id(family, descriptor.kind);
        let id = limit_id(dimension, descriptor.interval);
        let name = format!("{}/{} @ {}", descriptor.kind, descriptor.interval, family);

        let entry = LimitEntry::new(dimension, descriptor.interval, descriptor.threshold, name, registry.timestamp());
        if !registry.try_register_limit(id, entry) {
            if let Err(err) = registry.modify_limit(id, descriptor.threshold) {
                tracing::warn!(limit = id, %err, "Failed to refresh known limit");
            }
        }

        if let Some(usage) = descriptor.reported_usage {
            registry.update_usage(id, usage, registry.timestamp());
        }

        if let Some(header) = binance::usage_header(descriptor.kind, descriptor.interval) {
            header_map.insert(header, id);
        }
    }

    maps.set(family, header_map);
}

/// Seed the spot family from the fixed template, for venues or sessions
/// without a discovery call
pub fn register_spot_defaults(registry: &RateLimitRegistry, maps: &HeaderLimitMaps) {
    let mut descriptors = binance::spot_quotas();
    descriptors.extend(binance::order_quotas());
    register_limits(registry, maps, binance::SPOT_FAMILY, &descriptors);
}
