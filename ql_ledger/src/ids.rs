use std::hash::Hasher;

use rapidhash::fast::RapidHasher;

use crate::entry::LimitKind;
use crate::entry::ResetInterval;

// Knuth's multiplicative constant, used to fold two identities into one
const FOLD_PRIME: i64 = 0x9E37_79B9;

/// Stable identity of one quota dimension: (discriminative endpoint, kind)
///
/// Deterministic within a process lifetime. Collisions between distinct
/// dimensions are possible in principle and accepted as a fast-hash
/// tradeoff; ids are not persisted across restarts.
pub fn dimension_id(endpoint: &str, kind: LimitKind) -> i64 {
    let mut hasher = RapidHasher::default();
    hasher.write(endpoint.as_bytes());
    let endpoint_hash = hasher.finish() as i64;

    endpoint_hash.wrapping_mul(FOLD_PRIME).wrapping_add(kind.code())
}

/// Stable identity of one limit: (dimension, reset interval)
///
/// Disambiguates multiple windows sharing a dimension, e.g. a per-minute
/// and a per-day limit on the same endpoint family.
pub fn limit_id(dimension: i64, interval: ResetInterval) -> i64 {
    dimension.wrapping_mul(FOLD_PRIME).wrapping_add(interval.as_nanos() as i64)
}
