use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

/// Per-endpoint-family mapping from usage header name to limit id
///
/// Populated once during a family's initialization handshake and treated
/// as read-only by queries, which hold an `Arc` snapshot of their family's
/// map. Header names are case-insensitive: keys are stored lowercased and
/// lookups lowercase before probing.
#[derive(Debug, Default)]
pub struct HeaderLimitMaps {
    inner: DashMap<String, Arc<HashMap<String, i64>>>,
}

impl HeaderLimitMaps {
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }

    /// Install (or replace) a family's header map
    pub fn set(&self, family: impl Into<String>, map: HashMap<String, i64>) {
        let lowered = map.into_iter().map(|(name, id)| (name.to_ascii_lowercase(), id)).collect();
        self.inner.insert(family.into(), Arc::new(lowered));
    }

    /// Snapshot of a family's header map
    pub fn get(&self, family: &str) -> Option<Arc<HashMap<String, i64>>> {
        self.inner.get(family).map(|entry| Arc::clone(entry.value()))
    }

    /// Resolve one header name within a family
    pub fn resolve(&self, family: &str, header: &str) -> Option<i64> {
        self.get(family).and_then(|map| map.get(&header.to_ascii_lowercase()).copied())
    }
}
