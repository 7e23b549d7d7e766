//! In-memory, TTL- and capacity-bounded cache of per-symbol instrument
//! quantization rules (the Instrument Cache component).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tradebot_core::InstrumentRules;

struct CacheEntry {
    value: InstrumentRules,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Thread-safe cache for instrument rules with TTL and max-entry bounds.
/// Rules rarely change, so a generous default TTL (and a last-resort LRU
/// eviction when at capacity) is enough.
pub struct InstrumentCache {
    rules: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl InstrumentCache {
    pub fn with_capacity(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            default_ttl,
            max_entries,
        }
    }

    pub fn get(&self, symbol: &str) -> Option<InstrumentRules> {
        let cache = self.rules.read().ok()?;
        let entry = cache.get(symbol)?;
        if entry.is_expired() {
            None
        } else {
            Some(entry.value)
        }
    }

    pub fn insert(&self, symbol: &str, rules: InstrumentRules) {
        if let Ok(mut cache) = self.rules.write() {
            if cache.len() >= self.max_entries {
                cache.retain(|_, entry| !entry.is_expired());
            }
            if cache.len() >= self.max_entries {
                if let Some(oldest) = cache.iter().min_by_key(|(_, e)| e.inserted_at).map(|(k, _)| k.clone()) {
                    cache.remove(&oldest);
                }
            }
            cache.insert(
                symbol.to_string(),
                CacheEntry { value: rules, inserted_at: Instant::now(), ttl: self.default_ttl },
            );
        }
    }

    pub fn invalidate(&self, symbol: &str) {
        if let Ok(mut cache) = self.rules.write() {
            cache.remove(symbol);
        }
    }

    pub fn cleanup(&self) {
        if let Ok(mut cache) = self.rules.write() {
            cache.retain(|_, entry| !entry.is_expired());
        }
    }

    pub fn len(&self) -> usize {
        self.rules.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InstrumentCache {
    fn default() -> Self {
        // Instrument rules change rarely; a 1h TTL keeps the cache fresh
        // across exchange listing changes without hammering the REST API.
        Self::with_capacity(Duration::from_secs(3600), 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> InstrumentRules {
        InstrumentRules { tick_size: 0.1, qty_step: 0.001, min_qty: 0.001 }
    }

    #[test]
    fn insert_then_get() {
        let cache = InstrumentCache::with_capacity(Duration::from_secs(60), 10);
        cache.insert("BTCUSDT", rules());
        assert!(cache.get("BTCUSDT").is_some());
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = InstrumentCache::with_capacity(Duration::from_millis(1), 10);
        cache.insert("BTCUSDT", rules());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("BTCUSDT").is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = InstrumentCache::with_capacity(Duration::from_secs(60), 10);
        cache.insert("BTCUSDT", rules());
        cache.invalidate("BTCUSDT");
        assert!(cache.get("BTCUSDT").is_none());
    }
}
