//! Durable global state snapshot (see the State Store component contract).

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::trade::Trade;

/// Bounded ring of recently accepted signal fingerprints, used for admission
/// dedup. Capacity-bounded rather than unbounded so the snapshot can't grow
/// forever across a long-lived deployment.
///
/// Serializes as a bare JSON array (matching `seen_hashes` in the original
/// state file) rather than as `{capacity, order}` — `capacity` is a runtime
/// policy, not persisted state, and is restored to the default on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "Vec<String>", from = "Vec<String>")]
pub struct FingerprintRing {
    capacity: usize,
    order: VecDeque<String>,
}

impl FingerprintRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
        }
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.order.iter().any(|f| f == fingerprint)
    }

    /// Inserts a fingerprint, evicting the oldest entry if at capacity.
    /// No-op if already present.
    pub fn insert(&mut self, fingerprint: String) {
        if self.contains(&fingerprint) {
            return;
        }
        if self.order.len() >= self.capacity {
            self.order.pop_front();
        }
        self.order.push_back(fingerprint);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl From<FingerprintRing> for Vec<String> {
    fn from(ring: FingerprintRing) -> Self {
        ring.order.into_iter().collect()
    }
}

impl From<Vec<String>> for FingerprintRing {
    fn from(list: Vec<String>) -> Self {
        let mut ring = default_fingerprint_ring();
        for fingerprint in list {
            ring.insert(fingerprint);
        }
        ring
    }
}

/// Everything the Trade Engine persists across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    #[serde(default)]
    pub last_signal_id: Option<String>,
    #[serde(default)]
    pub open_trades: HashMap<String, Trade>,
    #[serde(default)]
    pub daily_counts: HashMap<String, u32>,
    #[serde(default = "default_fingerprint_ring")]
    pub seen_fingerprints: FingerprintRing,
}

fn default_fingerprint_ring() -> FingerprintRing {
    FingerprintRing::new(2048)
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            last_signal_id: None,
            open_trades: HashMap::new(),
            daily_counts: HashMap::new(),
            seen_fingerprints: default_fingerprint_ring(),
        }
    }
}

impl GlobalState {
    /// Today's count in UTC, per the `%Y-%m-%d` keying used by the original
    /// state store.
    pub fn today_count(&self, now: chrono::DateTime<chrono::Utc>) -> u32 {
        let key = now.format("%Y-%m-%d").to_string();
        self.daily_counts.get(&key).copied().unwrap_or(0)
    }

    /// Increments today's count, returning the new value.
    pub fn increment_today(&mut self, now: chrono::DateTime<chrono::Utc>) -> u32 {
        let key = now.format("%Y-%m-%d").to_string();
        let entry = self.daily_counts.entry(key).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Drops closed/expired trades whose terminal timestamp is more than
    /// 24h old. Returns the number pruned.
    pub fn prune(&mut self, now: chrono::DateTime<chrono::Utc>) -> usize {
        let before = self.open_trades.len();
        self.open_trades.retain(|_, t| !t.prunable(now));
        before - self.open_trades.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ring_dedups() {
        let mut r = FingerprintRing::new(2);
        r.insert("a".into());
        r.insert("a".into());
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn fingerprint_ring_evicts_oldest() {
        let mut r = FingerprintRing::new(2);
        r.insert("a".into());
        r.insert("b".into());
        r.insert("c".into());
        assert!(!r.contains("a"));
        assert!(r.contains("b") && r.contains("c"));
    }

    #[test]
    fn fingerprint_ring_serializes_as_a_bare_array() {
        let mut r = FingerprintRing::new(16);
        r.insert("a".into());
        r.insert("b".into());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json, serde_json::json!(["a", "b"]));

        let back: FingerprintRing = serde_json::from_value(json).unwrap();
        assert!(back.contains("a") && back.contains("b"));
    }

    #[test]
    fn daily_count_increments() {
        let mut s = GlobalState::default();
        let now = chrono::Utc::now();
        assert_eq!(s.today_count(now), 0);
        s.increment_today(now);
        s.increment_today(now);
        assert_eq!(s.today_count(now), 2);
    }
}
