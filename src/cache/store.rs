//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with byte-budget LRU
//! eviction and TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{estimate_entry_size, CacheEntry, CacheStats, StatsSnapshot, Value};

// == Cache Store ==
/// Byte-bounded cache storage with access-recency eviction and TTL support.
///
/// Expired entries are removed lazily whenever they are next looked up;
/// [`sweep_expired`](CacheStore::sweep_expired) reclaims entries nobody
/// reads again and is driven by the periodic sweep task.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// Byte budget for the whole store
    max_size: usize,
    /// Sum of estimated entry sizes, kept consistent on every mutation
    used_bytes: usize,
    /// Default lifetime for entries stored without an explicit TTL
    default_ttl: Duration,
    /// Monotonic counter breaking `stored_at` ties deterministically
    touch_counter: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given byte budget and default TTL.
    ///
    /// # Arguments
    /// * `max_size` - Byte budget for the sum of estimated entry sizes
    /// * `default_ttl` - Lifetime applied when `set` is called without a TTL
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            max_size,
            used_bytes: 0,
            default_ttl,
            touch_counter: 0,
        }
    }

    fn next_touch_seq(&mut self) -> u64 {
        self.touch_counter += 1;
        self.touch_counter
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// Expired entries are purged up front, so memory pressure is measured
    /// against live entries only. If the key already exists, the old
    /// entry's size is released before the budget check. While the new
    /// entry would not fit, the entry with the oldest `stored_at` is
    /// evicted; the key being written is never a candidate. A single value
    /// larger than the whole budget is accepted after evicting everything
    /// else, so the store then holds exactly that entry. Never fails.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional lifetime (uses the default TTL if None)
    pub fn set(&mut self, key: impl Into<String>, value: Value, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let size = estimate_entry_size(&key, &value);

        self.sweep_expired();

        // Release the old entry first so a replace is budgeted against the
        // new size only, and so the eviction loop cannot pick this key.
        if let Some(old) = self.entries.remove(&key) {
            self.used_bytes = self.used_bytes.saturating_sub(old.size);
        }

        while self.used_bytes + size > self.max_size && !self.entries.is_empty() {
            self.evict_oldest();
        }

        let seq = self.next_touch_seq();
        self.entries.insert(key, CacheEntry::new(value, ttl, size, seq));
        self.used_bytes += size;
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A live hit refreshes `stored_at` (recency bump, which also slides
    /// the TTL window) and returns a clone of the value. An absent or
    /// expired key is a miss and returns `None`; expired entries are
    /// removed on the spot.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let seq = self.touch_counter + 1;
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.touch(seq);
                self.touch_counter = seq;
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            Some(_) => {
                self.remove_expired(key);
                self.stats.record_miss();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Contains ==
    /// Checks for a live entry without touching hit/miss counters or the
    /// recency signal. Expired entries are removed, as in `get`.
    pub fn contains(&mut self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => true,
            Some(_) => {
                self.remove_expired(key);
                false
            }
            None => false,
        }
    }

    // == Remove ==
    /// Removes an entry by key; returns whether something was removed.
    /// A no-op, not an error, when the key is absent. Like `set`, purges
    /// expired entries first, so removing an already-expired key reports
    /// false.
    pub fn remove(&mut self, key: &str) -> bool {
        self.sweep_expired();
        match self.entries.remove(key) {
            Some(entry) => {
                self.used_bytes = self.used_bytes.saturating_sub(entry.size);
                true
            }
            None => false,
        }
    }

    // == Clear ==
    /// Removes all entries and resets both the byte accounting and the
    /// lifetime counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
        self.stats.reset();
    }

    // == Sweep Expired ==
    /// Eagerly removes every expired entry.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.remove_expired(&key);
        }
        count
    }

    // == Stats ==
    /// Returns a snapshot of the store's state and counters.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            size: self.entries.len(),
            memory_usage: self.used_bytes,
            hit_rate: self.stats.hit_rate(),
            hits: self.stats.hits,
            misses: self.stats.misses,
            evictions: self.stats.evictions,
            expirations: self.stats.expirations,
        }
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Used Bytes ==
    /// Returns the sum of estimated entry sizes currently held.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    // == Eviction ==
    /// Evicts the entry with the oldest `stored_at`, breaking timestamp
    /// ties by insertion/access sequence.
    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.stored_at, entry.touch_seq))
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            if let Some(entry) = self.entries.remove(&key) {
                self.used_bytes = self.used_bytes.saturating_sub(entry.size);
                self.stats.record_eviction();
                debug!(key = %key, freed = entry.size, "evicted least-recently-used entry");
            }
        }
    }

    /// Removes a known-expired entry and adjusts the accounting.
    fn remove_expired(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.used_bytes = self.used_bytes.saturating_sub(entry.size);
            self.stats.record_expiration();
            debug!(key = %key, freed = entry.size, "removed expired entry");
        }
    }

    /// Accounting cross-check used by the property tests.
    #[cfg(test)]
    pub(crate) fn accounting_is_consistent(&self) -> bool {
        self.used_bytes == self.entries.values().map(|entry| entry.size).sum::<usize>()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const TEST_BUDGET: usize = 1024 * 1024;
    const TEST_TTL: Duration = Duration::from_secs(300);

    fn store() -> CacheStore {
        CacheStore::new(TEST_BUDGET, TEST_TTL)
    }

    /// Text value of `n` serialized characters (before quoting).
    fn text(n: usize) -> Value {
        Value::from("x".repeat(n))
    }

    #[test]
    fn test_store_new() {
        let store = store();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.used_bytes(), 0);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store();

        store.set("pkg:dplyr", Value::from("metadata"), None);
        let value = store.get("pkg:dplyr");

        assert_eq!(value, Some(Value::from("metadata")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent_is_none_not_error() {
        let mut store = store();
        assert_eq!(store.get("nonexistent"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_remove() {
        let mut store = store();

        store.set("key1", Value::from("value1"), None);
        assert!(store.remove("key1"));

        assert!(store.is_empty());
        assert_eq!(store.used_bytes(), 0);
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_remove_nonexistent() {
        let mut store = store();
        assert!(!store.remove("nonexistent"));
    }

    #[test]
    fn test_store_overwrite_releases_old_size() {
        let mut store = store();

        store.set("key1", text(500), None);
        let after_first = store.used_bytes();
        store.set("key1", text(10), None);

        assert_eq!(store.len(), 1);
        assert!(store.used_bytes() < after_first);
        assert_eq!(store.get("key1"), Some(text(10)));
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = store();

        store.set("key1", Value::from("value1"), Some(Duration::from_millis(100)));
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(150));

        assert_eq!(store.get("key1"), None);
        assert_eq!(store.len(), 0);
        assert_eq!(store.used_bytes(), 0);
    }

    #[test]
    fn test_expired_get_counts_as_miss() {
        let mut store = store();

        store.set("key1", Value::from("value1"), Some(Duration::from_millis(50)));
        sleep(Duration::from_millis(80));
        assert_eq!(store.get("key1"), None);

        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_contains_does_not_affect_stats_or_recency() {
        let mut store = CacheStore::new(1024, TEST_TTL);

        store.set("old", text(150), None);
        store.set("new", text(150), None);
        assert!(store.contains("old"));
        assert!(store.contains("old"));

        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);

        // contains() must not bump recency: "old" is still first out.
        store.set("big", text(300), None);
        assert!(!store.contains("old"));
        assert!(store.contains("new"));
    }

    #[test]
    fn test_contains_does_not_slide_ttl_window() {
        let mut store = store();
        store.set("k", Value::Int(1), Some(Duration::from_millis(100)));

        sleep(Duration::from_millis(60));
        assert!(store.contains("k"));
        sleep(Duration::from_millis(60));

        // 120ms after the set. A get() at 60ms would have refreshed
        // stored_at and kept the entry alive; contains() must not.
        assert_eq!(store.get("k"), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_contains_removes_expired() {
        let mut store = store();

        store.set("key1", Value::from("value1"), Some(Duration::from_millis(50)));
        sleep(Duration::from_millis(80));

        assert!(!store.contains("key1"));
        assert_eq!(store.len(), 0);
        assert_eq!(store.stats().misses, 0);
    }

    #[test]
    fn test_budget_eviction_oldest_first() {
        // Each entry: 2*(n+2) + 2*4 + 24 bytes; text(82) under "keyN" = 200.
        let mut store = CacheStore::new(1024, TEST_TTL);

        for i in 0..10 {
            store.set(format!("key{}", i), text(82), None);
            assert!(store.used_bytes() <= 1024);
        }

        assert!(store.len() < 10);
        assert!(store.get("key9").is_some());
        assert!(store.get("key8").is_some());
        assert_eq!(store.get("key0"), None);
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_recency_bump_postpones_eviction() {
        // Budget fits five 200-byte entries.
        let mut store = CacheStore::new(1024, TEST_TTL);
        for i in 0..5 {
            store.set(format!("key{}", i), text(82), None);
        }

        // Reading key0 makes key1 the eviction candidate.
        assert!(store.get("key0").is_some());
        store.set("key5", text(82), None);

        assert!(store.get("key0").is_some());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_oversized_value_evicts_everything_else() {
        let mut store = CacheStore::new(1024, TEST_TTL);
        store.set("small1", text(50), None);
        store.set("small2", text(50), None);

        // Far larger than the whole budget: accepted, everything else goes.
        store.set("huge", text(5000), None);

        assert_eq!(store.len(), 1);
        assert!(store.get("huge").is_some());
        assert!(store.used_bytes() > 1024);

        // The next set drains the oversized entry again.
        store.set("after", text(50), None);
        assert_eq!(store.len(), 1);
        assert!(store.used_bytes() <= 1024);
    }

    #[test]
    fn test_replace_never_evicts_own_key() {
        let mut store = CacheStore::new(512, TEST_TTL);
        store.set("only", text(100), None);

        // Replacing with a bigger value must not evict "only" itself.
        store.set("only", text(150), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("only"), Some(text(150)));
    }

    #[test]
    fn test_store_clear_resets_counters() {
        let mut store = store();

        store.set("key1", Value::from("value1"), None);
        store.get("key1");
        store.get("missing");
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.used_bytes(), 0);
        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_store_sweep_expired() {
        let mut store = store();

        store.set("short", Value::from("value1"), Some(Duration::from_millis(50)));
        store.set("long", Value::from("value2"), Some(Duration::from_secs(10)));

        sleep(Duration::from_millis(80));

        let removed = store.sweep_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("long").is_some());
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_hit_rate_one_miss_one_hit() {
        let mut store = store();

        assert_eq!(store.get("pkg:shiny"), None);
        store.set("pkg:shiny", Value::from("fetched"), None);
        assert!(store.get("pkg:shiny").is_some());

        assert_eq!(store.stats().hit_rate, 0.5);
    }

    #[test]
    fn test_circular_value_roundtrip() {
        let mut store = store();

        let node = std::sync::Arc::new(std::sync::RwLock::new(Value::Null));
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("name".to_string(), Value::from("jsonlite"));
        fields.insert("me".to_string(), Value::Shared(node.clone()));
        *node.write().unwrap() = Value::Map(fields.clone());

        store.set("pkg:jsonlite", Value::Map(fields), None);

        let cached = store.get("pkg:jsonlite").expect("circular value stored");
        assert_eq!(cached.get("name").and_then(Value::as_str), Some("jsonlite"));
        assert!(store.used_bytes() > 0);
    }

    #[test]
    fn test_ttl_scenario_100ms() {
        let mut store = store();

        let mut fields = std::collections::BTreeMap::new();
        fields.insert("a".to_string(), Value::Int(1));
        store.set("k", Value::Map(fields.clone()), Some(Duration::from_millis(100)));

        assert_eq!(store.get("k"), Some(Value::Map(fields)));

        sleep(Duration::from_millis(150));
        assert_eq!(store.get("k"), None);
        assert_eq!(store.len(), 0);
    }
}
