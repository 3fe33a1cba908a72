//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cache::Value;

// == Cache Entry ==
/// A single cache entry with its recency and expiry bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation or most recent read timestamp (Unix milliseconds).
    /// Doubles as the recency signal for eviction and the base the TTL is
    /// measured from, so a read slides the expiry window.
    pub stored_at: u64,
    /// Entry lifetime measured from `stored_at`
    pub ttl: Duration,
    /// Estimated footprint in bytes, computed once at insertion
    pub size: usize,
    /// Tie-breaker for entries stored or touched in the same millisecond
    pub touch_seq: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(value: Value, ttl: Duration, size: usize, touch_seq: u64) -> Self {
        Self {
            value,
            stored_at: current_timestamp_ms(),
            ttl,
            size,
            touch_seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to `stored_at + ttl`.
    pub fn is_expired(&self) -> bool {
        let expires_at = self.stored_at.saturating_add(self.ttl.as_millis() as u64);
        current_timestamp_ms() >= expires_at
    }

    // == Touch ==
    /// Refreshes `stored_at` to now (recency bump on a successful read).
    pub fn touch(&mut self, touch_seq: u64) {
        self.stored_at = current_timestamp_ms();
        self.touch_seq = touch_seq;
    }

}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
