//! Cache Handle Module
//!
//! Thread-safe, cloneable handle over a [`CacheStore`]. All lookup
//! operations of the aggregation server go through a handle like this
//! instead of a process-wide singleton, so tests can construct independent
//! instances without cross-test leakage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheStore, StatsSnapshot, Value};
use crate::config::CacheConfig;
use crate::error::ConfigError;
use crate::tasks::spawn_sweep_task;

// == Cache ==
/// Shared cache engine.
///
/// Every operation is synchronous and serializes through a single mutex,
/// so the byte accounting and the entry map can never diverge and no torn
/// entry is observable. The mutex is held only across in-memory work;
/// there is no I/O inside the cache.
#[derive(Debug, Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

#[derive(Debug)]
struct CacheInner {
    store: Mutex<CacheStore>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    /// Set under the store mutex by `destroy`; checked by each sweep pass
    /// after it acquires that mutex, so a pass already queued on the lock
    /// when `destroy` runs skips instead of sweeping the cleared store.
    sweep_cancelled: AtomicBool,
    sweep_interval: Duration,
}

impl Cache {
    // == Constructor ==
    /// Creates a cache from a validated configuration.
    ///
    /// Fails with a descriptive error on a zero byte budget or zero TTL,
    /// which would otherwise spin the eviction loop forever.
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(CacheInner {
                store: Mutex::new(CacheStore::new(config.max_size, config.default_ttl)),
                sweeper: Mutex::new(None),
                sweep_cancelled: AtomicBool::new(false),
                sweep_interval: config.sweep_interval,
            }),
        })
    }

    fn store(&self) -> MutexGuard<'_, CacheStore> {
        self.inner
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // == Operations ==
    /// Stores a value under `key`, evicting least-recently-touched entries
    /// as needed to stay within the byte budget.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Option<Duration>) {
        self.store().set(key, value, ttl);
    }

    /// Returns the cached value if present and not expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store().get(key)
    }

    /// Checks for a live entry without affecting statistics or recency.
    pub fn contains(&self, key: &str) -> bool {
        self.store().contains(key)
    }

    /// Removes an entry; returns whether something was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.store().remove(key)
    }

    /// Removes all entries and resets the statistics counters.
    pub fn clear(&self) {
        self.store().clear();
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.store().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    /// Snapshot of entry count, memory usage and hit/miss counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.store().stats()
    }

    /// Eagerly removes every expired entry; returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.store().sweep_expired()
    }

    /// One pass of the periodic sweep, or `None` once the sweeper has been
    /// cancelled. The cancellation flag is flipped under the store mutex in
    /// [`destroy`](Cache::destroy), so a pass that was already queued on
    /// the mutex when `destroy` ran observes the flag, not the cleared
    /// store.
    pub(crate) fn sweep_pass(&self) -> Option<usize> {
        let mut store = self.store();
        if self.inner.sweep_cancelled.load(Ordering::Acquire) {
            return None;
        }
        Some(store.sweep_expired())
    }

    // == Sweeper ==
    /// Starts the periodic expiry sweep on the ambient tokio runtime.
    ///
    /// Idempotent while a sweeper is running. Must be called from within a
    /// runtime; the store works without a sweeper thanks to lazy expiry,
    /// but idle expired entries are then only reclaimed on access.
    pub fn start_sweeper(&self) {
        let mut slot = self
            .inner
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            self.inner.sweep_cancelled.store(false, Ordering::Release);
            *slot = Some(spawn_sweep_task(self.clone(), self.inner.sweep_interval));
        }
    }

    // == Destroy ==
    /// Cancels the periodic sweep and clears the store.
    ///
    /// Idempotent. Aborting the task stops it at its next sleep; a pass
    /// that already woke and is queued on the store mutex is stopped by
    /// the cancellation flag, which is set below while the mutex is held.
    /// Either way no sweep runs after this returns. The cache stays usable
    /// afterward as a fresh empty store, and `start_sweeper` may be called
    /// again.
    pub fn destroy(&self) {
        let handle = self
            .inner
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("cache sweeper stopped");
        }
        let mut store = self.store();
        self.inner.sweep_cancelled.store(true, Ordering::Release);
        store.clear();
    }
}
