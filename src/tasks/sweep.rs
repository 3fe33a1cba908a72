//! Periodic Expiry Sweep
//!
//! Background task that eagerly reclaims expired cache entries, so memory
//! held by entries nobody reads again is freed even without further `get`
//! calls. Lazy expiry in the store keeps the cache correct when the sweep
//! is delayed or never started; this task only bounds idle memory.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;

/// Spawns a background task that sweeps expired entries on a fixed interval.
///
/// Each pass takes the same store mutex as foreground operations, so a
/// sweep never races a concurrent `set`/`get`. [`Cache::destroy`] aborts
/// the returned handle, which stops the task at its next sleep; a pass
/// that already woke checks the cancellation flag under the store mutex
/// and exits instead of sweeping, so no sweep runs after `destroy`
/// returns.
///
/// # Arguments
/// * `cache` - Handle to the cache being swept
/// * `interval` - Delay between sweep passes
pub fn spawn_sweep_task(cache: Cache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "starting expiry sweep task");

        loop {
            tokio::time::sleep(interval).await;

            match cache.sweep_pass() {
                Some(removed) if removed > 0 => {
                    info!(removed, "expiry sweep reclaimed entries");
                }
                Some(_) => {
                    debug!("expiry sweep found no expired entries");
                }
                None => {
                    debug!("expiry sweep cancelled");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Value;
    use crate::config::CacheConfig;

    fn cache() -> Cache {
        Cache::new(CacheConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let cache = cache();
        cache.set(
            "expire_soon",
            Value::from("value"),
            Some(Duration::from_millis(50)),
        );

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(100));

        // Entry expires at 50ms; the sweep fires at 100ms. No get() is ever
        // issued, so only the sweep can reclaim it.
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(cache.len(), 0, "expired entry should be swept without access");
        assert_eq!(cache.stats().expirations, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let cache = cache();
        cache.set(
            "long_lived",
            Value::from("value"),
            Some(Duration::from_secs(3600)),
        );

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.get("long_lived"), Some(Value::from("value")));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let cache = cache();
        let handle = spawn_sweep_task(cache, Duration::from_millis(50));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
