//! Registry response cache
//!
//! In-process cache shared by the package lookup and search operations of
//! the aggregation server: size-bounded, TTL-aware, with least-recently-used
//! eviction and approximate memory accounting. Callers compute a key, `get`,
//! and on a miss fetch upstream and `set` with a TTL; the store keeps memory
//! bounded through lazy expiry, a periodic sweep and byte-budget eviction.

pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod tasks;

pub use cache::{Cache, CacheStore, StatsSnapshot, Value};
pub use config::CacheConfig;
pub use error::ConfigError;
pub use tasks::spawn_sweep_task;
