//! Cache Module
//!
//! In-memory response cache with TTL expiration, byte-budget LRU eviction
//! and cycle-safe size estimation.

mod entry;
mod handle;
mod sizing;
mod stats;
mod store;
mod value;


// Re-export public types
pub use entry::CacheEntry;
pub use handle::Cache;
pub use sizing::{estimate_entry_size, estimate_value_size, CIRCULAR_REF_COST, ENTRY_OVERHEAD};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;
pub use value::{SharedValue, Value};
