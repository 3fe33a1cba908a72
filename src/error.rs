//! Error types for the response cache
//!
//! Only misconfiguration is an error here: a cache miss is a normal
//! control-flow outcome and is represented as `None`, never raised.

use thiserror::Error;

// == Config Error Enum ==
/// Construction-time configuration errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Byte budget of zero would make the eviction loop spin forever
    #[error("cache byte budget (max_size) must be greater than zero")]
    ZeroBudget,

    /// A zero default TTL would expire every entry on insertion
    #[error("default TTL must be greater than zero")]
    ZeroTtl,

    /// The periodic sweep cannot run on a zero interval
    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,
}
