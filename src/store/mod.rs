//! Shared key-value store subsystem.
//!
//! # Data Flow
//! ```text
//! RateLimiter / readiness
//!     → SharedStore (trait)
//!     → redis.rs (ConnectionManager, Lua INCR+EXPIRE)
//!
//! probe.rs:
//!     Periodic timer → SharedStore::probe → availability flag
//! ```
//!
//! # Design Decisions
//! - The gateway runs without the store; callers check `is_available`
//!   per call and fall back to local state
//! - A failed command flips the store unavailable; only the probe
//!   flips it back

pub mod probe;
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

pub use self::probe::spawn_probe;
pub use self::redis::RedisStore;

/// Errors from the shared store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("shared store is not connected")]
    Unavailable,

    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Key-value operations the gateway needs from its shared store.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Whether the last known interaction with the store succeeded.
    fn is_available(&self) -> bool;

    /// Atomically increment `key`, setting `ttl_secs` expiry when the
    /// counter is created. Returns the new count.
    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> Result<i64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), StoreError>;

    /// Re-check connectivity and update availability.
    async fn probe(&self) -> bool {
        self.ping().await.is_ok()
    }
}
