//! Redis-backed shared store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::store::{SharedStore, StoreError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// INCR, then EXPIRE only when this call created the counter.
const INCR_WITH_EXPIRY: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// Redis client with lazy (re)connection and an availability flag.
pub struct RedisStore {
    client: redis::Client,
    conn: ArcSwapOption<ConnectionManager>,
    available: AtomicBool,
}

impl RedisStore {
    /// Create the store and try to connect once.
    ///
    /// Only an unparsable URL is an error. An unreachable server leaves
    /// the store unavailable until a probe succeeds.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let store = Self {
            client: redis::Client::open(url)?,
            conn: ArcSwapOption::empty(),
            available: AtomicBool::new(false),
        };

        if store.establish().await {
            tracing::info!("Connected to shared store");
        } else {
            tracing::warn!("Shared store unreachable, rate limiting uses in-memory buckets");
        }
        Ok(store)
    }

    async fn establish(&self) -> bool {
        let manager = tokio::time::timeout(
            CONNECT_TIMEOUT,
            ConnectionManager::new(self.client.clone()),
        )
        .await;

        match manager {
            Ok(Ok(manager)) => {
                self.conn.store(Some(Arc::new(manager)));
                self.available.store(true, Ordering::SeqCst);
                true
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Shared store connect failed");
                false
            }
            Err(_) => {
                tracing::debug!("Shared store connect timed out");
                false
            }
        }
    }

    fn connection(&self) -> Result<ConnectionManager, StoreError> {
        self.conn
            .load_full()
            .map(|manager| (*manager).clone())
            .ok_or(StoreError::Unavailable)
    }

    fn mark_unavailable(&self, error: &redis::RedisError) {
        if self.available.swap(false, Ordering::SeqCst) {
            tracing::warn!(error = %error, "Shared store marked unavailable");
        }
    }

    fn observe<T>(&self, result: redis::RedisResult<T>) -> Result<T, StoreError> {
        result.map_err(|e| {
            self.mark_unavailable(&e);
            StoreError::Redis(e)
        })
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> Result<i64, StoreError> {
        let mut conn = self.connection()?;
        let count: redis::RedisResult<i64> = redis::Script::new(INCR_WITH_EXPIRY)
            .key(key)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await;
        self.observe(count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        self.observe(pong).map(|_| ())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection()?;
        let value: redis::RedisResult<Option<String>> = conn.get(key).await;
        self.observe(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let result: redis::RedisResult<()> = match ttl_secs {
            Some(ttl) => conn.set_ex(key, value, ttl).await,
            None => conn.set(key, value).await,
        };
        self.observe(result)
    }

    async fn probe(&self) -> bool {
        if self.conn.load().is_none() {
            return self.establish().await;
        }

        let was_available = self.is_available();
        let healthy = self.ping().await.is_ok();
        if healthy && !was_available {
            self.available.store(true, Ordering::SeqCst);
            tracing::info!("Shared store reachable again");
        }
        healthy
    }
}
