//! Per-client rate limiting.
//!
//! # Responsibilities
//! - Fixed one-minute window counters in the shared store
//! - Token bucket fallback when the store is unavailable
//! - `X-RateLimit-*` response headers
//!
//! # Design Decisions
//! - Backend chosen per call from current store availability
//! - Store errors fail open: the request passes without headers
//! - Local buckets are bounded; full buckets are evicted first since a
//!   fresh bucket behaves identically
//! - Eviction sweeps run at most once per `SWEEP_INTERVAL`, so a map held
//!   over capacity by active clients is not rescanned on every request

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::health::LIVENESS_PATH;
use crate::http::request::client_identifier;
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::store::SharedStore;

/// Fixed window length for shared counters.
pub const WINDOW_SECS: u64 = 60;
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Quota state reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Window reset as Unix seconds; shared-store mode only.
    pub reset: Option<i64>,
}

impl RateLimitInfo {
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        if let Some(reset) = self.reset {
            headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// `None` when limiting is disabled or the store failed.
    pub info: Option<RateLimitInfo>,
}

impl RateDecision {
    fn unmetered() -> Self {
        Self {
            allowed: true,
            info: None,
        }
    }
}

/// A token bucket refilled continuously.
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, capacity: f64, refill_rate: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        self.refill(capacity, refill_rate, now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct RateLimiter {
    enabled: bool,
    limit: u32,
    burst: f64,
    refill_rate: f64,
    max_local_buckets: usize,
    key_prefix: String,
    store: Option<Arc<dyn SharedStore>>,
    buckets: DashMap<String, TokenBucket>,
    last_sweep: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(
        config: &RateLimitConfig,
        key_prefix: impl Into<String>,
        store: Option<Arc<dyn SharedStore>>,
    ) -> Self {
        let limit = config.requests_per_minute;
        tracing::info!(
            enabled = config.enabled,
            requests_per_minute = limit,
            burst = config.effective_burst(),
            shared_store = store.is_some(),
            "Rate limiter initialized"
        );

        Self {
            enabled: config.enabled,
            limit,
            burst: f64::from(config.effective_burst().max(1)),
            refill_rate: f64::from(limit) / WINDOW_SECS as f64,
            max_local_buckets: config.max_local_buckets.max(1),
            key_prefix: key_prefix.into(),
            store,
            buckets: DashMap::new(),
            last_sweep: Mutex::new(None),
        }
    }

    /// Count one request for `identifier` and decide whether it may proceed.
    pub async fn check(&self, identifier: &str) -> RateDecision {
        if !self.enabled {
            return RateDecision::unmetered();
        }

        match &self.store {
            Some(store) if store.is_available() => self.check_shared(store.as_ref(), identifier).await,
            _ => self.check_local(identifier),
        }
    }

    async fn check_shared(&self, store: &dyn SharedStore, identifier: &str) -> RateDecision {
        let key = format!("{}:{}", self.key_prefix, identifier);
        match store.incr_with_expiry(&key, WINDOW_SECS).await {
            Ok(count) => {
                let used = u32::try_from(count).unwrap_or(u32::MAX);
                let allowed = used <= self.limit;
                if !allowed {
                    metrics::record_rate_limited("shared");
                }
                RateDecision {
                    allowed,
                    info: Some(RateLimitInfo {
                        limit: self.limit,
                        remaining: self.limit.saturating_sub(used),
                        reset: Some(chrono::Utc::now().timestamp() + WINDOW_SECS as i64),
                    }),
                }
            }
            Err(e) => {
                tracing::warn!(client = %identifier, error = %e, "Rate limit store error, allowing request");
                RateDecision::unmetered()
            }
        }
    }

    fn check_local(&self, identifier: &str) -> RateDecision {
        let now = Instant::now();

        // The map guard must be released before eviction touches other shards.
        let (allowed, remaining) = {
            let mut bucket = match self.buckets.get_mut(identifier) {
                Some(bucket) => bucket,
                None => self
                    .buckets
                    .entry(identifier.to_string())
                    .or_insert_with(|| TokenBucket::full(self.burst, now)),
            };
            let allowed = bucket.try_acquire(self.burst, self.refill_rate, now);
            (allowed, bucket.tokens.floor() as u32)
        };

        if self.buckets.len() > self.max_local_buckets && self.sweep_due(now) {
            self.evict_full_buckets(now);
        }

        if !allowed {
            metrics::record_rate_limited("local");
        }

        RateDecision {
            allowed,
            info: Some(RateLimitInfo {
                limit: self.limit,
                remaining,
                reset: None,
            }),
        }
    }

    /// Claim the next sweep slot. Contended callers skip; one sweep is enough.
    fn sweep_due(&self, now: Instant) -> bool {
        let Ok(mut last) = self.last_sweep.try_lock() else {
            return false;
        };
        match *last {
            Some(at) if now.duration_since(at) < SWEEP_INTERVAL => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    fn evict_full_buckets(&self, now: Instant) {
        let (burst, rate) = (self.burst, self.refill_rate);
        self.buckets.retain(|_, bucket| {
            bucket.refill(burst, rate, now);
            bucket.tokens < burst
        });

        let remaining = self.buckets.len();
        if remaining > self.max_local_buckets {
            tracing::warn!(
                buckets = remaining,
                max = self.max_local_buckets,
                "Local rate limit buckets over capacity, none idle to evict"
            );
        }
    }

    #[cfg(test)]
    fn local_bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Rate limiting middleware; every path except liveness is counted.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == LIVENESS_PATH {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client = client_identifier(request.headers(), peer);
    let decision = limiter.check(&client).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
        GatewayError::RateLimited.into_response()
    };

    if let Some(info) = decision.info {
        info.apply(response.headers_mut());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::advance;

    fn config(requests_per_minute: u32, burst_size: Option<u32>) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            requests_per_minute,
            burst_size,
            max_local_buckets: 100_000,
        }
    }

    /// In-memory counters that ignore expiry.
    #[derive(Default)]
    struct MemoryStore {
        counters: Mutex<HashMap<String, i64>>,
        available: bool,
        failing: bool,
    }

    impl MemoryStore {
        fn available() -> Self {
            Self {
                available: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl SharedStore for MemoryStore {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn incr_with_expiry(&self, key: &str, _ttl_secs: u64) -> Result<i64, StoreError> {
            if self.failing {
                return Err(StoreError::Unavailable);
            }
            let mut counters = self.counters.lock().unwrap();
            let count = counters.entry(key.to_string()).or_insert(0);
            *count += 1;
            Ok(*count)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.counters.lock().unwrap().get(key).map(|c| c.to_string()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Option<u64>) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_burst_then_deny() {
        let limiter = RateLimiter::new(&config(60, Some(120)), "ratelimit", None);

        for i in 0..120 {
            assert!(limiter.check("1.2.3.4").await.allowed, "request {i} denied");
        }
        let denied = limiter.check("1.2.3.4").await;
        assert!(!denied.allowed);
        assert_eq!(
            denied.info,
            Some(RateLimitInfo {
                limit: 60,
                remaining: 0,
                reset: None
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_burst_is_twice_limit() {
        let limiter = RateLimiter::new(&config(5, None), "ratelimit", None);

        let allowed = allowed_count(&limiter, "c", 11).await;
        assert_eq!(allowed, 10);
    }

    async fn allowed_count(limiter: &RateLimiter, id: &str, calls: usize) -> usize {
        let mut allowed = 0;
        for _ in 0..calls {
            if limiter.check(id).await.allowed {
                allowed += 1;
            }
        }
        allowed
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_refill_rate() {
        let limiter = RateLimiter::new(&config(60, Some(2)), "ratelimit", None);

        assert_eq!(allowed_count(&limiter, "c", 3).await, 2);

        // 60/min refills one token per second.
        advance(Duration::from_secs(1)).await;
        assert_eq!(allowed_count(&limiter, "c", 2).await, 1);

        // Never exceeds the burst size however long the client is idle.
        advance(Duration::from_secs(3600)).await;
        assert_eq!(allowed_count(&limiter, "c", 3).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::new(&config(60, Some(1)), "ratelimit", None);

        assert!(limiter.check("a").await.allowed);
        assert!(!limiter.check("a").await.allowed);
        assert!(limiter.check("b").await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_buckets_evicted_over_capacity() {
        let mut cfg = config(60, Some(10));
        cfg.max_local_buckets = 2;
        let limiter = RateLimiter::new(&cfg, "ratelimit", None);

        limiter.check("a").await;
        limiter.check("b").await;
        advance(Duration::from_secs(5)).await;

        limiter.check("c").await;
        assert_eq!(limiter.local_bucket_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_buckets_kept_over_capacity() {
        let mut cfg = config(60, Some(10));
        cfg.max_local_buckets = 2;
        let limiter = RateLimiter::new(&cfg, "ratelimit", None);

        limiter.check("a").await;
        limiter.check("b").await;
        limiter.check("c").await;
        assert_eq!(limiter.local_bucket_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_sweeps_are_throttled() {
        let mut cfg = config(6000, Some(10));
        cfg.max_local_buckets = 2;
        let limiter = RateLimiter::new(&cfg, "ratelimit", None);

        limiter.check("a").await;
        limiter.check("b").await;
        limiter.check("c").await;
        assert_eq!(limiter.local_bucket_count(), 3);

        // Buckets refill within the interval but are not rescanned yet.
        advance(Duration::from_millis(500)).await;
        limiter.check("d").await;
        assert_eq!(limiter.local_bucket_count(), 4);

        advance(Duration::from_millis(500)).await;
        limiter.check("e").await;
        assert_eq!(limiter.local_bucket_count(), 1);
    }

    #[tokio::test]
    async fn test_shared_store_counts_per_window() {
        let store = Arc::new(MemoryStore::available());
        let limiter = RateLimiter::new(&config(3, None), "ratelimit", Some(store.clone()));

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check("10.0.0.1").await;
            assert!(decision.allowed);
            let info = decision.info.unwrap();
            assert_eq!(info.remaining, expected_remaining);
            assert!(info.reset.is_some());
        }

        let denied = limiter.check("10.0.0.1").await;
        assert!(!denied.allowed);
        assert_eq!(denied.info.unwrap().remaining, 0);
        assert_eq!(
            store.get("ratelimit:10.0.0.1").await.unwrap(),
            Some("4".to_string())
        );
    }

    #[tokio::test]
    async fn test_store_error_fails_open() {
        let store = Arc::new(MemoryStore {
            available: true,
            failing: true,
            ..MemoryStore::default()
        });
        let limiter = RateLimiter::new(&config(1, None), "ratelimit", Some(store));

        for _ in 0..5 {
            let decision = limiter.check("10.0.0.1").await;
            assert!(decision.allowed);
            assert!(decision.info.is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_store_uses_local_buckets() {
        let store = Arc::new(MemoryStore::default());
        let limiter = RateLimiter::new(&config(60, Some(1)), "ratelimit", Some(store.clone()));

        assert!(limiter.check("a").await.allowed);
        assert!(!limiter.check("a").await.allowed);
        assert!(store.counters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_is_unmetered() {
        let mut cfg = config(1, None);
        cfg.enabled = false;
        let limiter = RateLimiter::new(&cfg, "ratelimit", None);

        for _ in 0..10 {
            assert_eq!(limiter.check("a").await, RateDecision::unmetered());
        }
    }

    #[test]
    fn test_info_headers() {
        let mut headers = HeaderMap::new();
        RateLimitInfo {
            limit: 60,
            remaining: 59,
            reset: Some(1_700_000_000),
        }
        .apply(&mut headers);

        assert_eq!(headers[X_RATELIMIT_LIMIT], "60");
        assert_eq!(headers[X_RATELIMIT_REMAINING], "59");
        assert_eq!(headers[X_RATELIMIT_RESET], "1700000000");
    }
}
