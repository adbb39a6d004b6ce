//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Credential validation settings.
    pub auth: AuthConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Per-backend circuit breaker configuration.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Shared counter store. Absent URL means per-instance limiting only.
    pub redis: RedisConfig,

    /// Backend services addressable by logical name.
    pub services: Vec<ServiceConfig>,

    /// Route definitions mapping path prefixes to services.
    pub routes: Vec<RouteConfig>,

    /// Origins allowed by CORS. Empty disables the CORS layer.
    pub cors_origins: Vec<String>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body buffered for forwarding.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Identity provider selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthProvider {
    /// JWKS-backed issuer (the FaultMaven auth service).
    #[default]
    FmAuthService,
    Supabase,
    Auth0,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::FmAuthService => "fm-auth-service",
            AuthProvider::Supabase => "supabase",
            AuthProvider::Auth0 => "auth0",
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub provider: AuthProvider,

    /// Base URL of the auth service; keys are fetched from
    /// `<service_url>/.well-known/jwks.json`.
    pub service_url: String,

    /// Expected `iss` claim.
    pub issuer: String,

    /// Expected `aud` claim.
    pub audience: String,

    /// How long a fetched signing key stays valid.
    pub jwks_cache_ttl_secs: u64,

    /// Timeout for a single key fetch.
    pub jwks_timeout_secs: u64,

    /// When false, requests without credentials run as the anonymous user.
    pub required: bool,

    pub anonymous_user_id: String,
    pub anonymous_user_email: String,
    pub anonymous_user_role: String,

    /// Path prefixes that never require credentials.
    pub public_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: AuthProvider::FmAuthService,
            service_url: "http://127.0.0.1:8001".to_string(),
            issuer: "https://auth.faultmaven.ai".to_string(),
            audience: "faultmaven-api".to_string(),
            jwks_cache_ttl_secs: 300,
            jwks_timeout_secs: 5,
            required: true,
            anonymous_user_id: "anonymous_admin".to_string(),
            anonymous_user_email: "admin@example.com".to_string(),
            anonymous_user_role: "admin".to_string(),
            public_paths: vec![
                "/health".to_string(),
                "/api/v1/auth/login".to_string(),
                "/api/v1/auth/dev-login".to_string(),
                "/api/v1/auth/register".to_string(),
                "/api/v1/auth/dev-register".to_string(),
                "/api/v1/auth/refresh".to_string(),
            ],
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client per minute.
    pub requests_per_minute: u32,

    /// Local bucket capacity. Defaults to twice the per-minute limit.
    pub burst_size: Option<u32>,

    /// Upper bound on tracked local buckets before idle ones are evicted.
    pub max_local_buckets: usize,
}

impl RateLimitConfig {
    pub fn effective_burst(&self) -> u32 {
        self.burst_size
            .unwrap_or_else(|| self.requests_per_minute.saturating_mul(2))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 60,
            burst_size: None,
            max_local_buckets: 100_000,
        }
    }
}

/// Circuit breaker configuration, shared by every backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,

    /// Consecutive failures that open a closed circuit.
    pub fail_threshold: u32,

    /// Seconds an open circuit waits before allowing a trial call.
    pub reset_timeout_secs: u64,

    /// Trial calls admitted (and successes required) while half-open.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fail_threshold: 5,
            reset_timeout_secs: 30,
            half_open_max_calls: 1,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time for a forwarded backend call, body included.
    pub backend_request_secs: u64,

    /// Interval between shared store reconnect/PING probes.
    pub store_probe_interval_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            backend_request_secs: 30,
            store_probe_interval_secs: 10,
        }
    }
}

/// Shared store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    /// e.g. `redis://127.0.0.1:6379/0`.
    pub url: Option<String>,

    /// Prefix for rate limit counter keys.
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: "ratelimit".to_string(),
        }
    }
}

/// A backend service reachable by logical name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,

    /// Base URL, e.g. `http://fm-case-service:8003`.
    pub url: String,
}

/// Route configuration mapping a path prefix to a service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix to match; the longest matching prefix wins.
    pub path_prefix: String,

    /// Logical service name to forward to.
    pub service: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Serve Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
