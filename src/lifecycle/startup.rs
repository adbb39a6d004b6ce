//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build every component in dependency order
//! - Hand the assembled `Gateway` to the HTTP server
//!
//! # Design Decisions
//! - Subsystems initialize in order, not concurrently
//! - `assemble` takes the validator and store as parameters so tests can
//!   substitute them without network collaborators

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::auth::{build_validator, TokenValidator};
use crate::config::validation::validate_config;
use crate::config::{ConfigError, GatewayConfig};
use crate::health::HealthChecker;
use crate::proxy::{Pipeline, RequestForwarder};
use crate::resilience::CircuitBreaker;
use crate::routing::{ServiceLocator, StaticServiceLocator};
use crate::security::RateLimiter;
use crate::store::{RedisStore, SharedStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("shared store error: {0}")]
    Store(#[from] StoreError),

    #[error("backend client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Every long-lived component of a running gateway.
pub struct Gateway {
    pub config: Arc<GatewayConfig>,
    pub pipeline: Arc<Pipeline>,
    pub limiter: Arc<RateLimiter>,
    pub health: Arc<HealthChecker>,
    pub store: Option<Arc<dyn SharedStore>>,
}

impl Gateway {
    /// Build a gateway from configuration, connecting to real collaborators.
    pub async fn build(config: GatewayConfig) -> Result<Self, StartupError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let validator = build_validator(&config.auth)?;
        tracing::info!(
            provider = validator.name(),
            required = config.auth.required,
            "Auth provider initialized"
        );

        let store: Option<Arc<dyn SharedStore>> = match &config.redis.url {
            Some(url) => Some(Arc::new(RedisStore::connect(url).await?)),
            None => {
                tracing::warn!("No shared store configured, rate limiting is per-instance");
                None
            }
        };

        Self::assemble(config, validator, store)
    }

    /// Wire components around an already-built validator and store.
    pub fn assemble(
        config: GatewayConfig,
        validator: Arc<dyn TokenValidator>,
        store: Option<Arc<dyn SharedStore>>,
    ) -> Result<Self, StartupError> {
        let limiter = Arc::new(RateLimiter::new(
            &config.rate_limit,
            config.redis.key_prefix.clone(),
            store.clone(),
        ));

        let breaker = Arc::new(CircuitBreaker::new(&config.circuit_breaker));
        let locator: Arc<dyn ServiceLocator> =
            Arc::new(StaticServiceLocator::from_config(&config.services)?);

        let forwarder = RequestForwarder::new(
            breaker.clone(),
            Duration::from_secs(config.timeouts.backend_request_secs),
        )?;
        let pipeline = Arc::new(Pipeline::new(&config, validator, locator.clone(), forwarder));
        let health = Arc::new(HealthChecker::new(store.clone(), breaker, locator));

        tracing::info!(
            services = config.services.len(),
            routes = config.routes.len(),
            "Gateway components initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            pipeline,
            limiter,
            health,
            store,
        })
    }
}
