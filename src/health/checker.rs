//! Liveness and readiness reports.
//!
//! # Responsibilities
//! - Liveness: the process answers
//! - Readiness: aggregate shared store, circuit breakers and service
//!   location into one status
//!
//! # Design Decisions
//! - Any unhealthy component makes the gateway unhealthy and not ready
//! - Degraded components keep the gateway ready (reduced capability)

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::resilience::{CircuitBreaker, CircuitState};
use crate::routing::{backend_name, ServiceLocator};
use crate::store::SharedStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: &'static str,
    pub status: HealthStatus,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub ready: bool,
    pub timestamp: String,
    pub components: Vec<ComponentHealth>,
}

impl HealthReport {
    fn aggregate(components: Vec<ComponentHealth>) -> Self {
        let status = components
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            ready: status != HealthStatus::Unhealthy,
            timestamp: chrono::Utc::now().to_rfc3339(),
            components,
        }
    }
}

pub struct HealthChecker {
    store: Option<Arc<dyn SharedStore>>,
    breaker: Arc<CircuitBreaker>,
    locator: Arc<dyn ServiceLocator>,
}

impl HealthChecker {
    pub fn new(
        store: Option<Arc<dyn SharedStore>>,
        breaker: Arc<CircuitBreaker>,
        locator: Arc<dyn ServiceLocator>,
    ) -> Self {
        Self {
            store,
            breaker,
            locator,
        }
    }

    pub fn liveness() -> Value {
        json!({
            "status": HealthStatus::Healthy,
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        })
    }

    pub async fn readiness(&self) -> HealthReport {
        let report = HealthReport::aggregate(vec![
            self.check_store().await,
            self.check_circuit_breakers(),
            self.check_service_registry(),
        ]);

        if !report.ready {
            tracing::warn!(status = ?report.status, "Readiness check failed");
        }
        report
    }

    async fn check_store(&self) -> ComponentHealth {
        let Some(store) = &self.store else {
            return ComponentHealth {
                name: "redis",
                status: HealthStatus::Degraded,
                message: "Redis not configured (rate limiting is per-instance)".to_string(),
                details: json!({ "available": false, "configured": false }),
            };
        };

        if !store.is_available() {
            return ComponentHealth {
                name: "redis",
                status: HealthStatus::Degraded,
                message: "Redis not available (rate limiting degraded to in-memory)".to_string(),
                details: json!({ "available": false, "configured": true }),
            };
        }

        match store.ping().await {
            Ok(()) => ComponentHealth {
                name: "redis",
                status: HealthStatus::Healthy,
                message: "Redis is responsive".to_string(),
                details: json!({ "available": true }),
            },
            Err(e) => {
                tracing::error!(error = %e, "Redis health check failed");
                ComponentHealth {
                    name: "redis",
                    status: HealthStatus::Unhealthy,
                    message: format!("Redis ping failed: {e}"),
                    details: json!({ "available": false, "error": e.to_string() }),
                }
            }
        }
    }

    fn check_circuit_breakers(&self) -> ComponentHealth {
        if !self.breaker.is_enabled() {
            return ComponentHealth {
                name: "circuit_breakers",
                status: HealthStatus::Healthy,
                message: "Circuit breakers disabled".to_string(),
                details: json!({ "enabled": false }),
            };
        }

        let backends: Vec<String> = self
            .locator
            .services()
            .iter()
            .filter_map(|name| self.locator.resolve(name))
            .map(|url| backend_name(&url))
            .collect();

        let mut open = Vec::new();
        let mut half_open = Vec::new();
        let mut stats = serde_json::Map::new();
        for backend in &backends {
            let backend_stats = self.breaker.stats(backend);
            match backend_stats.state {
                CircuitState::Open => open.push(backend.clone()),
                CircuitState::HalfOpen => half_open.push(backend.clone()),
                CircuitState::Closed => {}
            }
            stats.insert(backend.clone(), json!(backend_stats));
        }

        let (status, message) = if !open.is_empty() {
            (HealthStatus::Degraded, format!("{} service(s) unavailable", open.len()))
        } else if !half_open.is_empty() {
            (
                HealthStatus::Degraded,
                format!("{} service(s) testing recovery", half_open.len()),
            )
        } else {
            (HealthStatus::Healthy, "All services available".to_string())
        };

        ComponentHealth {
            name: "circuit_breakers",
            status,
            message,
            details: json!({
                "open_circuits": open,
                "half_open_circuits": half_open,
                "total_services": backends.len(),
                "services": stats,
            }),
        }
    }

    fn check_service_registry(&self) -> ComponentHealth {
        let services = self.locator.services();
        let resolved = services
            .iter()
            .filter(|name| self.locator.resolve(name).is_some())
            .count();

        if resolved == 0 {
            return ComponentHealth {
                name: "service_registry",
                status: HealthStatus::Unhealthy,
                message: "No backend services resolve".to_string(),
                details: json!({ "services": services }),
            };
        }

        ComponentHealth {
            name: "service_registry",
            status: HealthStatus::Healthy,
            message: "Service discovery operational".to_string(),
            details: json!({ "services": services, "resolved": resolved }),
        }
    }
}
