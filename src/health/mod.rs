//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health        → liveness (process answers; never rate limited)
//! GET /health/ready  → checker.rs
//!     → shared store PING
//!     → circuit breaker states per located backend
//!     → service locator
//!     → aggregate: unhealthy > degraded > healthy
//! ```
//!
//! # Design Decisions
//! - Readiness fails (503) only on unhealthy components
//! - A missing shared store degrades readiness; it never fails it

pub mod checker;

pub use checker::{ComponentHealth, HealthChecker, HealthReport, HealthStatus};

pub const LIVENESS_PATH: &str = "/health";
pub const READINESS_PATH: &str = "/health/ready";
