//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → circuit_breaker.rs allow(service)? else fail fast (503)
//!     → forwarder sends with a deadline
//!     → circuit_breaker.rs record_success / record_failure
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Circuit breaker prevents cascading failures
//! - Breaker state is per process; a restart closes every circuit

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitState, CircuitStats};
