//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= fail_threshold
//! Open → Half-Open: first allow() after reset_timeout
//! Half-Open → Closed: half_open_max_calls trial successes
//! Half-Open → Open: any trial failure
//! ```
//!
//! # Design Decisions
//! - Per-backend circuit breaker (not global), created on first use
//! - Each record is mutated under its own map shard lock
//! - Fail fast in Open state (no waiting for timeout)
//! - Bounded trials in Half-Open (prevents hammering recovering backend)

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Default)]
struct CircuitRecord {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    opened_at: Option<Instant>,
    half_open_successes: u32,
    half_open_in_flight: u32,
    transitions: u64,
}

impl CircuitRecord {
    fn transition(&mut self, service: &str, to: CircuitState) {
        let from = self.state;
        self.state = to;
        self.half_open_successes = 0;
        self.half_open_in_flight = 0;
        self.transitions += 1;
        metrics::record_circuit_transition(service, to.as_str());

        match (from, to) {
            (CircuitState::Closed, CircuitState::Open) => tracing::error!(
                service,
                failures = self.failure_count,
                "Circuit breaker opened"
            ),
            _ => tracing::info!(
                service,
                from = from.as_str(),
                to = to.as_str(),
                "Circuit breaker state change"
            ),
        }
    }
}

/// Point-in-time view of one backend's circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_secs_ago: Option<f64>,
    pub opened_secs_ago: Option<f64>,
    /// State changes since the circuit was created.
    pub transitions: u64,
}

/// Per-backend circuit breakers keyed by service name.
pub struct CircuitBreaker {
    enabled: bool,
    fail_threshold: u32,
    reset_timeout: Duration,
    half_open_max_calls: u32,
    circuits: DashMap<String, CircuitRecord>,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        if !config.enabled {
            tracing::info!("Circuit breakers disabled");
        }

        Self {
            enabled: config.enabled,
            fail_threshold: config.fail_threshold.max(1),
            reset_timeout: Duration::from_secs(config.reset_timeout_secs),
            half_open_max_calls: config.half_open_max_calls.max(1),
            circuits: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a call to `service` may proceed.
    pub fn allow(&self, service: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let mut record = self.circuits.entry(service.to_string()).or_default();
        match record.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = record.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::MAX);
                if elapsed >= self.reset_timeout {
                    record.transition(service, CircuitState::HalfOpen);
                    record.half_open_in_flight = 1;
                    true
                } else {
                    tracing::warn!(service, "Circuit breaker open, rejecting call");
                    false
                }
            }
            CircuitState::HalfOpen => {
                if record.half_open_in_flight < self.half_open_max_calls {
                    record.half_open_in_flight += 1;
                    true
                } else {
                    tracing::warn!(service, "Circuit breaker half-open, trial budget in use");
                    false
                }
            }
        }
    }

    pub fn record_success(&self, service: &str) {
        if !self.enabled {
            return;
        }

        let mut record = self.circuits.entry(service.to_string()).or_default();
        match record.state {
            CircuitState::Closed => record.failure_count = 0,
            CircuitState::HalfOpen => {
                record.half_open_successes += 1;
                record.half_open_in_flight = record.half_open_in_flight.saturating_sub(1);
                if record.half_open_successes >= self.half_open_max_calls {
                    record.failure_count = 0;
                    record.opened_at = None;
                    record.transition(service, CircuitState::Closed);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, service: &str) {
        if !self.enabled {
            return;
        }

        let mut record = self.circuits.entry(service.to_string()).or_default();
        let now = Instant::now();
        record.failure_count += 1;
        record.last_failure = Some(now);

        match record.state {
            CircuitState::HalfOpen => {
                record.opened_at = Some(now);
                record.transition(service, CircuitState::Open);
            }
            CircuitState::Closed if record.failure_count >= self.fail_threshold => {
                record.opened_at = Some(now);
                record.transition(service, CircuitState::Open);
            }
            _ => {}
        }
    }

    /// Current state; unknown services are closed.
    pub fn state(&self, service: &str) -> CircuitState {
        self.circuits
            .get(service)
            .map(|record| record.state)
            .unwrap_or_default()
    }

    pub fn stats(&self, service: &str) -> CircuitStats {
        match self.circuits.get(service) {
            Some(record) => CircuitStats {
                state: record.state,
                failure_count: record.failure_count,
                last_failure_secs_ago: record.last_failure.map(|t| t.elapsed().as_secs_f64()),
                opened_secs_ago: record.opened_at.map(|t| t.elapsed().as_secs_f64()),
                transitions: record.transitions,
            },
            None => CircuitStats {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_secs_ago: None,
                opened_secs_ago: None,
                transitions: 0,
            },
        }
    }
}
