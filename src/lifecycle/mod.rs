//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → auth validator → shared store → limiter/breaker/locator
//!            → forwarder → pipeline + health checker
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server drains, store probe exits
//! ```
//!
//! # Design Decisions
//! - Fail fast: invalid config or an unparsable store URL aborts startup
//! - An unreachable store does not abort startup (degraded mode)
//! - Components are built once and shared by `Arc`

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Gateway, StartupError};
