//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path
//!     → router.rs (longest prefix → service name)
//!     → locator.rs (service name → base URL)
//!     → backend_name (base URL → circuit breaker key)
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Sort by prefix length
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod locator;
pub mod router;

pub use locator::{backend_name, ServiceLocator, StaticServiceLocator};
pub use router::{Route, Router};
