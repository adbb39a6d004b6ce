//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client counter, router layer)
//!     → pipeline authenticates
//!     → headers.rs (drop reserved identity headers, add trusted ones)
//!     → forwarder
//! ```
//!
//! # Design Decisions
//! - No trust in client-supplied identity headers, on any path
//! - Rate limiting fails open when the shared store errors

pub mod headers;
pub mod rate_limit;

pub use headers::{HeaderGuard, PathClass, SanitizedHeaders};
pub use rate_limit::{rate_limit_middleware, RateDecision, RateLimitInfo, RateLimiter};
