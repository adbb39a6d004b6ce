//! Proxy subsystem: the authenticated path from inbound request to backend.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → pipeline.rs (auth, header guard, route lookup)
//!     → forwarder.rs (circuit breaker gate, backend call, outcome report)
//!     → response to client
//! ```
//!
//! # Design Decisions
//! - Components are built once at startup and shared by `Arc`
//! - Every failure is a typed `GatewayError`; the HTTP layer renders it

pub mod forwarder;
pub mod pipeline;

pub use forwarder::{OutboundRequest, RequestForwarder};
pub use pipeline::Pipeline;
