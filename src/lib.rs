//! API gateway request pipeline.
//!
//! Authenticates callers against a JWKS-backed token validator, replaces
//! caller-supplied identity headers with trusted ones, rate limits per
//! client, and forwards to backends behind per-backend circuit breakers.

// Request path
pub mod auth;
pub mod http;
pub mod proxy;
pub mod routing;
pub mod security;

// Cross-cutting concerns
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod store;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
