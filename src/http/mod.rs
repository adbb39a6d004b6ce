//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request-id, trace, CORS, rate limit layer)
//!     → request.rs (request ID, client identifier)
//!     → proxy::Pipeline (auth, header guard, route, forward)
//!     → response.rs (error bodies, hop-by-hop stripping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::GatewayError;
pub use server::{AppState, HttpServer};
