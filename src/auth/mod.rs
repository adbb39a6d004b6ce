//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → validator.rs (extract credential, dispatch to provider)
//!     → jwks.rs (cached signing key, signature + claim checks)
//!     → context.rs (UserContext → X-User-* headers)
//! ```
//!
//! # Design Decisions
//! - Provider chosen once at startup; unknown providers never reach requests
//! - Every failure is a single 401-class error distinguishable by message
//! - UserContext is immutable and request-scoped

pub mod context;
pub mod error;
pub mod jwks;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use context::UserContext;
pub use error::AuthError;
pub use jwks::JwksValidator;
pub use validator::{build_validator, extract_bearer, TokenValidator};
