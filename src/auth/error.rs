//! Authentication errors.

use thiserror::Error;

/// Why a credential was not turned into a [`UserContext`](crate::auth::UserContext).
///
/// Every variant surfaces to the client as HTTP 401; only a missing
/// credential is reported with a distinct error kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingCredential,

    #[error("Invalid authorization header format. Expected: Bearer <token>")]
    MalformedHeader,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Cannot fetch signing keys: {0}")]
    KeyFetch(String),

    #[error("Invalid JWKS: {0}")]
    InvalidKeySet(String),
}

impl AuthError {
    /// Machine-readable kind used in the JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_authorization",
            _ => "invalid_token",
        }
    }
}
