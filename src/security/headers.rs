//! Identity header trust boundary.
//!
//! # Responsibilities
//! - Classify paths as public or protected
//! - Drop caller-supplied `X-User-*` / `X-Email-Verified` headers
//! - Produce the identity headers backends are allowed to trust
//!
//! # Design Decisions
//! - Reserved headers are dropped on every path, public ones included
//! - Matching is case-insensitive (header names are normalized to lowercase)
//! - The only source of identity headers is a `UserContext`

use axum::http::header::{HeaderName, InvalidHeaderValue};
use axum::http::HeaderMap;

use crate::auth::context::{UserContext, X_EMAIL_VERIFIED};

/// Prefix shared by every identity header the gateway produces.
pub const RESERVED_PREFIX: &str = "x-user-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// No credential required; no identity forwarded.
    Public,
    Protected,
}

/// Sanitized inbound headers and the trusted identity, kept apart until
/// merged for forwarding.
#[derive(Debug, Default)]
pub struct SanitizedHeaders {
    /// Inbound headers minus every reserved one.
    pub forwarded: HeaderMap,
    /// Identity headers derived from the `UserContext`, if any.
    pub identity: HeaderMap,
}

impl SanitizedHeaders {
    /// Flatten into one map; identity headers win.
    pub fn into_merged(self) -> HeaderMap {
        let mut headers = self.forwarded;
        for (name, value) in self.identity.iter() {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }
}

#[derive(Debug, Clone)]
pub struct HeaderGuard {
    public_paths: Vec<String>,
}

impl HeaderGuard {
    pub fn new(public_paths: Vec<String>) -> Self {
        Self { public_paths }
    }

    /// Public paths are matched by prefix.
    pub fn classify(&self, path: &str) -> PathClass {
        if self.public_paths.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            PathClass::Public
        } else {
            PathClass::Protected
        }
    }

    pub fn is_reserved(name: &HeaderName) -> bool {
        name.as_str().starts_with(RESERVED_PREFIX) || *name == X_EMAIL_VERIFIED
    }

    /// Build the header set to forward for `path`.
    pub fn sanitize(
        &self,
        path: &str,
        inbound: &HeaderMap,
        user: Option<&UserContext>,
    ) -> Result<SanitizedHeaders, InvalidHeaderValue> {
        let mut forwarded = HeaderMap::with_capacity(inbound.len());
        let mut stripped: Vec<&str> = Vec::new();

        for (name, value) in inbound.iter() {
            if Self::is_reserved(name) {
                if !stripped.contains(&name.as_str()) {
                    stripped.push(name.as_str());
                }
                continue;
            }
            forwarded.append(name.clone(), value.clone());
        }

        if !stripped.is_empty() {
            tracing::warn!(
                path,
                headers = ?stripped,
                public = self.classify(path) == PathClass::Public,
                "Header injection attempt, stripped reserved identity headers"
            );
        }

        let identity = match user {
            Some(user) => user.to_headers()?,
            None => HeaderMap::new(),
        };

        Ok(SanitizedHeaders {
            forwarded,
            identity,
        })
    }
}
