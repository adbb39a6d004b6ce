//! Authenticated caller identity.

use axum::http::header::{HeaderName, HeaderValue, InvalidHeaderValue};
use axum::http::HeaderMap;
use serde::Serialize;

pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const X_USER_EMAIL: HeaderName = HeaderName::from_static("x-user-email");
pub const X_USER_ROLES: HeaderName = HeaderName::from_static("x-user-roles");
pub const X_EMAIL_VERIFIED: HeaderName = HeaderName::from_static("x-email-verified");

/// Identity of the caller for one request.
///
/// Built by a [`TokenValidator`](crate::auth::TokenValidator) from verified
/// claims, or from configuration when anonymous access is allowed. Backends
/// trust these values only because the gateway is the sole producer of the
/// headers they encode to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserContext {
    user_id: String,
    email: String,
    roles: Vec<String>,
    email_verified: bool,
}

impl UserContext {
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        roles: Vec<String>,
        email_verified: bool,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            roles,
            email_verified,
        }
    }

    /// The identity used when credentials are optional and none were sent.
    pub fn anonymous(user_id: &str, email: &str, role: &str) -> Self {
        Self::new(user_id, email, vec![role.to_string()], true)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    /// Encode as the four identity headers sent to backends.
    ///
    /// Roles are a JSON array; verification is `"true"` or `"false"`. Fails
    /// only when a claim contains bytes that cannot appear in a header.
    pub fn to_headers(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let roles = serde_json::to_string(&self.roles).unwrap_or_else(|_| "[]".to_string());

        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(X_USER_ID, HeaderValue::from_str(&self.user_id)?);
        headers.insert(X_USER_EMAIL, HeaderValue::from_str(&self.email)?);
        headers.insert(X_USER_ROLES, HeaderValue::from_str(&roles)?);
        headers.insert(
            X_EMAIL_VERIFIED,
            HeaderValue::from_static(if self.email_verified { "true" } else { "false" }),
        );
        Ok(headers)
    }
}
