//! Per-request decision sequence for proxied traffic.
//!
//! Rate limiting runs before this as a router layer (see
//! [`rate_limit_middleware`](crate::security::rate_limit::rate_limit_middleware))
//! so that it also covers local endpoints. The pipeline then:
//!
//! ```text
//! classify path ──public──────────────────────────┐
//!      │protected                                 │
//!      ▼                                          │
//! Authorization header? ──none──▶ required? 401 : anonymous
//!      │                                          │
//!      ▼                                          │
//! TokenValidator::validate ──err──▶ 401           │
//!      │                                          │
//!      ▼                                          ▼
//! route → locate → HeaderGuard::sanitize → RequestForwarder::forward
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use axum::response::Response;

use crate::auth::{extract_bearer, AuthError, TokenValidator, UserContext};
use crate::config::GatewayConfig;
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::proxy::forwarder::{OutboundRequest, RequestForwarder};
use crate::routing::{Router, ServiceLocator};
use crate::security::headers::{HeaderGuard, PathClass};

pub struct Pipeline {
    validator: Arc<dyn TokenValidator>,
    guard: HeaderGuard,
    router: Router,
    locator: Arc<dyn ServiceLocator>,
    forwarder: RequestForwarder,
    auth_required: bool,
    anonymous: UserContext,
    max_body_bytes: usize,
}

impl Pipeline {
    pub fn new(
        config: &GatewayConfig,
        validator: Arc<dyn TokenValidator>,
        locator: Arc<dyn ServiceLocator>,
        forwarder: RequestForwarder,
    ) -> Self {
        let auth = &config.auth;
        if !auth.required {
            tracing::warn!(
                user_id = %auth.anonymous_user_id,
                "Authentication optional, requests without credentials run as the anonymous user"
            );
        }

        Self {
            validator,
            guard: HeaderGuard::new(auth.public_paths.clone()),
            router: Router::from_config(config.routes.clone()),
            locator,
            forwarder,
            auth_required: auth.required,
            anonymous: UserContext::anonymous(
                &auth.anonymous_user_id,
                &auth.anonymous_user_email,
                &auth.anonymous_user_role,
            ),
            max_body_bytes: config.listener.max_body_bytes,
        }
    }

    /// Authenticate, sanitize and forward one request.
    pub async fn dispatch(&self, request: Request<Body>) -> Result<Response, GatewayError> {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path();

        let user = match self.guard.classify(path) {
            PathClass::Public => None,
            PathClass::Protected => Some(self.authenticate(&parts.headers).await.map_err(|e| {
                metrics::record_auth_failure(e.kind());
                tracing::warn!(path, error = %e, "Authentication failed");
                e
            })?),
        };

        let route = self
            .router
            .match_path(path)
            .ok_or_else(|| GatewayError::NoRoute(path.to_string()))?;
        let base_url = self.locator.resolve(&route.service).ok_or_else(|| {
            GatewayError::Internal(format!("service '{}' has no location", route.service))
        })?;

        let sanitized = self
            .guard
            .sanitize(path, &parts.headers, user.as_ref())
            .map_err(|e| GatewayError::Internal(format!("identity header encoding: {e}")))?;

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|_| GatewayError::PayloadTooLarge(self.max_body_bytes))?;

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(path);

        self.forwarder
            .forward(
                OutboundRequest {
                    method: parts.method.clone(),
                    headers: sanitized.into_merged(),
                    body,
                },
                &base_url,
                path_and_query,
            )
            .await
    }

    /// Resolve the caller for a protected path.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<UserContext, AuthError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            if self.auth_required {
                return Err(AuthError::MissingCredential);
            }
            tracing::debug!("No credential, using anonymous identity");
            return Ok(self.anonymous.clone());
        };

        let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
        let token = extract_bearer(value)?;
        self.validator.validate(token).await
    }
}
