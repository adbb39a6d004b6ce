//! Response handling and transformation.
//!
//! # Responsibilities
//! - Map gateway failures to status codes and JSON bodies
//! - Strip hop-by-hop headers in both directions
//! - Rebuild backend responses for the client
//!
//! # Design Decisions
//! - Every failure body is `{"error": <kind>, "message": <text>}`
//! - Backend status, headers and body pass through unchanged otherwise
//! - Backend timeouts result in 504 Gateway Timeout

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

/// Connection-scoped headers never relayed by a proxy.
pub const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
];

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// Client-facing failure of a gateway request.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("{service} is temporarily unavailable")]
    CircuitOpen { service: String },

    #[error("{service} did not respond in time")]
    BackendTimeout { service: String },

    #[error("Failed to connect to {service}")]
    BackendUnreachable { service: String },

    #[error("No route for {0}")]
    NoRoute(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Unexpected error while proxying request")]
    Proxy(String),

    #[error("Internal gateway error")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::BackendUnreachable { .. } => StatusCode::BAD_GATEWAY,
            Self::NoRoute(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Proxy(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(err) => err.kind(),
            Self::RateLimited => "rate_limit_exceeded",
            Self::CircuitOpen { .. } => "service_unavailable",
            Self::BackendTimeout { .. } => "backend_timeout",
            Self::BackendUnreachable { .. } => "backend_error",
            Self::NoRoute(_) => "not_found",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Proxy(_) => "proxy_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            Self::Proxy(detail) | Self::Internal(detail) => {
                tracing::error!(kind = self.kind(), detail = %detail, "Gateway error");
            }
            _ => {}
        }

        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Build the client response from a buffered backend response.
pub fn backend_response(status: StatusCode, mut headers: HeaderMap, body: Bytes) -> Response {
    strip_hop_by_hop(&mut headers);
    // The body is re-framed by the server.
    headers.remove(axum::http::header::CONTENT_LENGTH);

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
