//! Request inspection helpers.
//!
//! # Responsibilities
//! - Read the request ID assigned by the request-id layer
//! - Derive the client identifier used for rate limiting
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing (outermost layer)
//! - Forwarding headers are trusted: the gateway is deployed behind a
//!   load balancer that sets them

use std::net::IpAddr;

use axum::http::HeaderMap;

pub const X_REQUEST_ID: &str = "x-request-id";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// The request ID, or `"unknown"` outside the request-id layer.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Client identifier: first `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the peer address.
pub fn client_identifier(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(client) = forwarded {
        return client.to_string();
    }

    let real_ip = headers
        .get(X_REAL_IP)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(client) = real_ip {
        return client.to_string();
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"));
        headers.insert(X_REAL_IP, HeaderValue::from_static("10.0.0.2"));

        let peer = Some("127.0.0.1".parse().unwrap());
        assert_eq!(client_identifier(&headers, peer), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REAL_IP, HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_identifier(&headers, None), "10.0.0.2");

        let peer = Some("192.168.1.5".parse().unwrap());
        assert_eq!(client_identifier(&HeaderMap::new(), peer), "192.168.1.5");
        assert_eq!(client_identifier(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn test_request_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");

        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc-123"));
        assert_eq!(request_id(&headers), "abc-123");
    }
}
