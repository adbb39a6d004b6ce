//! Backend request forwarding.
//!
//! # Responsibilities
//! - Gate every call on the backend's circuit breaker
//! - Send the sanitized request to `base_url + path` under a deadline
//! - Report the outcome to the breaker and map failures to responses
//!
//! # Design Decisions
//! - Status < 500 is success; 5xx, timeouts and transport errors are failures
//! - The backend call runs in its own task so its outcome is recorded even
//!   when the client disconnects first
//! - Bodies are buffered; no streaming

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;
use url::Url;

use crate::http::response::{backend_response, strip_hop_by_hop, GatewayError};
use crate::resilience::CircuitBreaker;
use crate::routing::backend_name;

/// The parts of an inbound request that are forwarded.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// Sanitized inbound headers with trusted identity merged in.
    pub headers: HeaderMap,
    pub body: Bytes,
}

type BackendReply = (StatusCode, HeaderMap, Bytes);

pub struct RequestForwarder {
    client: reqwest::Client,
    breaker: Arc<CircuitBreaker>,
    timeout: Duration,
}

impl RequestForwarder {
    pub fn new(breaker: Arc<CircuitBreaker>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            breaker,
            timeout,
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Forward `request` to `base_url` + `path_and_query`.
    pub async fn forward(
        &self,
        request: OutboundRequest,
        base_url: &Url,
        path_and_query: &str,
    ) -> Result<Response, GatewayError> {
        let service = backend_name(base_url);

        if !self.breaker.allow(&service) {
            return Err(GatewayError::CircuitOpen { service });
        }

        let target = match target_url(base_url, path_and_query) {
            Ok(target) => target,
            Err(e) => {
                self.breaker.record_failure(&service);
                return Err(GatewayError::Proxy(format!("bad target URL: {e}")));
            }
        };

        let mut headers = request.headers;
        strip_hop_by_hop(&mut headers);

        tracing::debug!(service = %service, method = %request.method, url = %target, "Forwarding request");

        let call = self
            .client
            .request(request.method, target)
            .headers(headers)
            .body(request.body)
            .timeout(self.timeout);

        let breaker = self.breaker.clone();
        let task_service = service.clone();
        let outcome = tokio::spawn(async move {
            let reply = send(call).await;
            match &reply {
                Ok((status, _, _)) if status.is_server_error() => breaker.record_failure(&task_service),
                Ok(_) => breaker.record_success(&task_service),
                Err(_) => breaker.record_failure(&task_service),
            }
            reply
        })
        .await;

        match outcome {
            Ok(Ok((status, headers, body))) => {
                if status.is_server_error() {
                    tracing::warn!(service = %service, status = %status, "Backend returned server error");
                }
                Ok(backend_response(status, headers, body))
            }
            Ok(Err(e)) => Err(classify(&e, service)),
            Err(e) => {
                self.breaker.record_failure(&service);
                Err(GatewayError::Proxy(format!("forwarding task failed: {e}")))
            }
        }
    }
}

async fn send(call: reqwest::RequestBuilder) -> Result<BackendReply, reqwest::Error> {
    let response = call.send().await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?;
    Ok((status, headers, body))
}

fn target_url(base_url: &Url, path_and_query: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}{}",
        base_url.as_str().trim_end_matches('/'),
        path_and_query
    ))
}

fn classify(error: &reqwest::Error, service: String) -> GatewayError {
    if error.is_timeout() {
        tracing::warn!(service = %service, "Backend request timed out");
        GatewayError::BackendTimeout { service }
    } else if error.is_connect() || error.is_request() || error.is_body() {
        tracing::warn!(service = %service, error = %error, "Backend unreachable");
        GatewayError::BackendUnreachable { service }
    } else {
        GatewayError::Proxy(error.to_string())
    }
}
