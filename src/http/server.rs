//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: health endpoints plus a proxy fallback
//! - Wire up middleware (request ID, tracing, CORS, rate limiting)
//! - Serve with graceful shutdown and run the store probe alongside

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::health::{HealthChecker, LIVENESS_PATH, READINESS_PATH};
use crate::http::request::{request_id, X_REQUEST_ID};
use crate::lifecycle::{Gateway, Shutdown};
use crate::observability::metrics;
use crate::proxy::Pipeline;
use crate::security::rate_limit::{
    rate_limit_middleware, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};
use crate::store::{spawn_probe, SharedStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub health: Arc<HealthChecker>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    store: Option<Arc<dyn SharedStore>>,
    probe_interval: Duration,
}

impl HttpServer {
    pub fn new(gateway: Gateway) -> Self {
        let state = AppState {
            pipeline: gateway.pipeline,
            health: gateway.health,
        };

        let router = Router::new()
            .route(LIVENESS_PATH, get(liveness_handler))
            .route(READINESS_PATH, get(readiness_handler))
            .fallback(proxy_handler)
            .with_state(state)
            .layer(from_fn_with_state(gateway.limiter, rate_limit_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            tracing::info_span!(
                                "request",
                                method = %request.method(),
                                path = %request.uri().path(),
                                request_id = %request_id(request.headers()),
                            )
                        },
                    ))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(cors_layer(&gateway.config.cors_origins)),
            );

        Self {
            router,
            store: gateway.store,
            probe_interval: Duration::from_secs(
                gateway.config.timeouts.store_probe_interval_secs.max(1),
            ),
        }
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let probe = self
            .store
            .map(|store| spawn_probe(store, self.probe_interval, shutdown.subscribe()));

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        if let Some(probe) = probe {
            if let Err(e) = probe.await {
                tracing::warn!(error = %e, "Shared store probe task ended abnormally");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `"*"` echoes the caller's origin; a literal wildcard cannot be combined
/// with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring unusable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([
            HeaderName::from_static(X_REQUEST_ID),
            HeaderName::from_static(X_RATELIMIT_LIMIT),
            HeaderName::from_static(X_RATELIMIT_REMAINING),
            HeaderName::from_static(X_RATELIMIT_RESET),
        ])
}

async fn liveness_handler() -> Json<serde_json::Value> {
    Json(HealthChecker::liveness())
}

async fn readiness_handler(State(state): State<AppState>) -> Response {
    let report = state.health.readiness().await;
    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

/// Everything that is not a local endpoint goes through the pipeline.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let id = request_id(request.headers()).to_string();
    let method = request.method().clone();

    tracing::debug!(request_id = %id, method = %method, path = %request.uri().path(), "Proxying request");

    let response = match state.pipeline.dispatch(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(request_id = %id, error = %e, "Request rejected");
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_skips_bad_origins() {
        // Construction must not panic with credentials and mirrored lists.
        let _ = cors_layer(&["https://app.example.com".into(), "bad\norigin".into()]);
    }

    #[test]
    fn test_cors_layer_wildcard_does_not_panic() {
        let _ = cors_layer(&["*".into()]);
        let _ = cors_layer(&["https://app.example.com".into(), "*".into()]);
    }
}
