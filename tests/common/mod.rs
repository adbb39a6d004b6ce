//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use api_gateway::auth::build_validator;
use api_gateway::config::{RouteConfig, ServiceConfig};
use api_gateway::store::{SharedStore, StoreError};
use api_gateway::{Gateway, GatewayConfig, HttpServer, Shutdown};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSA_PRIVATE_PEM: &str = include_str!("../fixtures/jwt_rsa.pem");
const RSA_N: &str = "nXO5y-GhKxk9rra_vZ0jf_fSdpP3ksweOwJoRzqoNORn4Vw0p2VDESefBtKRUgL9xvBTqhIdrCNEwXvVLGnZu_xo8yN076Xi8FEhBtyAFLHAtnvSneCa3GqqI1dcQPZbyzR_IwCZgzA7Xr8yegyyO3HmOL_qkLPerUjqdnIqjHvcaf2zz45c78wnIcXcXC-GiAw_wWREjPRtPILY0hAeeYg6jPwwvKEEVoAkfO7EpexHXkDG4YqbmE973PD5HrozoBEqRckMVTWRJD_sT8vLRDKf35RVMOkcbDAnDKi9GUm8xeQQEO1ceM6XciITVcsJ3nrteXE8RxSwWo0DhqxEGQ";

pub const ISSUER: &str = "https://auth.integration";
pub const AUDIENCE: &str = "gateway-integration";

/// Signed RS256 token for `sub`, valid for five minutes.
pub fn mint(sub: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": sub,
        "iss": ISSUER,
        "aud": AUDIENCE,
        "exp": now + 300,
        "email": format!("{sub}@example.com"),
        "roles": ["user"],
        "email_verified": true,
    });
    let key = EncodingKey::from_rsa_pem(RSA_PRIVATE_PEM.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap()
}

/// Mock auth service publishing the fixture key.
pub async fn start_jwks_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [{ "kty": "RSA", "alg": "RS256", "n": RSA_N, "e": "AQAB" }]
        })))
        .mount(&server)
        .await;
    server
}

/// Config routing every path to `backend` and trusting `jwks`.
pub fn config_for(jwks: &MockServer, backend: &MockServer) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.auth.service_url = jwks.uri();
    config.auth.issuer = ISSUER.into();
    config.auth.audience = AUDIENCE.into();
    config.services.push(ServiceConfig {
        name: "case".into(),
        url: backend.uri(),
    });
    config.routes.push(RouteConfig {
        path_prefix: "/api".into(),
        service: "case".into(),
    });
    config
}

/// In-process shared store with real fixed-window counters (no expiry).
#[derive(Default)]
pub struct MemoryStore {
    counters: Mutex<HashMap<String, i64>>,
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SharedStore for MemoryStore {
    fn is_available(&self) -> bool {
        true
    }

    async fn incr_with_expiry(&self, key: &str, _ttl_secs: u64) -> Result<i64, StoreError> {
        let mut counters = self.counters.lock().unwrap();
        let count = counters.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl_secs: Option<u64>) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A gateway serving on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Arc<Shutdown>,
    pub handle: JoinHandle<()>,
    pub client: reqwest::Client,
}

impl TestGateway {
    pub async fn start(config: GatewayConfig, store: Option<Arc<dyn SharedStore>>) -> Self {
        let validator = build_validator(&config.auth).unwrap();
        let gateway = Gateway::assemble(config, validator, store).unwrap();
        let server = HttpServer::new(gateway);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Shutdown::new());
        let server_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move {
            server.run(listener, &server_shutdown).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .unwrap();

        Self {
            addr,
            shutdown,
            handle,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap();
    }
}
