//! Concurrency under load: limiter accounting and pass-through stay exact.

use std::time::Instant;

use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

use common::{config_for, start_jwks_server, TestGateway};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_share_one_bucket() {
    let jwks = start_jwks_server().await;
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello from backend"))
        .mount(&backend)
        .await;

    let mut config = config_for(&jwks, &backend);
    config.auth.required = false;
    config.rate_limit.requests_per_minute = 1;
    config.rate_limit.burst_size = Some(50);
    let gateway = TestGateway::start(config, None).await;

    let concurrency = 20;
    let requests_per_task = 5;
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = gateway.client.clone();
        let url = gateway.url("/api/v1/cases");
        tasks.push(tokio::spawn(async move {
            let mut statuses = Vec::new();
            for _ in 0..requests_per_task {
                let res = client
                    .get(&url)
                    .header("X-Forwarded-For", "203.0.113.50")
                    .send()
                    .await
                    .unwrap();
                statuses.push(res.status().as_u16());
            }
            statuses
        }));
    }

    let mut statuses = Vec::new();
    for task in tasks {
        statuses.extend(task.await.unwrap());
    }

    let allowed = statuses.iter().filter(|s| **s == 200).count();
    let limited = statuses.iter().filter(|s| **s == 429).count();
    println!(
        "{} requests in {:?}: {allowed} allowed, {limited} limited",
        statuses.len(),
        start.elapsed()
    );

    // A refill of 1/min adds at most one token over the run.
    assert!((50..=51).contains(&allowed), "allowed = {allowed}");
    assert_eq!(allowed + limited, concurrency * requests_per_task);
    assert_eq!(backend.received_requests().await.unwrap().len(), allowed);

    gateway.stop().await;
}
