//! Rate limiting, caching and the rest of the perimeter over real sockets.

use keyward::config::RatePolicy;
use keyward::registry::ServiceRegistry;
use reqwest::Method;
use serde_json::{json, Value};

mod common;

use common::{client, header_service, start_gateway, test_config, MockUpstream};

fn policy(max_requests: u32) -> RatePolicy {
    RatePolicy {
        window_secs: 60,
        max_requests,
        message: "Slow down".to_string(),
    }
}

#[tokio::test]
async fn test_strict_limit_rejects_before_upstream() {
    let upstream = MockUpstream::start(|_| (200, "{}".into())).await;
    let registry = ServiceRegistry::from_entries([header_service(
        "openai",
        &upstream.base_url("/v1"),
        "Authorization",
        "sk-limit",
    )])
    .unwrap();
    let mut config = test_config();
    config.rate_limit.proxy = policy(3);
    let gateway = start_gateway(config, registry).await;
    let client = client();

    for remaining in ["2", "1", "0"] {
        let res = client
            .post(gateway.url("/api/proxy/openai"))
            .json(&json!({ "endpoint": "/models" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["ratelimit-limit"], "3");
        assert_eq!(res.headers()["ratelimit-remaining"], remaining);
    }

    let res = client
        .post(gateway.url("/api/proxy/openai"))
        .json(&json!({ "endpoint": "/models" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 429);
    assert!(res.headers().contains_key("retry-after"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "Slow down" }));

    assert_eq!(upstream.calls(), 3);
}

#[tokio::test]
async fn test_general_limit_covers_service_listing() {
    let mut config = test_config();
    config.rate_limit.general = policy(2);
    config.cache.enabled = false;
    let gateway = start_gateway(config, ServiceRegistry::default()).await;
    let client = client();

    for _ in 0..2 {
        let res = client.get(gateway.url("/api/proxy/services")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
    let res = client.get(gateway.url("/api/proxy/services")).send().await.unwrap();
    assert_eq!(res.status(), 429);

    // Health is outside /api/ and stays reachable.
    let res = client.get(gateway.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_service_listing_is_cached() {
    let registry = ServiceRegistry::from_entries([
        header_service("openai", "https://api.openai.com/v1", "Authorization", "sk-a"),
        header_service("anthropic", "https://api.anthropic.com/v1", "x-api-key", "sk-b"),
    ])
    .unwrap();
    let gateway = start_gateway(test_config(), registry).await;
    let client = client();

    let first = client.get(gateway.url("/api/proxy/services")).send().await.unwrap();
    assert_eq!(first.headers()["x-cache"], "MISS");
    assert_eq!(first.headers()["cache-control"], "max-age=300");
    let first: Value = first.json().await.unwrap();
    assert_eq!(first["services"], json!(["anthropic", "openai"]));

    let second = client.get(gateway.url("/api/proxy/services")).send().await.unwrap();
    assert_eq!(second.headers()["x-cache"], "HIT");
    let second: Value = second.json().await.unwrap();
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_health_and_not_found() {
    let gateway = start_gateway(test_config(), ServiceRegistry::default()).await;
    let client = client();

    let res = client.get(gateway.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.headers()["x-frame-options"], "SAMEORIGIN");
    assert!(res.headers().contains_key("content-security-policy"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let res = client.get(gateway.url("/does/not/exist")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Endpoint not found");
    assert_eq!(body["path"], "/does/not/exist");
    assert!(body["availableEndpoints"].is_array());
}

#[tokio::test]
async fn test_cors_preflight() {
    let gateway = start_gateway(test_config(), ServiceRegistry::default()).await;

    let res = client()
        .request(Method::OPTIONS, gateway.url("/api/proxy/openai"))
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());
    assert_eq!(res.headers()["access-control-allow-origin"], "http://localhost:3000");
    assert_eq!(res.headers()["access-control-allow-credentials"], "true");

    let res = client()
        .request(Method::OPTIONS, gateway.url("/api/proxy/openai"))
        .header("origin", "https://evil.example")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();
    assert!(res.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let mut gateway = start_gateway(test_config(), ServiceRegistry::default()).await;
    let client = client();

    let res = client.get(gateway.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    gateway.stop().await;
    assert!(client.get(gateway.url("/health")).send().await.is_err());
}
