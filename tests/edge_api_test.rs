//! # 边缘路由集成测试
//!
//! 真实 HTTP 请求经过认证、聚合、健康记录和响应头的完整链路。

mod common;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::Value;
use wiremock::MockServer;

use common::{
    BROWSER_TOKEN, SIGNING_SECRET, mount_all_upstreams, mount_identity, mount_upstream,
    mount_upstream_status, spawn_relay, strip_volatile, test_config,
};
use dashboard_relay::gatekeeper::{Decision, GatekeeperKeys, decide};

async fn mocks() -> (MockServer, MockServer) {
    let identity = MockServer::start().await;
    mount_identity(&identity).await;
    let upstream = MockServer::start().await;
    (identity, upstream)
}

#[tokio::test]
async fn liveness_and_root_are_public() {
    let (identity, upstream) = mocks().await;
    let relay = spawn_relay(test_config(&identity, &upstream), None).await;

    let response = relay.client.get(relay.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "dashboard-relay");

    let body: Value = relay
        .client
        .get(relay.url("/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let paths: Vec<&str> = body["routes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|route| route["path"].as_str())
        .collect();
    assert!(paths.contains(&"/v1/dashboard"));
    assert!(paths.contains(&"/api/metrics"));
}

#[tokio::test]
async fn missing_or_rejected_credentials_get_401_with_hint() {
    let (identity, upstream) = mocks().await;
    let relay = spawn_relay(test_config(&identity, &upstream), None).await;

    let response = relay
        .client
        .get(relay.url("/v1/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
    assert!(body["hint"].as_str().unwrap().contains("Bearer"));

    let response = relay
        .client
        .get(relay.url("/api/metrics"))
        .bearer_auth("stolen-or-expired")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
    assert!(body["hint"].is_string());

    // 认证失败时不会调用上游
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn all_upstreams_failing_still_returns_defaulted_payload() {
    let (identity, upstream) = mocks().await;
    let relay = spawn_relay(test_config(&identity, &upstream), None).await;

    let response = relay.get("/v1/dashboard").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["markets"]["futures"]["connected"], false);
    assert_eq!(body["markets"]["crypto"]["state"], "NOT_INSTRUMENTED");
    assert_eq!(body["positions"], Value::Array(vec![]));
    assert_eq!(body["_health"]["vpsReachable"], false);
    assert_eq!(body["strategyActivity"]["gatePressure"]["level"], "UNKNOWN");
    assert_eq!(body["dataFreshness"]["global"], "UNKNOWN");

    let endpoints = body["_proxy"]["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 5);
    assert!(endpoints.iter().all(|endpoint| endpoint["success"] == false));
}

#[tokio::test]
async fn partial_upstream_failure_merges_successes_and_defaults() {
    let (identity, upstream) = mocks().await;
    mount_upstream(&upstream, "/brokers/status", common::broker_body()).await;
    mount_upstream(&upstream, "/trades/live", common::trades_body()).await;
    mount_upstream(&upstream, "/system/activity", common::activity_body()).await;
    mount_upstream_status(&upstream, "/strategies/proving", 503).await;
    mount_upstream_status(&upstream, "/metrics/gate-pressure", 500).await;

    let relay = spawn_relay(test_config(&identity, &upstream), None).await;
    let body: Value = relay
        .get("/v1/dashboard")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["markets"]["futures"]["connected"], true);
    assert_eq!(body["positions"].as_array().unwrap().len(), 1);
    assert_eq!(body["positions"][0]["symbol"], "NQ");
    assert_eq!(body["positions"][0]["side"], "LONG");
    assert_eq!(body["systemActivity"]["seedingActive"], true);

    assert_eq!(body["strategyActivity"]["provingPipeline"]["totalStrategies"], 0);
    assert_eq!(body["strategyActivity"]["gatePressure"]["level"], "UNKNOWN");
    assert_eq!(body["_health"]["vpsReachable"], true);

    let endpoints = body["_proxy"]["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 5);
    let flag = |id: &str| {
        endpoints
            .iter()
            .find(|endpoint| endpoint["endpointId"] == id)
            .map(|endpoint| endpoint["success"].as_bool().unwrap())
            .unwrap()
    };
    assert!(flag("broker"));
    assert!(flag("trades"));
    assert!(flag("activity"));
    assert!(!flag("strategies"));
    assert!(!flag("gates"));
}

#[tokio::test]
async fn legacy_and_versioned_aggregation_are_equivalent() {
    let (identity, upstream) = mocks().await;
    mount_all_upstreams(&upstream).await;
    let relay = spawn_relay(test_config(&identity, &upstream), None).await;

    let versioned = relay.get("/v1/dashboard").send().await.unwrap();
    assert_eq!(versioned.status(), StatusCode::OK);
    assert!(versioned.headers().get("deprecation").is_none());
    assert_eq!(versioned.headers()["x-api-version"], "1.0");
    assert_eq!(versioned.headers()["x-ratelimit-limit"], "100");
    assert!(versioned.headers().contains_key("x-ratelimit-reset"));
    let mut versioned: Value = versioned.json().await.unwrap();

    let legacy = relay.get("/api/metrics").send().await.unwrap();
    assert_eq!(legacy.status(), StatusCode::OK);
    assert_eq!(legacy.headers()["deprecation"], "true");
    assert!(legacy.headers().contains_key("sunset"));
    assert_eq!(
        legacy.headers()["link"],
        "</v1/dashboard>; rel=\"successor-version\""
    );
    assert_eq!(legacy.headers()["x-api-version"], "1.0");
    let mut legacy: Value = legacy.json().await.unwrap();

    assert_eq!(versioned["systemVerdict"]["state"], "SAFE_PARTIAL");
    strip_volatile(&mut versioned);
    strip_volatile(&mut legacy);
    assert_eq!(versioned, legacy);
}

#[tokio::test]
async fn upstream_receives_a_token_the_gatekeeper_accepts() {
    let (identity, upstream) = mocks().await;
    mount_all_upstreams(&upstream).await;
    let relay = spawn_relay(test_config(&identity, &upstream), None).await;

    relay.get("/v1/dashboard").send().await.unwrap();

    let keys = GatekeeperKeys::new(SIGNING_SECRET, "dashboard-relay", "metrics-boundary");
    let requests = upstream.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5);
    for request in requests {
        let authorization = request
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .unwrap();
        assert_ne!(authorization, format!("Bearer {BROWSER_TOKEN}"));
        match decide(Some(authorization), &keys) {
            Decision::Allow(headers) => {
                assert_eq!(headers.user_id, "user-42");
                assert_eq!(headers.email, "operator@example.com");
            }
            Decision::Deny(reason) => panic!("relay token denied: {reason}"),
        }
    }
}

#[tokio::test]
async fn missing_signing_secret_is_a_configuration_error() {
    let (identity, upstream) = mocks().await;
    let mut config = test_config(&identity, &upstream);
    config.token.signing_secret = None;
    let relay = spawn_relay(config, None).await;

    let response = relay.get("/v1/dashboard").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "configuration_error");
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn endpoint_health_reflects_recorded_calls() {
    let (identity, upstream) = mocks().await;
    mount_upstream(&upstream, "/brokers/status", common::broker_body()).await;
    let relay = spawn_relay(test_config(&identity, &upstream), None).await;

    relay.get("/v1/dashboard").send().await.unwrap();
    relay.get("/v1/dashboard").send().await.unwrap();

    let body: Value = relay
        .get("/v1/health/endpoints")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["totalEndpoints"], 5);
    assert_eq!(body["healthyEndpoints"], 1);
    assert_eq!(body["downEndpoints"], 4);
    assert_eq!(body["windowCapacity"], 20);
    assert_eq!(body["endpoints"]["broker"]["successRate"], 100);
    assert_eq!(body["endpoints"]["trades"]["successRate"], 0);
    assert_eq!(body["recentLatenciesMs"]["broker"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn single_endpoint_relay_passes_status_through() {
    let (identity, upstream) = mocks().await;
    mount_upstream(&upstream, "/brokers/status", common::broker_body()).await;
    mount_upstream_status(&upstream, "/trades/live", 503).await;
    let relay = spawn_relay(test_config(&identity, &upstream), None).await;

    let response = relay.get("/v1/relay/broker").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("deprecation").is_none());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["connected"], true);

    let response = relay.get("/api/trades").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.headers()["link"],
        "</v1/relay/trades>; rel=\"successor-version\""
    );

    let response = relay.get("/v1/relay/unknown").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway_for_single_relay() {
    let identity = MockServer::start().await;
    mount_identity(&identity).await;
    let upstream = MockServer::start().await;
    let mut config = test_config(&identity, &upstream);
    config.upstream.base_url = Some("http://127.0.0.1:1".to_string());
    let relay = spawn_relay(config, None).await;

    let response = relay.get("/v1/relay/gates").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "upstream_failure");
}

#[tokio::test]
async fn stream_stub_is_not_implemented() {
    let (identity, upstream) = mocks().await;
    let relay = spawn_relay(test_config(&identity, &upstream), None).await;

    let response = relay.get("/v1/stream").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "not_implemented");
    assert_eq!(
        body["planned"],
        serde_json::json!(["/v1/stream/dashboard", "/v1/stream/health"])
    );
    assert!(body["message"].as_str().unwrap().contains("not implemented"));
}

#[tokio::test]
async fn session_routes_without_storage_are_unavailable() {
    let (identity, upstream) = mocks().await;
    let relay = spawn_relay(test_config(&identity, &upstream), None).await;

    let response = relay.get("/v1/sessions/events").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // 参数校验先于存储检查
    let response = relay.get("/v1/sessions/export").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");
}
