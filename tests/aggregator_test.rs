//! # 聚合器集成测试
//!
//! 直接驱动 [`Aggregator`]：超时计为失败、健康先于合并记录、单端点转发。

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{broker_body, mount_upstream, test_config};
use dashboard_relay::aggregator::{Aggregator, MarketState, RELAY_USER_ID_HEADER};
use dashboard_relay::auth::VerifiedIdentity;
use dashboard_relay::health::{EndpointHealthMonitor, EndpointStatus};
use dashboard_relay::session::SessionRecorder;

fn identity() -> VerifiedIdentity {
    VerifiedIdentity::new("user-7", "seven@example.com", "operator")
}

async fn aggregator_for(upstream: &MockServer) -> (Aggregator, Arc<EndpointHealthMonitor>) {
    let identity_server = MockServer::start().await;
    let mut config = test_config(&identity_server, upstream);
    config.upstream.timeout_ms = 200;
    let monitor = Arc::new(EndpointHealthMonitor::new(config.health.window_capacity));
    let aggregator =
        Aggregator::new(&config, Arc::clone(&monitor), SessionRecorder::disabled()).unwrap();
    (aggregator, monitor)
}

#[tokio::test]
async fn slow_endpoint_times_out_without_blocking_others() {
    let upstream = MockServer::start().await;
    mount_upstream(&upstream, "/brokers/status", broker_body()).await;
    Mock::given(method("GET"))
        .and(path("/trades/live"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"trades": [{"symbol": "ES"}]}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&upstream)
        .await;

    let (aggregator, monitor) = aggregator_for(&upstream).await;
    let outcome = aggregator.aggregate(&identity(), None, "req-1").await.unwrap();

    assert!(outcome.total_latency_ms < 1_500);
    let trades = outcome
        .results()
        .iter()
        .find(|result| result.endpoint_id == "trades")
        .unwrap();
    assert!(!trades.success);
    assert!(trades.http_status.is_none());
    assert!(outcome.payload.positions.is_empty());
    assert_eq!(outcome.payload.markets["futures"].state, MarketState::Live);

    let trades_health = monitor.endpoint("trades").unwrap();
    assert_eq!(trades_health.status(), Some(EndpointStatus::Down));
    assert_eq!(monitor.endpoint("broker").unwrap().status(), Some(EndpointStatus::Healthy));
    assert_eq!(outcome.payload.health.total_endpoints, 5);
}

#[tokio::test]
async fn upstream_receives_attribution_headers() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/brokers/status"))
        .and(header(RELAY_USER_ID_HEADER, "user-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(broker_body()))
        .expect(1)
        .mount(&upstream)
        .await;

    let (aggregator, _) = aggregator_for(&upstream).await;
    let result = aggregator.relay(&identity(), "broker", "req-2").await.unwrap();
    assert!(result.success);
    assert_eq!(result.http_status, Some(200));
    assert_eq!(result.payload.unwrap()["connected"], true);
}

#[tokio::test]
async fn relay_records_health_like_fan_out() {
    let upstream = MockServer::start().await;
    let (aggregator, monitor) = aggregator_for(&upstream).await;

    let result = aggregator.relay(&identity(), "gates", "req-3").await.unwrap();
    assert!(!result.success);
    assert_eq!(monitor.len(), 1);
    assert_eq!(monitor.endpoint("gates").unwrap().observations(), 1);

    let err = aggregator.relay(&identity(), "nope", "req-4").await.unwrap_err();
    assert_eq!(err.error_label(), "not_found");
    assert_eq!(monitor.len(), 1);
}

#[tokio::test]
async fn abandoned_aggregation_still_records_every_call() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&upstream)
        .await;

    let (aggregator, monitor) = aggregator_for(&upstream).await;
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        aggregator.aggregate(&identity(), None, "req-5"),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(monitor.is_empty());

    // 调用方已放弃，扇出仍在后台结束并写入健康记录
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(monitor.len(), 5);
    for endpoint in ["broker", "trades", "strategies", "gates", "activity"] {
        assert_eq!(monitor.endpoint(endpoint).unwrap().observations(), 1);
    }
}
