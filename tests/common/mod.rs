//! # 集成测试公共设施
//!
//! 用 wiremock 模拟身份提供方和指标服务，在临时端口上启动真实的边缘路由。

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dashboard_relay::app::AppContext;
use dashboard_relay::auth::HttpIdentityProvider;
use dashboard_relay::config::AppConfig;
use dashboard_relay::edge::build_router;
use dashboard_relay::session::SessionStore;

pub const SIGNING_SECRET: &str = "integration-signing-secret";
pub const BROWSER_TOKEN: &str = "browser-token-123";
pub const USER_INFO_PATH: &str = "/auth/v1/user";

/// 运行中的边缘路由
pub struct TestRelay {
    pub base_url: String,
    pub client: reqwest::Client,
    pub context: Arc<AppContext>,
}

impl TestRelay {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// 携带有效浏览器凭证的 GET
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(BROWSER_TOKEN)
    }
}

/// 指向模拟服务的配置
pub fn test_config(identity: &MockServer, upstream: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.identity.user_info_url = Some(format!("{}{USER_INFO_PATH}", identity.uri()));
    config.token.signing_secret = Some(SIGNING_SECRET.to_string());
    config.upstream.base_url = Some(upstream.uri());
    config.upstream.timeout_ms = 500;
    config
}

/// 身份提供方：只认 `BROWSER_TOKEN`
pub async fn mount_identity(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(USER_INFO_PATH))
        .and(header("authorization", format!("Bearer {BROWSER_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-42",
            "email": "operator@example.com",
            "app_metadata": {"role": "operator"}
        })))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(USER_INFO_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "invalid JWT"})))
        .with_priority(5)
        .mount(server)
        .await;
}

/// 上游端点：要求带内部令牌
pub async fn mount_upstream(server: &MockServer, endpoint_path: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint_path))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_upstream_status(server: &MockServer, endpoint_path: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(endpoint_path))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"error": "unavailable"})))
        .mount(server)
        .await;
}

pub fn broker_body() -> Value {
    json!({
        "connected": true,
        "token_valid": true,
        "killing_active": false,
        "timestamp_utc": Utc::now().to_rfc3339(),
    })
}

pub fn trades_body() -> Value {
    json!({
        "trades": [
            {"symbol": "NQ", "side": "long", "size": 2, "entry_price": 18250.5, "strategy": "orb"}
        ],
        "timestamp_utc": Utc::now().to_rfc3339(),
    })
}

pub fn strategies_body() -> Value {
    json!({
        "strategies": [{"id": "orb", "state": "ACTIVE"}, {"id": "vwap", "state": "PROVING"}],
        "intents": {"total_emitted": 10, "total_denied": 1},
        "promotions": {"total_to_live": 3},
        "timestamp_utc": Utc::now().to_rfc3339(),
    })
}

pub fn gates_body() -> Value {
    json!({
        "pressure_level": "low",
        "total_denials": 4,
        "denials_last_hour": 0,
        "by_gate": {"max_position": 4},
        "timestamp_utc": Utc::now().to_rfc3339(),
    })
}

pub fn activity_body() -> Value {
    json!({
        "seeding_active": true,
        "system_uptime": 3600.0,
        "cpu_usage": 12.5,
        "memory_usage": 40.0,
    })
}

/// 全部五个端点正常
pub async fn mount_all_upstreams(server: &MockServer) {
    mount_upstream(server, "/brokers/status", broker_body()).await;
    mount_upstream(server, "/trades/live", trades_body()).await;
    mount_upstream(server, "/strategies/proving", strategies_body()).await;
    mount_upstream(server, "/metrics/gate-pressure", gates_body()).await;
    mount_upstream(server, "/system/activity", activity_body()).await;
}

/// 在临时端口启动边缘路由
pub async fn spawn_relay(config: AppConfig, store: Option<Arc<dyn SessionStore>>) -> TestRelay {
    let config = Arc::new(config);
    let provider = Arc::new(HttpIdentityProvider::new(&config.identity).unwrap());
    let context = Arc::new(AppContext::with_parts(config, provider, store).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(Arc::clone(&context)).unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestRelay {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        context,
    }
}

/// 去掉随墙钟变化的字段，便于比较两次聚合
pub fn strip_volatile(value: &mut Value) {
    const VOLATILE: [&str; 10] = [
        "timestamp",
        "computedAt",
        "evaluatedAt",
        "serverTime",
        "lastChecked",
        "latencyMs",
        "totalLatencyMs",
        "ageSeconds",
        "time",
        "_health",
    ];
    match value {
        Value::Object(map) => {
            for key in VOLATILE {
                map.remove(key);
            }
            map.values_mut().for_each(strip_volatile);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_volatile),
        _ => {}
    }
}
