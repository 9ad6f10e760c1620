//! # 系统信息处理器

use axum::{Json, extract::State};
use chrono::Utc;
use serde::Serialize;

use crate::edge::server::AppState;

/// 服务名
pub const SERVICE_NAME: &str = "dashboard-relay";

#[derive(Debug, Serialize)]
struct RouteInfo {
    path: &'static str,
    auth: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    successor: Option<&'static str>,
}

const fn route(path: &'static str, auth: bool) -> RouteInfo {
    RouteInfo {
        path,
        auth,
        successor: None,
    }
}

const fn legacy(path: &'static str, successor: &'static str) -> RouteInfo {
    RouteInfo {
        path,
        auth: true,
        successor: Some(successor),
    }
}

/// 根路径：服务自描述
pub async fn root_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let routes = [
        route("/", false),
        route("/health", false),
        route("/v1/dashboard", true),
        route("/v1/health/endpoints", true),
        route("/v1/relay/{endpoint}", true),
        route("/v1/sessions/events", true),
        route("/v1/sessions/export", true),
        route("/v1/stream", true),
        legacy("/api/metrics", "/v1/dashboard"),
        legacy("/api/broker", "/v1/relay/broker"),
        legacy("/api/trades", "/v1/relay/trades"),
        legacy("/api/strategies", "/v1/relay/strategies"),
        legacy("/api/gates", "/v1/relay/gates"),
    ];
    let endpoints: Vec<&str> = state
        .aggregator
        .endpoints()
        .iter()
        .map(|endpoint| endpoint.id.as_str())
        .collect();

    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "apiVersion": state.config.edge.api_version,
        "routes": routes,
        "upstreamEndpoints": endpoints,
        "startedAt": state.started_at,
    }))
}

/// 存活检查
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}
