//! # 端点健康处理器

use axum::{Json, extract::State};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::edge::server::AppState;
use crate::health::HealthSnapshot;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointHealthReport {
    #[serde(flatten)]
    pub snapshot: HealthSnapshot,
    pub window_capacity: usize,
    /// 每个已观测端点最近的延迟窗口（毫秒，旧到新）
    pub recent_latencies_ms: BTreeMap<String, Vec<u64>>,
}

pub async fn get_endpoint_health(State(state): State<AppState>) -> Json<EndpointHealthReport> {
    let monitor = &state.monitor;
    let recent_latencies_ms = state
        .aggregator
        .endpoints()
        .iter()
        .filter_map(|endpoint| {
            monitor
                .endpoint(&endpoint.id)
                .map(|entry| (endpoint.id.clone(), entry.window()))
        })
        .collect();

    Json(EndpointHealthReport {
        snapshot: monitor.snapshot(),
        window_capacity: monitor.window_capacity(),
        recent_latencies_ms,
    })
}
