//! # 统一看板处理器
//!
//! `/v1/dashboard` 与旧版 `/api/metrics` 共用 [`dashboard_core`]。

use axum::{
    Extension, Json,
    extract::State,
    http::HeaderMap,
};

use crate::aggregator::UnifiedMetricsPayload;
use crate::auth::VerifiedIdentity;
use crate::edge::middleware::{RequestId, SESSION_ID_HEADER};
use crate::edge::server::AppState;
use crate::error::Result;

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// 聚合并返回统一载荷
pub async fn dashboard_core(
    state: &AppState,
    identity: &VerifiedIdentity,
    headers: &HeaderMap,
    request_id: &RequestId,
) -> Result<UnifiedMetricsPayload> {
    let outcome = state
        .aggregator
        .aggregate(identity, session_id(headers), request_id.as_str())
        .await?;
    Ok(outcome.payload)
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<UnifiedMetricsPayload>> {
    dashboard_core(&state, &identity, &headers, &request_id)
        .await
        .map(Json)
}

/// 旧版路径，弃用头由中间件添加
pub async fn get_legacy_metrics(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<UnifiedMetricsPayload>> {
    dashboard_core(&state, &identity, &headers, &request_id)
        .await
        .map(Json)
}
