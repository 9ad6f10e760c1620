//! # 单端点转发处理器
//!
//! 透传上游 JSON 和状态码；连接失败或超时返回 502 `upstream_failure`。

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::aggregator::EndpointResult;
use crate::auth::VerifiedIdentity;
use crate::edge::middleware::RequestId;
use crate::edge::server::AppState;
use crate::error::{RelayError, Result};

/// 把一次端点调用结果转换为响应
pub fn relay_response(result: EndpointResult) -> Result<Response> {
    match (result.http_status, result.payload) {
        (Some(status), Some(payload)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            Ok((status, Json(payload)).into_response())
        }
        (status, _) => Err(RelayError::upstream(
            result.endpoint_id,
            result
                .error
                .unwrap_or_else(|| "upstream returned no JSON body".to_string()),
            status,
        )),
    }
}

pub async fn relay_core(
    state: &AppState,
    identity: &VerifiedIdentity,
    endpoint_id: &str,
    request_id: &RequestId,
) -> Result<Response> {
    let result = state
        .aggregator
        .relay(identity, endpoint_id, request_id.as_str())
        .await?;
    relay_response(result)
}

pub async fn get_relay(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Extension(request_id): Extension<RequestId>,
    Path(endpoint_id): Path<String>,
) -> Result<Response> {
    relay_core(&state, &identity, &endpoint_id, &request_id).await
}
