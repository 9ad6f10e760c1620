//! # 未实现的占位路径

use crate::error::RelayError;

/// 计划中的推送路径
pub const PLANNED_STREAM_PATHS: [&str; 2] = ["/v1/stream/dashboard", "/v1/stream/health"];

/// 推送更新尚未提供，返回 501 和计划路径；在此之前轮询 `/v1/dashboard`
pub async fn stream_stub() -> RelayError {
    RelayError::not_implemented("streaming updates", &PLANNED_STREAM_PATHS)
}
