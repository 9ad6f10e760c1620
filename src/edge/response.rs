//! # 错误响应
//!
//! 所有错误出口统一为 `{error, message?, hint?, planned?}`，日志由请求ID中间件输出。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::RelayError;
use crate::logging::{LogComponent, LogStage};
use crate::{lerror, lwarn};

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<String>,
}

impl From<&RelayError> for ErrorBody {
    fn from(err: &RelayError) -> Self {
        Self {
            error: err.error_label(),
            message: Some(err.public_message()),
            hint: err.hint(),
            planned: err.planned().to_vec(),
        }
    }
}

/// 随响应扩展传给请求ID中间件的错误信息
#[derive(Debug, Clone)]
pub struct ErrorLog {
    pub status: StatusCode,
    pub detail: String,
}

/// 以请求ID记录错误响应；5xx 为 error，其余为 warn
pub fn log_error_response(request_id: &str, log: &ErrorLog) {
    if log.status.is_server_error() {
        lerror!(
            request_id,
            LogStage::Response,
            LogComponent::EdgeRouter,
            "error_response",
            "请求处理失败",
            status = log.status.as_u16(),
            error = %log.detail
        );
    } else {
        lwarn!(
            request_id,
            LogStage::Response,
            LogComponent::EdgeRouter,
            "error_response",
            "请求被拒绝",
            status = log.status.as_u16(),
            error = %log.detail
        );
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(ErrorBody::from(&self))).into_response();

        // 401 已由验证器记录，501 是固定的占位响应
        if status != StatusCode::UNAUTHORIZED && status != StatusCode::NOT_IMPLEMENTED {
            let detail = if self.is_server_error() {
                format!("{self:?}")
            } else {
                self.to_string()
            };
            response.extensions_mut().insert(ErrorLog { status, detail });
        }
        response
    }
}
