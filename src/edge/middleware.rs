//! # 边缘路由中间件
//!
//! 请求ID、凭证验证、建议性限流头和旧版路径的弃用头。

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use uuid::Uuid;

use super::response::{ErrorLog, log_error_response};
use super::server::AppState;
use crate::auth::AuthUtils;
use crate::config::{EdgeConfig, RateLimitHint};
use crate::error::RelayError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";
pub const API_VERSION_HEADER: &str = "x-api-version";
/// 可选的浏览器会话ID
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// 每个请求一个 uuid v4
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 为请求分配ID并回写到响应头；错误响应在这里带着请求ID记录日志
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Some(log) = response.extensions_mut().remove::<ErrorLog>() {
        log_error_response(&request_id, &log);
    }
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// 下一个限流窗口的起点（epoch 秒）
#[must_use]
pub fn next_window_reset(now_epoch: i64, window_seconds: u64) -> i64 {
    let window = i64::try_from(window_seconds.max(1)).unwrap_or(i64::MAX);
    now_epoch - now_epoch.rem_euclid(window) + window
}

/// 写入建议性限流头和 API 版本头；数值来自配置，不做实际限流
pub fn apply_advisory_headers(headers: &mut HeaderMap, config: &EdgeConfig, now_epoch: i64) {
    let RateLimitHint {
        limit,
        remaining,
        window_seconds,
    } = &config.rate_limit;

    headers.insert(
        HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER),
        HeaderValue::from(*limit),
    );
    headers.insert(
        HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
        HeaderValue::from(*remaining),
    );
    headers.insert(
        HeaderName::from_static(RATE_LIMIT_RESET_HEADER),
        HeaderValue::from(next_window_reset(now_epoch, *window_seconds)),
    );
    if let Ok(version) = HeaderValue::from_str(&config.api_version) {
        headers.insert(HeaderName::from_static(API_VERSION_HEADER), version);
    }
}

/// 认证中间件
///
/// 验证通过后把 [`VerifiedIdentity`](crate::auth::VerifiedIdentity) 注入请求扩展。
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, RelayError> {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone());
    let authorization =
        AuthUtils::extract_authorization_header(request.headers()).map(str::to_owned);

    let identity = state
        .verifier
        .verify(authorization.as_deref(), &request_id)
        .await?;
    request.extensions_mut().insert(identity);

    let mut response = next.run(request).await;
    apply_advisory_headers(
        response.headers_mut(),
        &state.config.edge,
        Utc::now().timestamp(),
    );
    Ok(response)
}

/// 旧版路径的后继信息
#[derive(Debug, Clone)]
pub struct LegacyRoute {
    pub successor: &'static str,
    pub sunset: String,
}

impl LegacyRoute {
    pub fn new(successor: &'static str, sunset: impl Into<String>) -> Self {
        Self {
            successor,
            sunset: sunset.into(),
        }
    }
}

/// 为旧版路径添加 `Deprecation` / `Sunset` / `Link` 头
pub async fn legacy_headers(
    State(route): State<LegacyRoute>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("deprecation", HeaderValue::from_static("true"));
    if let Ok(sunset) = HeaderValue::from_str(&route.sunset) {
        headers.insert("sunset", sunset);
    }
    if let Ok(link) =
        HeaderValue::from_str(&format!("<{}>; rel=\"successor-version\"", route.successor))
    {
        headers.insert("link", link);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_is_next_window_boundary() {
        assert_eq!(next_window_reset(1_000, 60), 1_020);
        assert_eq!(next_window_reset(1_020, 60), 1_080);
        assert_eq!(next_window_reset(5, 0), 6);
    }

    #[test]
    fn advisory_headers_come_from_config() {
        let config = EdgeConfig::default();
        let mut headers = HeaderMap::new();
        apply_advisory_headers(&mut headers, &config, 1_000);

        assert_eq!(headers[RATE_LIMIT_LIMIT_HEADER], "100");
        assert_eq!(headers[RATE_LIMIT_REMAINING_HEADER], "100");
        assert_eq!(headers[RATE_LIMIT_RESET_HEADER], "1020");
        assert_eq!(headers[API_VERSION_HEADER], "1.0");
    }
}
