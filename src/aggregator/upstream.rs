//! # 上游调用
//!
//! 对单个上游端点发起一次带超时的 GET，不论结果如何都产出一个 [`EndpointResult`]。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::auth::VerifiedIdentity;
use crate::config::{EndpointConfig, UpstreamConfig};
use crate::error::{RelayError, Result};

/// 身份归属头
pub const RELAY_USER_ID_HEADER: &str = "X-Relay-User-Id";
pub const RELAY_USER_EMAIL_HEADER: &str = "X-Relay-User-Email";

/// 单次上游调用的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointResult {
    pub endpoint_id: String,
    pub path: String,
    /// 响应体（不进入 `_proxy` 元数据）
    #[serde(skip)]
    pub payload: Option<Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
}

impl EndpointResult {
    /// 成功时的响应体
    #[must_use]
    pub fn ok_payload(&self) -> Option<&Value> {
        if self.success {
            self.payload.as_ref()
        } else {
            None
        }
    }
}

/// 上游 HTTP 客户端
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RelayError::internal_with_source("创建上游HTTP客户端失败", e))?;

        Ok(Self {
            client,
            base_url: config.base().map(str::to_string),
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    /// 基础地址，未配置时为配置错误
    pub fn base_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .ok_or_else(|| RelayError::config("upstream base address is not configured"))
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 调用一个端点；超时、连接失败、非 2xx、响应体不是 JSON 都视为失败
    pub async fn call(
        &self,
        base_url: &str,
        endpoint: &EndpointConfig,
        token: &str,
        identity: &VerifiedIdentity,
    ) -> EndpointResult {
        let started = Instant::now();
        let url = format!("{base_url}{}", endpoint.path);

        let outcome = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(RELAY_USER_ID_HEADER, &identity.user_id)
            .header(RELAY_USER_EMAIL_HEADER, &identity.email)
            .timeout(self.timeout)
            .send()
            .await;

        let (success, http_status, payload, error) = match outcome {
            Ok(response) => {
                let status = response.status();
                match response.json::<Value>().await {
                    Ok(body) if status.is_success() => (true, Some(status.as_u16()), Some(body), None),
                    Ok(body) => (
                        false,
                        Some(status.as_u16()),
                        Some(body),
                        Some(format!("upstream returned {status}")),
                    ),
                    Err(e) => (
                        false,
                        Some(status.as_u16()),
                        None,
                        Some(describe_error(&e, self.timeout)),
                    ),
                }
            }
            Err(e) => (false, None, None, Some(describe_error(&e, self.timeout))),
        };

        EndpointResult {
            endpoint_id: endpoint.id.clone(),
            path: endpoint.path.clone(),
            payload,
            success,
            http_status,
            error,
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

fn describe_error(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        format!("timeout after {}ms", timeout.as_millis())
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else if error.is_decode() {
        format!("invalid JSON body: {error}")
    } else {
        error.to_string()
    }
}
