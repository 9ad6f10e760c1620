//! # 应用配置结构定义

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::{RelayError, Result};

/// 应用主配置结构
///
/// 所有字段均有默认值，空配置文件即可启动（缺少密钥或上游地址时请求会返回 503）。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 边缘路由监听配置
    pub server: ServerConfig,
    /// 身份提供方配置
    pub identity: IdentityConfig,
    /// 内部令牌配置
    pub token: TokenConfig,
    /// 上游指标服务配置
    pub upstream: UpstreamConfig,
    /// 端点健康监控配置
    pub health: HealthConfig,
    /// 会话事件存储配置
    pub session: SessionConfig,
    /// 边缘响应头配置
    pub edge: EdgeConfig,
    /// 内部网关配置
    pub gatekeeper: GatekeeperConfig,
}

/// 服务器监听配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// 监听地址字符串
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 身份提供方配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// 用户信息接口，例如 `https://auth.example.com/auth/v1/user`
    pub user_info_url: Option<String>,
    /// 托管认证服务需要的 `apikey` 头
    pub api_key: Option<String>,
    /// 请求超时（毫秒）
    pub timeout_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_info_url: None,
            api_key: None,
            timeout_ms: 5000,
        }
    }
}

/// 内部令牌配置（与内部网关共享）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HS256 对称密钥
    pub signing_secret: Option<String>,
    pub audience: String,
    pub issuer: String,
    /// 有效期（秒）
    pub ttl_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            signing_secret: None,
            audience: "metrics-boundary".to_string(),
            issuer: "dashboard-relay".to_string(),
            ttl_seconds: 60,
        }
    }
}

impl TokenConfig {
    /// 非空密钥
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.signing_secret
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
    }
}

/// 单个上游端点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub id: String,
    pub path: String,
}

impl EndpointConfig {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// 上游指标服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// 内部网关地址（所有扇出请求都经过它）
    pub base_url: Option<String>,
    /// 单次调用超时（毫秒）
    pub timeout_ms: u64,
    pub endpoints: Vec<EndpointConfig>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 3000,
            endpoints: vec![
                EndpointConfig::new("broker", "/brokers/status"),
                EndpointConfig::new("trades", "/trades/live"),
                EndpointConfig::new("strategies", "/strategies/proving"),
                EndpointConfig::new("gates", "/metrics/gate-pressure"),
                EndpointConfig::new("activity", "/system/activity"),
            ],
        }
    }
}

impl UpstreamConfig {
    /// 去掉末尾斜杠的非空基础地址
    #[must_use]
    pub fn base(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    /// 按 id 查找端点
    #[must_use]
    pub fn endpoint(&self, id: &str) -> Option<&EndpointConfig> {
        self.endpoints.iter().find(|endpoint| endpoint.id == id)
    }
}

/// 健康监控配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// 延迟窗口容量
    pub window_capacity: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { window_capacity: 20 }
    }
}

/// 会话事件存储配置；未配置数据库时记录器静默跳过
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub database_url: Option<String>,
}

/// 建议性限流头（固定值，不做实际限流）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitHint {
    pub limit: u32,
    pub remaining: u32,
    /// 重置窗口（秒），`X-RateLimit-Reset` = 下一个窗口边界
    pub window_seconds: u64,
}

impl Default for RateLimitHint {
    fn default() -> Self {
        Self {
            limit: 100,
            remaining: 100,
            window_seconds: 60,
        }
    }
}

/// 边缘路由响应配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub api_version: String,
    pub rate_limit: RateLimitHint,
    /// 旧路径的 `Sunset` 日期（HTTP-date）
    pub legacy_sunset: String,
    /// 允许的 CORS 来源；为空表示允许任意来源
    pub cors_origins: Vec<String>,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            api_version: "1.0".to_string(),
            rate_limit: RateLimitHint::default(),
            legacy_sunset: "Thu, 31 Dec 2026 23:59:59 GMT".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// 内部网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// 网关监听地址
    pub listen: String,
    /// 指标服务地址（只在本机可达）
    pub upstream_addr: String,
    /// 无需令牌即可访问的路径
    pub public_paths: Vec<String>,
    /// nginx 对外监听端口
    pub public_port: u16,
    /// nginx `server_name`
    pub server_name: String,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:9100".to_string(),
            upstream_addr: "127.0.0.1:9000".to_string(),
            public_paths: vec!["/health".to_string()],
            public_port: 8080,
            server_name: "_".to_string(),
        }
    }
}

impl GatekeeperConfig {
    /// 路径是否可以绕过令牌校验
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|public| public == path)
    }

    /// 解析指标服务地址（主机名只在这里解析一次）
    pub fn upstream_socket_addr(&self) -> Result<SocketAddr> {
        resolve_socket_addr("gatekeeper.upstream_addr", &self.upstream_addr)
    }

    /// 解析网关监听地址
    pub fn listen_socket_addr(&self) -> Result<SocketAddr> {
        resolve_socket_addr("gatekeeper.listen", &self.listen)
    }
}

fn resolve_socket_addr(field: &str, value: &str) -> Result<SocketAddr> {
    value
        .to_socket_addrs()
        .map_err(|e| RelayError::config_with_source(format!("{field} 不是合法的 host:port: {value}"), e))?
        .next()
        .ok_or_else(|| RelayError::config(format!("{field} 无法解析为地址: {value}")))
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(RelayError::config("server.port 不能为 0"));
        }
        if self.token.ttl_seconds == 0 {
            return Err(RelayError::config("token.ttl_seconds 必须大于 0"));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(RelayError::config("upstream.timeout_ms 必须大于 0"));
        }
        if self.health.window_capacity == 0 {
            return Err(RelayError::config("health.window_capacity 必须大于 0"));
        }

        if let Some(base) = self.upstream.base() {
            url::Url::parse(base).map_err(|e| {
                RelayError::config_with_source(format!("upstream.base_url 不是合法URL: {base}"), e)
            })?;
        }

        self.gatekeeper.listen_socket_addr()?;
        self.gatekeeper.upstream_socket_addr()?;

        for origin in &self.edge.cors_origins {
            if origin != "*" && axum::http::HeaderValue::from_str(origin).is_err() {
                return Err(RelayError::config(format!("edge.cors_origins 中存在非法来源: {origin:?}")));
            }
        }

        let mut seen = HashSet::new();
        for endpoint in &self.upstream.endpoints {
            if endpoint.id.trim().is_empty() {
                return Err(RelayError::config("upstream.endpoints 中存在空 id"));
            }
            if !endpoint.path.starts_with('/') {
                return Err(RelayError::config(format!(
                    "端点 {} 的 path 必须以 / 开头",
                    endpoint.id
                )));
            }
            if !seen.insert(endpoint.id.as_str()) {
                return Err(RelayError::config(format!("重复的端点 id: {}", endpoint.id)));
            }
        }

        Ok(())
    }
}
