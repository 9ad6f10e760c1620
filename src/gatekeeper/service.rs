//! # 网关代理服务
//!
//! 基于 Pingora 的准入代理：每个受保护路径的请求都先经过 [`decide`]，
//! 拒绝的请求直接返回 JSON 401，永远不会到达指标服务。

use async_trait::async_trait;
use bytes::Bytes;
use pingora_core::server::{Server, configuration::Opt};
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Error as PingoraError;
use pingora_http::{RequestHeader, ResponseHeader};
use pingora_proxy::{ProxyHttp, Session, http_proxy_service};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::decision::{Decision, DenyReason, GatekeeperKeys, IdentityHeaders, decide};
use crate::config::{AppConfig, GatekeeperConfig};
use crate::error::{RelayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo, lwarn};

/// 注入给指标服务的用户 ID 头
pub const USER_ID_HEADER: &str = "x-user-id";
/// 注入给指标服务的用户邮箱头
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// 一次请求的准入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// 公开路径，不校验令牌
    Bypass,
    Allow(IdentityHeaders),
    Deny(DenyReason),
}

/// 按路径和 `Authorization` 头计算准入结果
#[must_use]
pub fn evaluate(
    path: &str,
    authorization: Option<&str>,
    config: &GatekeeperConfig,
    keys: &GatekeeperKeys,
) -> GateOutcome {
    if config.is_public(path) {
        return GateOutcome::Bypass;
    }
    match decide(authorization, keys) {
        Decision::Allow(identity) => GateOutcome::Allow(identity),
        Decision::Deny(reason) => GateOutcome::Deny(reason),
    }
}

/// 拒绝响应体
#[must_use]
pub fn deny_body(reason: DenyReason) -> String {
    json!({
        "error": "unauthorized",
        "reason": reason.as_str(),
    })
    .to_string()
}

/// 请求上下文
#[derive(Debug)]
pub struct GateContext {
    pub request_id: String,
    pub started: Instant,
    pub identity: Option<IdentityHeaders>,
}

/// 网关代理服务
#[derive(Debug)]
pub struct GatekeeperService {
    config: GatekeeperConfig,
    keys: GatekeeperKeys,
    /// 启动时解析好的指标服务地址
    upstream: SocketAddr,
}

impl GatekeeperService {
    pub fn new(config: GatekeeperConfig, keys: GatekeeperKeys) -> Result<Self> {
        let upstream = config.upstream_socket_addr()?;
        Ok(Self {
            config,
            keys,
            upstream,
        })
    }

    #[must_use]
    pub const fn upstream(&self) -> SocketAddr {
        self.upstream
    }

    async fn write_denial(session: &mut Session, reason: DenyReason) -> pingora_core::Result<()> {
        let body = deny_body(reason);
        let mut resp = ResponseHeader::build(401, Some(3))?;
        resp.insert_header("content-type", "application/json; charset=utf-8")?;
        resp.insert_header("cache-control", "no-store")?;
        resp.set_content_length(body.len())?;

        session.write_response_header(Box::new(resp), false).await?;
        session
            .write_response_body(Some(Bytes::from(body)), true)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProxyHttp for GatekeeperService {
    type CTX = GateContext;

    fn new_ctx(&self) -> Self::CTX {
        GateContext {
            request_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
            identity: None,
        }
    }

    async fn request_filter(
        &self,
        session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<bool> {
        let header = session.req_header();
        let path = header.uri.path().to_string();
        let authorization = header
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok());

        match evaluate(&path, authorization, &self.config, &self.keys) {
            GateOutcome::Bypass => {
                ldebug!(
                    ctx.request_id,
                    LogStage::Gatekeeping,
                    LogComponent::Gatekeeper,
                    "public_path",
                    "公开路径，跳过令牌校验",
                    path = %path
                );
                Ok(false)
            }
            GateOutcome::Allow(identity) => {
                ldebug!(
                    ctx.request_id,
                    LogStage::Gatekeeping,
                    LogComponent::Gatekeeper,
                    "allow",
                    "令牌校验通过",
                    path = %path,
                    user_id = %identity.user_id
                );
                ctx.identity = Some(identity);
                Ok(false)
            }
            GateOutcome::Deny(reason) => {
                lwarn!(
                    ctx.request_id,
                    LogStage::Gatekeeping,
                    LogComponent::Gatekeeper,
                    "deny",
                    "拒绝请求",
                    path = %path,
                    reason = reason.as_str()
                );
                Self::write_denial(session, reason).await?;
                Ok(true)
            }
        }
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> pingora_core::Result<Box<HttpPeer>> {
        Ok(Box::new(HttpPeer::new(self.upstream, false, String::new())))
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut RequestHeader,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<()> {
        // 先剥离客户端自带的归属头
        upstream_request.remove_header(USER_ID_HEADER);
        upstream_request.remove_header(USER_EMAIL_HEADER);
        upstream_request.remove_header("authorization");

        if let Some(identity) = &ctx.identity {
            upstream_request.insert_header(USER_ID_HEADER, identity.user_id.clone())?;
            if !identity.email.is_empty() {
                upstream_request.insert_header(USER_EMAIL_HEADER, identity.email.clone())?;
            }
        }
        Ok(())
    }

    async fn logging(
        &self,
        session: &mut Session,
        e: Option<&PingoraError>,
        ctx: &mut Self::CTX,
    ) {
        let duration_ms = ctx.started.elapsed().as_millis();
        let status = session
            .response_written()
            .map_or(0, |resp| resp.status.as_u16());

        if let Some(error) = e {
            lwarn!(
                ctx.request_id,
                LogStage::Response,
                LogComponent::Gatekeeper,
                "request_failed",
                "网关转发失败",
                error = %error,
                status = status,
                duration_ms = duration_ms
            );
        } else {
            ldebug!(
                ctx.request_id,
                LogStage::Response,
                LogComponent::Gatekeeper,
                "request_completed",
                "网关请求完成",
                status = status,
                duration_ms = duration_ms
            );
        }
    }
}

fn pingora_options() -> Opt {
    Opt {
        daemon: false,
        upgrade: false,
        nocapture: true,
        ..Opt::default()
    }
}

/// 启动网关并阻塞直到进程退出
pub async fn run_gatekeeper(config: Arc<AppConfig>) -> Result<()> {
    let keys = GatekeeperKeys::from_config(&config.token)?;
    let service = GatekeeperService::new(config.gatekeeper.clone(), keys)?;
    let listen = config.gatekeeper.listen_socket_addr()?.to_string();

    let mut server = Server::new(Some(pingora_options()))
        .map_err(|err| RelayError::internal(format!("Failed to create Pingora server: {err}")))?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::ServerSetup,
        "bootstrapping_server",
        "启动Pingora服务器引导"
    );
    server.bootstrap();

    let mut http_service = http_proxy_service(&server.configuration, service);
    http_service.add_tcp(&listen);
    server.add_service(http_service);

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Gatekeeper,
        "starting_server",
        "启动内部网关",
        listen = %listen,
        upstream = %config.gatekeeper.upstream_addr
    );

    let handle = tokio::task::spawn_blocking(move || {
        server.run_forever();
    });

    handle
        .await
        .map_err(|err| RelayError::internal(format!("Pingora server task failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn keys() -> GatekeeperKeys {
        GatekeeperKeys::new("secret", "dashboard-relay", "metrics-boundary")
    }

    #[test]
    fn public_path_bypasses_decision() {
        let config = GatekeeperConfig::default();
        assert_eq!(evaluate("/health", None, &config, &keys()), GateOutcome::Bypass);
    }

    #[test]
    fn protected_path_without_token_is_denied() {
        let config = GatekeeperConfig::default();
        assert_eq!(
            evaluate("/brokers/status", None, &config, &keys()),
            GateOutcome::Deny(DenyReason::MissingCredential)
        );
        // 前缀相同也不算公开路径
        assert_eq!(
            evaluate("/health/internal", None, &config, &keys()),
            GateOutcome::Deny(DenyReason::MissingCredential)
        );
    }

    #[test]
    fn service_resolves_upstream_once_and_rejects_bad_address() {
        let service = GatekeeperService::new(GatekeeperConfig::default(), keys()).unwrap();
        assert_eq!(service.upstream(), "127.0.0.1:9000".parse::<SocketAddr>().unwrap());

        let config = GatekeeperConfig {
            upstream_addr: "metrics-service".to_string(),
            ..GatekeeperConfig::default()
        };
        let err = GatekeeperService::new(config, keys()).unwrap_err();
        assert_eq!(err.error_label(), "configuration_error");
    }

    #[test]
    fn deny_body_carries_reason() {
        let body: Value = serde_json::from_str(&deny_body(DenyReason::InvalidAudience)).unwrap();
        assert_eq!(body["error"], "unauthorized");
        assert_eq!(body["reason"], "invalid_audience");
    }
}
