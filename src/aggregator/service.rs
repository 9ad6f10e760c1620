//! # 聚合服务
//!
//! 签发一次内部令牌，并行扇出到全部上游端点，每个调用先写入健康监控再参与合并。

use chrono::Utc;
use futures::future::join_all;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Instant;

use super::merge::build_payload;
use super::payload::UnifiedMetricsPayload;
use super::upstream::{EndpointResult, UpstreamClient};
use crate::auth::{TokenMinter, VerifiedIdentity};
use crate::config::{AppConfig, EndpointConfig};
use crate::error::{Context, RelayError, Result};
use crate::health::EndpointHealthMonitor;
use crate::logging::{LogComponent, LogStage};
use crate::session::{DASHBOARD_FETCH_EVENT, SessionRecorder};
use crate::{ldebug, linfo, lwarn};

/// 一次聚合的完整结果
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub payload: UnifiedMetricsPayload,
    pub total_latency_ms: u64,
}

impl AggregationOutcome {
    /// 各端点调用结果
    #[must_use]
    pub fn results(&self) -> &[EndpointResult] {
        &self.payload.proxy.endpoints
    }
}

/// 聚合器
#[derive(Debug, Clone)]
pub struct Aggregator {
    minter: TokenMinter,
    upstream: UpstreamClient,
    endpoints: Arc<[EndpointConfig]>,
    monitor: Arc<EndpointHealthMonitor>,
    recorder: SessionRecorder,
}

impl Aggregator {
    pub fn new(
        config: &AppConfig,
        monitor: Arc<EndpointHealthMonitor>,
        recorder: SessionRecorder,
    ) -> Result<Self> {
        Ok(Self {
            minter: TokenMinter::new(&config.token),
            upstream: UpstreamClient::new(&config.upstream)?,
            endpoints: config.upstream.endpoints.clone().into(),
            monitor,
            recorder,
        })
    }

    #[must_use]
    pub fn endpoints(&self) -> &[EndpointConfig] {
        &self.endpoints
    }

    #[must_use]
    pub fn monitor(&self) -> &Arc<EndpointHealthMonitor> {
        &self.monitor
    }

    /// 调用一个端点并记录健康状态
    async fn dispatch(
        &self,
        base_url: &str,
        endpoint: &EndpointConfig,
        token: &str,
        identity: &VerifiedIdentity,
        request_id: &str,
    ) -> EndpointResult {
        let result = self.upstream.call(base_url, endpoint, token, identity).await;
        self.monitor
            .record(&result.endpoint_id, result.success, result.latency_ms);

        if result.success {
            ldebug!(
                request_id,
                LogStage::Upstream,
                LogComponent::Aggregator,
                "upstream_call",
                "上游调用成功",
                endpoint = %result.endpoint_id,
                latency_ms = result.latency_ms
            );
        } else {
            lwarn!(
                request_id,
                LogStage::Upstream,
                LogComponent::Aggregator,
                "upstream_call",
                "上游调用失败，使用默认值",
                endpoint = %result.endpoint_id,
                status = ?result.http_status,
                error = result.error.as_deref().unwrap_or("unknown"),
                latency_ms = result.latency_ms
            );
        }
        result
    }

    /// 聚合全部端点
    ///
    /// 扇出在独立任务中完成：调用方被取消（客户端断开）时，健康记录和会话事件照常写入。
    pub async fn aggregate(
        &self,
        identity: &VerifiedIdentity,
        session_id: Option<&str>,
        request_id: &str,
    ) -> Result<AggregationOutcome> {
        let aggregator = self.clone();
        let identity = identity.clone();
        let session_id = session_id.map(str::to_owned);
        let request_id = request_id.to_owned();

        tokio::spawn(async move {
            aggregator
                .aggregate_settled(&identity, session_id.as_deref(), &request_id)
                .await
        })
        .await
        .map_err(|e| RelayError::aggregation_with_source("aggregation task aborted", e))?
    }

    async fn aggregate_settled(
        &self,
        identity: &VerifiedIdentity,
        session_id: Option<&str>,
        request_id: &str,
    ) -> Result<AggregationOutcome> {
        let started = Instant::now();
        let token = self.minter.mint(identity).context("minting internal token")?;
        let base_url = self.upstream.base_url()?;

        let calls = self.endpoints.iter().map(|endpoint| {
            self.dispatch(base_url, endpoint, &token, identity, request_id)
        });
        let results = join_all(calls).await;

        let total_latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let succeeded = results.iter().filter(|result| result.success).count();
        let snapshot = self.monitor.snapshot();
        let payload = build_payload(results, identity, &snapshot, total_latency_ms, Utc::now());

        linfo!(
            request_id,
            LogStage::Aggregation,
            LogComponent::Aggregator,
            "aggregate",
            "聚合完成",
            user_id = %identity.user_id,
            endpoints = payload.proxy.endpoints.len(),
            succeeded = succeeded,
            total_latency_ms = total_latency_ms
        );

        if let Some(session_id) = session_id {
            let mut event = Map::new();
            event.insert("endpoints".to_string(), json!(payload.proxy.endpoints.len()));
            event.insert("succeeded".to_string(), json!(succeeded));
            event.insert("totalLatencyMs".to_string(), json!(total_latency_ms));
            event.insert("vpsReachable".to_string(), Value::Bool(payload.health.vps_reachable));
            event.insert(
                "verdict".to_string(),
                serde_json::to_value(payload.system_verdict.state).unwrap_or(Value::Null),
            );
            // 不等待写入结果
            let _ = self.recorder.record(
                request_id,
                session_id,
                &identity.user_id,
                DASHBOARD_FETCH_EVENT,
                event,
            );
        }

        Ok(AggregationOutcome {
            payload,
            total_latency_ms,
        })
    }

    /// 单端点转发：同样的令牌、超时和健康记录
    pub async fn relay(
        &self,
        identity: &VerifiedIdentity,
        endpoint_id: &str,
        request_id: &str,
    ) -> Result<EndpointResult> {
        let endpoint = self
            .endpoints
            .iter()
            .find(|endpoint| endpoint.id == endpoint_id)
            .ok_or_else(|| RelayError::not_found(format!("endpoint '{endpoint_id}'")))?;

        let token = self.minter.mint(identity).context("minting internal token")?;
        let base_url = self.upstream.base_url()?.to_owned();

        let aggregator = self.clone();
        let endpoint = endpoint.clone();
        let identity = identity.clone();
        let request_id = request_id.to_owned();
        tokio::spawn(async move {
            aggregator
                .dispatch(&base_url, &endpoint, &token, &identity, &request_id)
                .await
        })
        .await
        .map_err(|e| RelayError::aggregation_with_source("relay task aborted", e))
    }
}
