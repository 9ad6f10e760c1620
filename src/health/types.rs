//! # 健康监控类型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// 健康成功率阈值
pub const HEALTHY_THRESHOLD: f64 = 0.9;
/// 降级成功率阈值
pub const DEGRADED_THRESHOLD: f64 = 0.5;

/// 端点健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Healthy,
    Degraded,
    Down,
}

impl EndpointStatus {
    /// 由成功率推导状态
    #[must_use]
    pub fn from_success_rate(rate: f64) -> Self {
        if rate >= HEALTHY_THRESHOLD {
            Self::Healthy
        } else if rate >= DEGRADED_THRESHOLD {
            Self::Degraded
        } else {
            Self::Down
        }
    }
}

/// 单个上游端点的健康记录
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointHealthEntry {
    /// 端点ID
    pub endpoint_id: String,
    /// 最后成功时间
    pub last_success: Option<DateTime<Utc>>,
    /// 最后失败时间
    pub last_failure: Option<DateTime<Utc>>,
    /// 成功次数（全部历史）
    pub success_count: u64,
    /// 失败次数（全部历史）
    pub failure_count: u64,
    /// 最近的延迟样本（毫秒），先进先出
    latencies: VecDeque<u64>,
    /// 窗口容量
    capacity: usize,
    /// 窗口内平均延迟
    pub avg_latency_ms: f64,
}

impl EndpointHealthEntry {
    #[must_use]
    pub fn new(endpoint_id: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            endpoint_id: endpoint_id.into(),
            last_success: None,
            last_failure: None,
            success_count: 0,
            failure_count: 0,
            latencies: VecDeque::with_capacity(capacity),
            capacity,
            avg_latency_ms: 0.0,
        }
    }

    /// 记录一次观测
    pub fn observe(&mut self, success: bool, latency_ms: u64, at: DateTime<Utc>) {
        if success {
            self.success_count += 1;
            self.last_success = Some(at);
        } else {
            self.failure_count += 1;
            self.last_failure = Some(at);
        }

        self.latencies.push_back(latency_ms);
        while self.latencies.len() > self.capacity {
            self.latencies.pop_front();
        }

        let sum: u64 = self.latencies.iter().sum();
        self.avg_latency_ms = sum as f64 / self.latencies.len() as f64;
    }

    /// 观测总数
    #[must_use]
    pub fn observations(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// 成功率（全部历史），无观测时为 `None`
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.observations();
        (total > 0).then(|| self.success_count as f64 / total as f64)
    }

    /// 当前状态，无观测时为 `None`
    #[must_use]
    pub fn status(&self) -> Option<EndpointStatus> {
        self.success_rate().map(EndpointStatus::from_success_rate)
    }

    /// 当前延迟窗口，从旧到新
    #[must_use]
    pub fn window(&self) -> Vec<u64> {
        self.latencies.iter().copied().collect()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 对外展示的明细
    #[must_use]
    pub fn detail(&self) -> Option<EndpointHealthDetail> {
        let rate = self.success_rate()?;
        Some(EndpointHealthDetail {
            status: EndpointStatus::from_success_rate(rate),
            last_success: self.last_success,
            last_failure: self.last_failure,
            success_rate: (rate * 100.0).round() as u8,
            avg_latency_ms: self.avg_latency_ms,
            success_count: self.success_count,
            failure_count: self.failure_count,
        })
    }
}

/// 单端点健康明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointHealthDetail {
    pub status: EndpointStatus,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    /// 0-100 的整数百分比
    pub success_rate: u8,
    pub avg_latency_ms: f64,
    pub success_count: u64,
    pub failure_count: u64,
}

/// 健康快照（只读视图）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub total_endpoints: usize,
    pub healthy_endpoints: usize,
    pub degraded_endpoints: usize,
    pub down_endpoints: usize,
    /// 各端点平均延迟的平均值
    pub avg_latency_ms: f64,
    pub last_checked: DateTime<Utc>,
    /// 只包含至少有一次观测的端点
    pub endpoints: BTreeMap<String, EndpointHealthDetail>,
}

impl HealthSnapshot {
    /// 由端点明细构建快照
    #[must_use]
    pub fn from_details(
        endpoints: BTreeMap<String, EndpointHealthDetail>,
        last_checked: DateTime<Utc>,
    ) -> Self {
        let count = |status: EndpointStatus| {
            endpoints
                .values()
                .filter(|detail| detail.status == status)
                .count()
        };

        let avg_latency_ms = if endpoints.is_empty() {
            0.0
        } else {
            endpoints.values().map(|d| d.avg_latency_ms).sum::<f64>() / endpoints.len() as f64
        };

        Self {
            total_endpoints: endpoints.len(),
            healthy_endpoints: count(EndpointStatus::Healthy),
            degraded_endpoints: count(EndpointStatus::Degraded),
            down_endpoints: count(EndpointStatus::Down),
            avg_latency_ms,
            last_checked,
            endpoints,
        }
    }
}
