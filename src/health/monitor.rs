//! # 端点健康监控器
//!
//! 进程内唯一的可变共享状态。每个端点一条记录，首次观测时创建；
//! 同一端点的更新在 `DashMap` 的条目锁内完成，快照读取允许轻微滞后。

use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeMap;

use super::types::{EndpointHealthEntry, HealthSnapshot};

/// 端点健康监控器
#[derive(Debug)]
pub struct EndpointHealthMonitor {
    entries: DashMap<String, EndpointHealthEntry>,
    window_capacity: usize,
}

impl EndpointHealthMonitor {
    #[must_use]
    pub fn new(window_capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            window_capacity: window_capacity.max(1),
        }
    }

    /// 记录一次调用结果
    pub fn record(&self, endpoint_id: &str, success: bool, latency_ms: u64) {
        let now = Utc::now();
        let mut entry = self
            .entries
            .entry(endpoint_id.to_string())
            .or_insert_with(|| EndpointHealthEntry::new(endpoint_id, self.window_capacity));
        entry.observe(success, latency_ms, now);
    }

    /// 构建当前快照
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        let endpoints: BTreeMap<_, _> = self
            .entries
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .detail()
                    .map(|detail| (entry.key().clone(), detail))
            })
            .collect();

        HealthSnapshot::from_details(endpoints, Utc::now())
    }

    /// 单个端点的记录副本
    #[must_use]
    pub fn endpoint(&self, endpoint_id: &str) -> Option<EndpointHealthEntry> {
        self.entries.get(endpoint_id).map(|entry| entry.value().clone())
    }

    /// 清空所有记录
    pub fn reset(&self) {
        self.entries.clear();
    }

    /// 已观测的端点数
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }
}

impl Default for EndpointHealthMonitor {
    fn default() -> Self {
        Self::new(20)
    }
}
