//! # 端点健康监控模块
//!
//! 以滑动窗口跟踪每个上游端点的延迟与成功率，为聚合响应提供 `_health` 快照。

pub mod monitor;
pub mod types;

pub use monitor::EndpointHealthMonitor;
pub use types::{
    DEGRADED_THRESHOLD, EndpointHealthDetail, EndpointHealthEntry, EndpointStatus,
    HEALTHY_THRESHOLD, HealthSnapshot,
};
