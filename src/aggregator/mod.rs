//! # 聚合模块
//!
//! 把一次浏览器请求扇出为多个并行的上游调用，并合并为统一的版本化载荷。

pub mod derive;
pub mod merge;
pub mod payload;
pub mod service;
pub mod upstream;

pub use merge::{UpstreamFacts, build_payload, collect_facts, endpoint_ids, parse_timestamp};
pub use payload::{FreshnessStatus, MarketState, UnifiedMetricsPayload, VerdictState};
pub use service::{AggregationOutcome, Aggregator};
pub use upstream::{
    EndpointResult, RELAY_USER_EMAIL_HEADER, RELAY_USER_ID_HEADER, UpstreamClient,
};
