//! # 统一指标载荷
//!
//! 每次聚合新建一份，构建完成后不再修改。所有段落都有默认值，
//! 上游缺失时前端仍能拿到完整结构。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::upstream::EndpointResult;

/// 载荷版本
pub const PAYLOAD_VERSION: &str = "1.0";

/// 期货市场键
pub const FUTURES_MARKET: &str = "futures";
/// 加密市场键（尚未接入数据）
pub const CRYPTO_MARKET: &str = "crypto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketState {
    Live,
    Off,
    Degraded,
    NotInstrumented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FreshnessStatus {
    Healthy,
    Degraded,
    Stale,
    Unknown,
    NotInstrumented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictState {
    SafePartial,
    Unsafe,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemVerdict {
    pub state: VerdictState,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRecommendation {
    pub value: String,
    pub details: Option<String>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfidence {
    /// 0-100
    pub score: u8,
    pub futures: u8,
    pub crypto: u8,
    /// 存在未接入数据的市场时封顶为 85
    pub capped: bool,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSection {
    pub state: MarketState,
    pub instrumented: bool,
    pub connected: bool,
    pub token_valid: bool,
    pub kill_active: bool,
    pub latency_ms: u64,
    pub last_update: Option<DateTime<Utc>>,
    pub drift: String,
    pub active_strategies: u64,
    pub last_signal: Option<Value>,
    pub last_denial: Option<Value>,
}

impl MarketSection {
    /// 未接入数据的市场占位
    #[must_use]
    pub fn not_instrumented() -> Self {
        Self {
            state: MarketState::NotInstrumented,
            instrumented: false,
            connected: false,
            token_valid: false,
            kill_active: false,
            latency_ms: 0,
            last_update: None,
            drift: "N/A".to_string(),
            active_strategies: 0,
            last_signal: None,
            last_denial: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFreshness {
    pub status: FreshnessStatus,
    pub age_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFreshness {
    pub futures: MarketFreshness,
    pub crypto: MarketFreshness,
    pub global: FreshnessStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvingPipeline {
    pub total_strategies: u64,
    pub active_strategies: u64,
    pub intents_emitted: u64,
    pub intents_denied: u64,
    /// 0-100，未产生意图时为空
    pub intent_quality: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotions {
    pub total_to_live: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatePressure {
    /// LOW / MEDIUM / HIGH；上游缺失时为 UNKNOWN
    pub level: String,
    pub total_denials: u64,
    pub denials_last_hour: u64,
    pub by_gate: Value,
}

impl Default for GatePressure {
    fn default() -> Self {
        Self {
            level: "UNKNOWN".to_string(),
            total_denials: 0,
            denials_last_hour: 0,
            by_gate: Value::Object(serde_json::Map::new()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyActivity {
    pub proving_pipeline: ProvingPipeline,
    pub promotions: Promotions,
    pub gate_pressure: GatePressure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub side: String,
    pub size: f64,
    pub entry_price: Option<f64>,
    pub strategy: Option<String>,
    pub state: Option<String>,
    pub unrealized_pnl: Option<f64>,
    pub opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub time: DateTime<Utc>,
    pub market: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    pub last_updated_metrics: Option<DateTime<Utc>>,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemActivity {
    pub seeding_active: bool,
    pub uptime_seconds: f64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSection {
    pub vps_reachable: bool,
    pub total_endpoints: usize,
    pub healthy_endpoints: usize,
    pub degraded_endpoints: usize,
    pub down_endpoints: usize,
    pub avg_latency_ms: f64,
    pub last_checked: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyMetadata {
    pub source: String,
    pub auth: String,
    pub user: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub endpoints: Vec<EndpointResult>,
    pub total_latency_ms: u64,
}

/// 统一指标载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedMetricsPayload {
    pub version: String,
    pub system_verdict: SystemVerdict,
    pub operator_recommendation: OperatorRecommendation,
    pub system_confidence: SystemConfidence,
    pub markets: BTreeMap<String, MarketSection>,
    pub data_freshness: DataFreshness,
    pub strategy_activity: StrategyActivity,
    pub positions: Vec<Position>,
    pub session_timeline: Vec<TimelineEvent>,
    pub timestamps: Timestamps,
    pub system_activity: SystemActivity,
    #[serde(rename = "_health")]
    pub health: HealthSection,
    #[serde(rename = "_proxy")]
    pub proxy: ProxyMetadata,
}
