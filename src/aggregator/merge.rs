//! # 上游结果合并
//!
//! 把各端点的原始 JSON 归一化为类型化的事实，再组装成 [`UnifiedMetricsPayload`]。
//! 失败的端点只贡献默认值，部分失败不会让聚合失败。

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use super::derive;
use super::payload::{
    CRYPTO_MARKET, DataFreshness, FUTURES_MARKET, FreshnessStatus, GatePressure, HealthSection,
    MarketFreshness, MarketSection, MarketState, PAYLOAD_VERSION, Position, Promotions,
    ProvingPipeline, ProxyMetadata, StrategyActivity, SystemActivity, Timestamps,
    UnifiedMetricsPayload,
};
use super::upstream::EndpointResult;
use crate::auth::VerifiedIdentity;
use crate::health::HealthSnapshot;
use crate::utils::FieldChain;

/// 端点ID
pub mod endpoint_ids {
    pub const BROKER: &str = "broker";
    pub const TRADES: &str = "trades";
    pub const STRATEGIES: &str = "strategies";
    pub const GATES: &str = "gates";
    pub const ACTIVITY: &str = "activity";
}

/// 字段回退链，声明一次、按固定顺序求值
pub mod fields {
    use crate::utils::FieldChain;

    pub const CONNECTED: FieldChain = FieldChain(&["connected", "is_connected", "status.connected"]);
    pub const TOKEN_VALID: FieldChain = FieldChain(&["token_valid", "tokenValid"]);
    pub const KILL_ACTIVE: FieldChain = FieldChain(&["killing_active", "kill_active"]);

    pub const TRADES: FieldChain = FieldChain(&["trades", "positions"]);
    pub const SYMBOL: FieldChain = FieldChain(&["symbol", "instrument"]);
    pub const SIZE: FieldChain = FieldChain(&["size", "quantity", "qty"]);
    pub const ENTRY_PRICE: FieldChain = FieldChain(&["entry_price", "entryPrice", "avg_price"]);
    pub const SIDE: FieldChain = FieldChain(&["side", "direction"]);
    pub const STRATEGY: FieldChain = FieldChain(&["strategy", "strategy_id"]);
    pub const UNREALIZED_PNL: FieldChain = FieldChain(&["unrealized_pnl", "pnl"]);

    pub const STRATEGY_ITEMS: FieldChain = FieldChain(&["strategies", "items"]);
    pub const ITEM_STATE: FieldChain = FieldChain(&["state", "status"]);
    pub const INTENTS_EMITTED: FieldChain = FieldChain(&["intents.total_emitted"]);
    pub const INTENTS_DENIED: FieldChain = FieldChain(&["intents.total_denied"]);
    pub const PROMOTIONS_TO_LIVE: FieldChain = FieldChain(&["promotions.total_to_live"]);
    pub const LAST_SIGNAL: FieldChain = FieldChain(&["last_signal", "intents.last_emitted"]);

    pub const PRESSURE_LEVEL: FieldChain = FieldChain(&["pressure_level", "level"]);
    pub const TOTAL_DENIALS: FieldChain = FieldChain(&["total_denials"]);
    pub const DENIALS_LAST_HOUR: FieldChain = FieldChain(&["denials_last_hour"]);
    pub const BY_GATE: FieldChain = FieldChain(&["by_gate"]);
    pub const LAST_DENIAL: FieldChain = FieldChain(&["last_denial", "last_reason"]);
    pub const DRIFT: FieldChain = FieldChain(&["drift_verdict", "drift"]);

    pub const SEEDING_ACTIVE: FieldChain = FieldChain(&["seeding_active", "seedingActive"]);
    pub const UPTIME: FieldChain = FieldChain(&["system_uptime", "uptime_seconds"]);
    pub const CPU: FieldChain = FieldChain(&["cpu_usage", "cpu_percent"]);
    pub const MEMORY: FieldChain = FieldChain(&["memory_usage", "memory_percent"]);

    pub const TIMESTAMP: FieldChain = FieldChain(&["timestamp_utc", "timestamp"]);
}

/// 上游时间戳：RFC3339、无时区 ISO（按 UTC）或 epoch 秒/毫秒
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                        .iter()
                        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
        }
        Value::Number(number) => {
            let raw = number.as_f64()?;
            let millis = if raw > 1e12 { raw } else { raw * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        _ => None,
    }
}

fn timestamp_of(data: &Value) -> Option<DateTime<Utc>> {
    fields::TIMESTAMP.resolve(data).and_then(parse_timestamp)
}

/// 经纪商连接事实
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrokerFacts {
    pub connected: bool,
    pub token_valid: bool,
    pub kill_active: bool,
    pub latency_ms: u64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// 策略流水线事实
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyFacts {
    pub pipeline: ProvingPipeline,
    pub promotions: Promotions,
    pub last_signal: Option<Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// 风控闸门事实
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateFacts {
    pub pressure: GatePressure,
    pub last_denial: Option<Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// 所有端点归一化后的事实
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamFacts {
    pub broker: BrokerFacts,
    pub strategies: StrategyFacts,
    pub gates: GateFacts,
    pub positions: Vec<Position>,
    pub trades_timestamp: Option<DateTime<Utc>>,
    pub activity: SystemActivity,
    /// 大写的漂移判定，默认 STABLE
    pub drift: String,
    pub endpoints_total: usize,
    pub endpoints_ok: usize,
}

impl UpstreamFacts {
    /// 期货相关端点中最新的时间戳
    #[must_use]
    pub fn newest_futures_timestamp(&self) -> Option<DateTime<Utc>> {
        [
            self.broker.timestamp,
            self.trades_timestamp,
            self.strategies.timestamp,
            self.gates.timestamp,
        ]
        .into_iter()
        .flatten()
        .max()
    }
}

fn find<'a>(results: &'a [EndpointResult], id: &str) -> Option<&'a EndpointResult> {
    results.iter().find(|result| result.endpoint_id == id)
}

fn broker_facts(result: Option<&EndpointResult>) -> BrokerFacts {
    let latency_ms = result.map_or(0, |r| r.latency_ms);
    let Some(data) = result.and_then(EndpointResult::ok_payload) else {
        return BrokerFacts {
            latency_ms,
            ..BrokerFacts::default()
        };
    };

    BrokerFacts {
        connected: fields::CONNECTED.bool(data).unwrap_or(false),
        token_valid: fields::TOKEN_VALID.bool(data).unwrap_or(false),
        kill_active: fields::KILL_ACTIVE.bool(data).unwrap_or(false),
        latency_ms,
        timestamp: timestamp_of(data),
    }
}

fn position_from(item: &Value) -> Position {
    Position {
        symbol: fields::SYMBOL
            .string(item)
            .unwrap_or_else(|| "UNKNOWN".to_string()),
        side: fields::SIDE
            .string(item)
            .map(|side| side.to_ascii_uppercase())
            .unwrap_or_default(),
        size: fields::SIZE.f64(item).unwrap_or(0.0),
        entry_price: fields::ENTRY_PRICE.f64(item),
        strategy: fields::STRATEGY.string(item),
        state: fields::ITEM_STATE.string(item),
        unrealized_pnl: fields::UNREALIZED_PNL.f64(item),
        opened_at: timestamp_of(item),
    }
}

fn strategy_facts(data: Option<&Value>) -> StrategyFacts {
    let Some(data) = data else {
        return StrategyFacts::default();
    };

    let items = fields::STRATEGY_ITEMS.array(data);
    let active = items
        .iter()
        .filter(|item| {
            fields::ITEM_STATE
                .string(item)
                .is_some_and(|state| state.eq_ignore_ascii_case("ACTIVE"))
        })
        .count() as u64;

    let emitted = fields::INTENTS_EMITTED.u64(data).unwrap_or(0);
    let denied = fields::INTENTS_DENIED.u64(data).unwrap_or(0);

    StrategyFacts {
        pipeline: ProvingPipeline {
            total_strategies: items.len() as u64,
            active_strategies: active,
            intents_emitted: emitted,
            intents_denied: denied,
            intent_quality: derive::intent_quality(emitted, denied),
        },
        promotions: Promotions {
            total_to_live: fields::PROMOTIONS_TO_LIVE.u64(data).unwrap_or(0),
        },
        last_signal: fields::LAST_SIGNAL.resolve(data).cloned(),
        timestamp: timestamp_of(data),
    }
}

fn gate_facts(data: Option<&Value>) -> GateFacts {
    let Some(data) = data else {
        return GateFacts::default();
    };

    GateFacts {
        pressure: GatePressure {
            level: fields::PRESSURE_LEVEL
                .string(data)
                .map_or_else(|| "UNKNOWN".to_string(), |level| level.to_ascii_uppercase()),
            total_denials: fields::TOTAL_DENIALS.u64(data).unwrap_or(0),
            denials_last_hour: fields::DENIALS_LAST_HOUR.u64(data).unwrap_or(0),
            by_gate: fields::BY_GATE
                .resolve(data)
                .cloned()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        },
        last_denial: fields::LAST_DENIAL.resolve(data).cloned(),
        timestamp: timestamp_of(data),
    }
}

fn activity_facts(data: Option<&Value>) -> SystemActivity {
    data.map_or_else(SystemActivity::default, |data| SystemActivity {
        seeding_active: fields::SEEDING_ACTIVE.bool(data).unwrap_or(false),
        uptime_seconds: fields::UPTIME.f64(data).unwrap_or(0.0),
        cpu_percent: fields::CPU.f64(data).unwrap_or(0.0),
        memory_percent: fields::MEMORY.f64(data).unwrap_or(0.0),
    })
}

/// 从全部调用结果中提取事实
#[must_use]
pub fn collect_facts(results: &[EndpointResult]) -> UpstreamFacts {
    let payload_of = |id: &str| find(results, id).and_then(EndpointResult::ok_payload);

    let trades = payload_of(endpoint_ids::TRADES);
    let positions = trades
        .map(|data| fields::TRADES.array(data).iter().map(position_from).collect())
        .unwrap_or_default();

    let strategies = payload_of(endpoint_ids::STRATEGIES);
    let gates = payload_of(endpoint_ids::GATES);
    let drift = strategies
        .and_then(|data| fields::DRIFT.string(data))
        .or_else(|| gates.and_then(|data| fields::DRIFT.string(data)))
        .map_or_else(|| "STABLE".to_string(), |drift| drift.to_ascii_uppercase());

    UpstreamFacts {
        broker: broker_facts(find(results, endpoint_ids::BROKER)),
        strategies: strategy_facts(strategies),
        gates: gate_facts(gates),
        positions,
        trades_timestamp: trades.and_then(timestamp_of),
        activity: activity_facts(payload_of(endpoint_ids::ACTIVITY)),
        drift,
        endpoints_total: results.len(),
        endpoints_ok: results.iter().filter(|result| result.success).count(),
    }
}

/// 组装统一载荷
#[must_use]
pub fn build_payload(
    results: Vec<EndpointResult>,
    identity: &VerifiedIdentity,
    snapshot: &HealthSnapshot,
    total_latency_ms: u64,
    now: DateTime<Utc>,
) -> UnifiedMetricsPayload {
    let facts = collect_facts(&results);

    let newest = facts.newest_futures_timestamp();
    let futures_freshness = derive::freshness(newest, now);
    let futures_state = derive::futures_state(&facts, futures_freshness.status);

    let data_freshness = DataFreshness {
        global: futures_freshness.status,
        futures: futures_freshness,
        crypto: MarketFreshness {
            status: FreshnessStatus::NotInstrumented,
            age_seconds: None,
        },
    };

    let confidence = derive::confidence(&facts, &data_freshness, now);
    let recommendation =
        derive::recommendation(&facts, futures_state, &data_freshness, &confidence, now);
    let verdict = derive::verdict(&facts, futures_state, now);
    let timeline = derive::timeline(&facts, futures_state, now);

    let futures = MarketSection {
        state: futures_state,
        instrumented: true,
        connected: facts.broker.connected,
        token_valid: facts.broker.token_valid,
        kill_active: facts.broker.kill_active,
        latency_ms: facts.broker.latency_ms,
        last_update: newest,
        drift: if futures_state == MarketState::Live {
            facts.drift.clone()
        } else {
            derive::market_state_label(futures_state).to_string()
        },
        active_strategies: facts.strategies.pipeline.active_strategies,
        last_signal: facts.strategies.last_signal.clone(),
        last_denial: facts.gates.last_denial.clone(),
    };

    let mut markets = BTreeMap::new();
    markets.insert(FUTURES_MARKET.to_string(), futures);
    markets.insert(CRYPTO_MARKET.to_string(), MarketSection::not_instrumented());

    UnifiedMetricsPayload {
        version: PAYLOAD_VERSION.to_string(),
        system_verdict: verdict,
        operator_recommendation: recommendation,
        system_confidence: confidence,
        markets,
        data_freshness,
        strategy_activity: StrategyActivity {
            proving_pipeline: facts.strategies.pipeline.clone(),
            promotions: facts.strategies.promotions.clone(),
            gate_pressure: facts.gates.pressure.clone(),
        },
        positions: facts.positions,
        session_timeline: timeline,
        timestamps: Timestamps {
            last_updated_metrics: newest,
            server_time: now,
        },
        system_activity: facts.activity,
        health: HealthSection {
            vps_reachable: facts.endpoints_ok > 0,
            total_endpoints: snapshot.total_endpoints,
            healthy_endpoints: snapshot.healthy_endpoints,
            degraded_endpoints: snapshot.degraded_endpoints,
            down_endpoints: snapshot.down_endpoints,
            avg_latency_ms: snapshot.avg_latency_ms,
            last_checked: snapshot.last_checked,
        },
        proxy: ProxyMetadata {
            source: "dashboard-relay".to_string(),
            auth: "internal-token".to_string(),
            user: identity.email.clone(),
            user_id: identity.user_id.clone(),
            timestamp: now,
            endpoints: results,
            total_latency_ms,
        },
    }
}
