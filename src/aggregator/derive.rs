//! Derived dashboard sections: market state, freshness, verdict, recommendation,
//! confidence and the session timeline.
//!
//! Every function here is pure over [`UpstreamFacts`] and an evaluation instant.

use chrono::{DateTime, Utc};

use super::merge::UpstreamFacts;
use super::payload::{
    DataFreshness, FreshnessStatus, MarketFreshness, MarketState, OperatorRecommendation,
    SystemConfidence, SystemVerdict, TimelineEvent, VerdictState,
};

/// Age below which data counts as healthy.
pub const HEALTHY_AGE_SECONDS: f64 = 10.0;
/// Age below which data counts as degraded; anything older is stale.
pub const DEGRADED_AGE_SECONDS: f64 = 30.0;
/// Global confidence ceiling while a market is enabled but not instrumented.
pub const UNINSTRUMENTED_CONFIDENCE_CAP: u8 = 85;

const FUTURES_SYMBOLS: &[&str] = &["NQ", "ES", "MNQ", "MES", "YM", "RTY"];
const CRYPTO_SYMBOLS: &[&str] = &["BTC", "ETH", "SOL", "BTCUSDT", "ETHUSDT"];

#[must_use]
pub const fn market_state_label(state: MarketState) -> &'static str {
    match state {
        MarketState::Live => "LIVE",
        MarketState::Off => "OFF",
        MarketState::Degraded => "DEGRADED",
        MarketState::NotInstrumented => "NOT_INSTRUMENTED",
    }
}

/// Share of emitted intents that were not denied, as a 0-100 percentage.
#[must_use]
pub fn intent_quality(emitted: u64, denied: u64) -> Option<u8> {
    if emitted == 0 {
        return None;
    }
    let executed = emitted.saturating_sub(denied);
    Some(((executed as f64 / emitted as f64) * 100.0).round().clamp(0.0, 100.0) as u8)
}

#[must_use]
pub fn freshness(newest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> MarketFreshness {
    let Some(newest) = newest else {
        return MarketFreshness {
            status: FreshnessStatus::Unknown,
            age_seconds: None,
        };
    };

    let age = ((now - newest).num_milliseconds().max(0) as f64) / 1000.0;
    let status = if age < HEALTHY_AGE_SECONDS {
        FreshnessStatus::Healthy
    } else if age < DEGRADED_AGE_SECONDS {
        FreshnessStatus::Degraded
    } else {
        FreshnessStatus::Stale
    };

    MarketFreshness {
        status,
        age_seconds: Some((age * 10.0).round() / 10.0),
    }
}

#[must_use]
pub fn futures_state(facts: &UpstreamFacts, freshness: FreshnessStatus) -> MarketState {
    let broker = &facts.broker;
    if !broker.connected || !broker.token_valid {
        MarketState::Degraded
    } else if broker.kill_active {
        MarketState::Off
    } else if freshness == FreshnessStatus::Stale {
        MarketState::Degraded
    } else {
        MarketState::Live
    }
}

#[must_use]
pub fn verdict(facts: &UpstreamFacts, futures: MarketState, now: DateTime<Utc>) -> SystemVerdict {
    let broker = &facts.broker;
    let connected = broker.connected && broker.token_valid;
    let pressure_ok = facts.gates.pressure.level == "LOW";

    let (state, reason) = if futures == MarketState::Live && connected && !broker.kill_active && pressure_ok {
        (
            VerdictState::SafePartial,
            "Futures live with low gate pressure; crypto market is not instrumented".to_string(),
        )
    } else if !connected {
        (
            VerdictState::Unsafe,
            "Broker disconnected or token invalid; halt advised".to_string(),
        )
    } else if broker.kill_active {
        (
            VerdictState::Unsafe,
            "Trading stopped by kill directive".to_string(),
        )
    } else {
        (
            VerdictState::Degraded,
            format!(
                "Futures {} with gate pressure {}; monitor conditions",
                market_state_label(futures),
                facts.gates.pressure.level
            ),
        )
    };

    SystemVerdict {
        state,
        reason,
        timestamp: now,
    }
}

#[must_use]
pub fn confidence(facts: &UpstreamFacts, freshness: &DataFreshness, now: DateTime<Utc>) -> SystemConfidence {
    let broker = &facts.broker;
    let mut futures: u32 = 0;

    if broker.connected && broker.token_valid {
        futures += 25;
    } else if broker.connected {
        futures += 12;
    }

    futures += match freshness.futures.status {
        FreshnessStatus::Healthy => 25,
        FreshnessStatus::Degraded => 12,
        _ => 0,
    };

    if facts.endpoints_total > 0 {
        if facts.endpoints_ok == facts.endpoints_total {
            futures += 15;
        } else if facts.endpoints_ok * 2 >= facts.endpoints_total {
            futures += 7;
        }
    }

    futures += match facts.gates.pressure.level.as_str() {
        "LOW" => 20,
        "MEDIUM" => 5,
        _ => 0,
    };

    let quality = facts.strategies.pipeline.intent_quality;
    if broker.kill_active || quality.is_none_or(|q| q >= 70) {
        futures += 15;
    } else if quality.is_some_and(|q| q >= 40) {
        futures += 7;
    }

    let futures = futures.min(100) as u8;
    // 加密市场尚未接入数据，贡献 0 分并触发封顶
    let crypto: u8 = 0;
    let mean = ((f64::from(futures) + f64::from(crypto)) / 2.0).round() as u8;

    SystemConfidence {
        score: mean.min(UNINSTRUMENTED_CONFIDENCE_CAP),
        futures,
        crypto,
        capped: true,
        evaluated_at: now,
    }
}

#[must_use]
pub fn recommendation(
    facts: &UpstreamFacts,
    futures: MarketState,
    freshness: &DataFreshness,
    confidence: &SystemConfidence,
    now: DateTime<Utc>,
) -> OperatorRecommendation {
    let broker = &facts.broker;
    let quality = facts.strategies.pipeline.intent_quality;

    let (value, details) = if futures == MarketState::Degraded && (!broker.connected || broker.kill_active) {
        ("HALT ADVISED", None)
    } else if freshness.futures.status == FreshnessStatus::Stale || facts.drift == "DEGRADING" {
        ("PAUSE NEW ENTRIES", None)
    } else if facts.gates.pressure.level == "HIGH"
        || (!broker.kill_active && quality.is_some_and(|q| q < 30))
    {
        ("REDUCE RISK", None)
    } else if confidence.score >= 50 && futures == MarketState::Live {
        ("CONTINUE FUTURES TRADING", Some("CRYPTO VISIBILITY INCOMPLETE"))
    } else {
        ("PAUSE NEW ENTRIES", Some("VISIBILITY INCOMPLETE"))
    };

    OperatorRecommendation {
        value: value.to_string(),
        details: details.map(str::to_string),
        computed_at: now,
    }
}

fn symbol_market(symbol: &str) -> &'static str {
    let symbol = symbol.to_ascii_uppercase();
    if FUTURES_SYMBOLS.contains(&symbol.as_str()) {
        "FUTURES"
    } else if CRYPTO_SYMBOLS.contains(&symbol.as_str()) {
        "CRYPTO"
    } else {
        "UNKNOWN"
    }
}

#[must_use]
pub fn timeline(facts: &UpstreamFacts, futures: MarketState, now: DateTime<Utc>) -> Vec<TimelineEvent> {
    let event = |time: DateTime<Utc>, market: &str, text: String| TimelineEvent {
        time,
        market: market.to_string(),
        event: text,
    };

    let mut events = Vec::new();

    let futures_text = match futures {
        MarketState::Live => "Futures trading activated".to_string(),
        _ if futures == MarketState::Off || facts.broker.kill_active => {
            "Futures trading halted".to_string()
        }
        other => format!("Futures status: {}", market_state_label(other)),
    };
    events.push(event(now, "FUTURES", futures_text));
    events.push(event(
        now,
        "CRYPTO",
        "Crypto enabled but not instrumented".to_string(),
    ));

    for position in &facts.positions {
        events.push(event(
            position.opened_at.unwrap_or(now),
            symbol_market(&position.symbol),
            format!("Position opened ({})", position.symbol),
        ));
    }

    let denials = facts.gates.pressure.denials_last_hour;
    if denials > 0 {
        events.push(event(
            facts.gates.timestamp.unwrap_or(now),
            "FUTURES",
            format!(
                "{denials} gate denial{} recorded",
                if denials > 1 { "s" } else { "" }
            ),
        ));
    }

    events.push(event(
        now,
        "SYSTEM",
        if denials == 0 {
            "No operator intervention required".to_string()
        } else {
            "Monitor conditions".to_string()
        },
    ));

    events.sort_by_key(|event| event.time);
    events
}
