//! # 路由配置
//!
//! 公开路径、受保护的版本化路径和旧版兼容路径。

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{MethodRouter, get};
use axum::{Extension, extract::State};

use super::handlers::{dashboard, health, relay, sessions, stub, system};
use super::middleware::{LegacyRoute, RequestId, legacy_headers, require_auth};
use super::server::AppState;
use crate::aggregator::endpoint_ids;
use crate::auth::VerifiedIdentity;

/// 创建所有路由
pub fn create_routes(state: AppState) -> Router {
    let protected = Router::new()
        .merge(versioned_routes())
        .merge(legacy_routes(&state.config.edge.legacy_sunset))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(system::root_handler))
        .route("/health", get(system::health_handler))
        .merge(protected)
        .with_state(state)
}

fn versioned_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/dashboard", get(dashboard::get_dashboard))
        .route("/v1/health/endpoints", get(health::get_endpoint_health))
        .route("/v1/relay/{endpoint}", get(relay::get_relay))
        .route("/v1/sessions/events", get(sessions::list_events))
        .route("/v1/sessions/export", get(sessions::export_session))
        .route("/v1/stream", get(stub::stream_stub))
}

/// 旧版看板服务的路径
fn legacy_routes(sunset: &str) -> Router<AppState> {
    let mut router = Router::new().route(
        "/api/metrics",
        get(dashboard::get_legacy_metrics)
            .layer(from_fn_with_state(LegacyRoute::new("/v1/dashboard", sunset), legacy_headers)),
    );

    for (path, endpoint_id, successor) in [
        ("/api/broker", endpoint_ids::BROKER, "/v1/relay/broker"),
        ("/api/trades", endpoint_ids::TRADES, "/v1/relay/trades"),
        ("/api/strategies", endpoint_ids::STRATEGIES, "/v1/relay/strategies"),
        ("/api/gates", endpoint_ids::GATES, "/v1/relay/gates"),
    ] {
        router = router.route(
            path,
            legacy_relay(endpoint_id)
                .layer(from_fn_with_state(LegacyRoute::new(successor, sunset), legacy_headers)),
        );
    }
    router
}

fn legacy_relay(endpoint_id: &'static str) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>,
              Extension(identity): Extension<VerifiedIdentity>,
              Extension(request_id): Extension<RequestId>| async move {
            relay::relay_core(&state, &identity, endpoint_id, &request_id).await
        },
    )
}
