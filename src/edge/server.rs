//! # 边缘服务器
//!
//! 浏览器访问的唯一入口：Axum HTTP 服务器。

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::middleware::{SESSION_ID_HEADER, request_id_middleware};
use crate::app::AppContext;
use crate::config::EdgeConfig;
use crate::error::{RelayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::linfo;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    #[must_use]
    pub const fn context_arc(&self) -> &Arc<AppContext> {
        &self.context
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

fn cors_layer(config: &EdgeConfig) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(SESSION_ID_HEADER),
        ]);

    if config.cors_origins.is_empty() || config.cors_origins.iter().any(|o| o == "*") {
        return Ok(cors.allow_origin(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| {
                RelayError::config_with_source(format!("Invalid CORS origin '{origin}'"), e)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(cors.allow_origin(origins))
}

/// 构建完整的路由器（测试直接使用）；非法的 CORS 来源拒绝启动
pub fn build_router(context: Arc<AppContext>) -> Result<Router> {
    let cors = cors_layer(&context.config.edge)?;
    let state = AppState::new(context);

    Ok(super::routes::create_routes(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .layer(axum::middleware::from_fn(request_id_middleware)))
}

/// 边缘服务器
pub struct EdgeServer {
    addr: SocketAddr,
    router: Router,
}

impl EdgeServer {
    pub fn new(context: Arc<AppContext>) -> Result<Self> {
        let bind_address = context.config.server.bind_address();
        let addr = bind_address.parse::<SocketAddr>().map_err(|e| {
            RelayError::config_with_source(format!("Invalid bind address '{bind_address}'"), e)
        })?;

        Ok(Self {
            addr,
            router: build_router(context)?,
        })
    }

    #[must_use]
    pub const fn bind_address(&self) -> SocketAddr {
        self.addr
    }

    /// 启动服务器
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "server_start",
            &format!("Starting edge router on {}", self.addr)
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        linfo!(
            "system",
            LogStage::Shutdown,
            LogComponent::ServerSetup,
            "server_stop",
            "边缘服务器已停止"
        );
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
