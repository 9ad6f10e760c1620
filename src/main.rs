//! # Dashboard Relay 主程序
//!
//! 边缘路由进程：加载配置，按需初始化会话数据库，然后启动 Axum 服务器。

use std::sync::Arc;

use dashboard_relay::{
    Result,
    app::AppContext,
    config::{AppConfig, ConfigManager},
    database,
    edge::EdgeServer,
    lerror, linfo, lwarn,
    logging::{self, LogComponent, LogStage},
};
use sea_orm::DatabaseConnection;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging(None);

    let config = ConfigManager::load()?.config();
    let db = match init_session_database(&config).await {
        Ok(db) => db,
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "database_init_failed",
                &format!("会话数据库初始化失败: {e:#}")
            );
            std::process::exit(1);
        }
    };

    if config.token.secret().is_none() {
        lwarn!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "signing_secret_missing",
            "未配置内部令牌密钥，聚合请求将返回 503"
        );
    }

    let context = Arc::new(AppContext::new(Arc::clone(&config), db)?);
    let server = EdgeServer::new(context)?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动",
        address = %server.bind_address(),
        endpoints = config.upstream.endpoints.len()
    );
    server.serve().await?;

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
    Ok(())
}

/// 配置了数据库地址时连接并执行迁移
async fn init_session_database(config: &AppConfig) -> anyhow::Result<Option<DatabaseConnection>> {
    let Some(url) = config.session.database_url.as_deref() else {
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "session_storage_disabled",
            "未配置会话数据库，会话记录已关闭"
        );
        return Ok(None);
    };

    let db = database::init_database(url).await?;
    database::run_migrations(&db).await?;
    let pending = database::check_database_status(&db).await?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "session_storage_ready",
        "会话数据库就绪",
        pending_migrations = pending
    );
    Ok(Some(db))
}
