//! 应用上下文（DI 容器）
//!
//! 统一持有跨模块共享的服务实例，便于在测试中注入替身实现。

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::auth::{CredentialVerifier, HttpIdentityProvider, IdentityProvider};
use crate::config::AppConfig;
use crate::error::Result;
use crate::health::EndpointHealthMonitor;
use crate::session::{SeaOrmSessionStore, SessionRecorder, SessionStore};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub verifier: CredentialVerifier,
    pub aggregator: Aggregator,
    pub monitor: Arc<EndpointHealthMonitor>,
    pub recorder: SessionRecorder,
    pub started_at: DateTime<Utc>,
}

impl AppContext {
    /// 生产装配：HTTP 身份提供方，可选的 SQLite 会话存储
    pub fn new(config: Arc<AppConfig>, db: Option<DatabaseConnection>) -> Result<Self> {
        let provider: Arc<dyn IdentityProvider> =
            Arc::new(HttpIdentityProvider::new(&config.identity)?);
        let store = db.map(|db| Arc::new(SeaOrmSessionStore::new(db)) as Arc<dyn SessionStore>);
        Self::with_parts(config, provider, store)
    }

    /// 使用给定的身份提供方和会话存储装配
    pub fn with_parts(
        config: Arc<AppConfig>,
        provider: Arc<dyn IdentityProvider>,
        store: Option<Arc<dyn SessionStore>>,
    ) -> Result<Self> {
        let monitor = Arc::new(EndpointHealthMonitor::new(config.health.window_capacity));
        let recorder = SessionRecorder::new(store);
        let aggregator = Aggregator::new(&config, Arc::clone(&monitor), recorder.clone())?;

        Ok(Self {
            verifier: CredentialVerifier::new(provider),
            aggregator,
            monitor,
            recorder,
            started_at: Utc::now(),
            config,
        })
    }

    /// 会话存储，未配置数据库时为空
    #[must_use]
    pub fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        self.recorder.store()
    }
}
