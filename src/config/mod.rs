//! # 配置管理模块
//!
//! 处理应用配置加载、覆盖和验证

mod app_config;
mod manager;

pub use app_config::{
    AppConfig, EdgeConfig, EndpointConfig, GatekeeperConfig, HealthConfig, IdentityConfig,
    RateLimitHint, ServerConfig, SessionConfig, TokenConfig, UpstreamConfig,
};
pub use manager::{CONFIG_PATH_ENV, ConfigManager};
