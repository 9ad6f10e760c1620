//! # 配置管理器
//!
//! 启动时加载一次：配置文件 → 环境变量覆盖 → 校验。加载后的配置不可变，
//! 以 `Arc<AppConfig>` 在进程内共享。

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::AppConfig;
use crate::error::{RelayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo, lwarn};

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "DASHBOARD_RELAY_CONFIG";

/// 支持的环境变量覆盖：(变量名, 配置路径)
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("RELAY_SIGNING_SECRET", "token.signing_secret"),
    ("RELAY_UPSTREAM_BASE_URL", "upstream.base_url"),
    ("RELAY_IDENTITY_URL", "identity.user_info_url"),
    ("RELAY_IDENTITY_API_KEY", "identity.api_key"),
    ("RELAY_DATABASE_URL", "session.database_url"),
    ("RELAY_HOST", "server.host"),
    ("RELAY_PORT", "server.port"),
    ("GATEKEEPER_UPSTREAM_ADDR", "gatekeeper.upstream_addr"),
];

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<AppConfig>,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 按约定位置加载配置
    pub fn load() -> Result<Self> {
        let config_file = if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            path
        } else {
            let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
            format!("config/config.{env}.toml")
        };

        Self::from_file_with_env(config_file, |key| env::var(key).ok())
    }

    /// 从指定文件加载，并应用进程环境变量覆盖
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_env(config_path, |key| env::var(key).ok())
    }

    /// 从指定文件加载，环境变量通过 `lookup` 读取
    pub fn from_file_with_env<F>(config_path: impl AsRef<Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = config_path.as_ref();

        let (mut config, source) = if config_path.exists() {
            (Self::load_config_file(config_path)?, Some(config_path.to_path_buf()))
        } else {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::Config,
                "load_config",
                format!("配置文件不存在，使用默认配置: {}", config_path.display())
            );
            (AppConfig::default(), None)
        };

        let applied = Self::apply_env_overrides(&mut config, lookup)?;
        config.validate()?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Config,
            "config_loaded",
            "配置加载完成",
            source = ?source,
            env_overrides = applied,
            endpoints = config.upstream.endpoints.len(),
            signing_secret_configured = config.token.secret().is_some(),
            upstream_configured = config.upstream.base().is_some()
        );

        Ok(Self {
            config: Arc::new(config),
            source,
        })
    }

    /// 直接使用现成配置（测试与嵌入场景）
    pub fn from_config(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            source: None,
        })
    }

    /// 共享的只读配置
    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// 配置来源文件
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn load_config_file(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config_with_source(format!("读取配置文件失败: {}", path.display()), e)
        })?;

        toml::from_str(&content).map_err(|e| {
            RelayError::config_with_source(
                format!("TOML解析失败 - 配置文件: {}, 详细错误: {e}", path.display()),
                e,
            )
        })
    }

    /// 应用环境变量覆盖，返回生效的覆盖数量
    fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        for (var, path) in ENV_OVERRIDES {
            let Some(value) = lookup(var) else {
                continue;
            };

            ldebug!(
                "system",
                LogStage::Startup,
                LogComponent::Config,
                "env_override",
                format!(
                    "应用环境变量覆盖: {path} = {}",
                    if path.contains("secret") || path.contains("key") {
                        "***"
                    } else {
                        value.as_str()
                    }
                )
            );

            Self::apply_override_to_config(config, path, value)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn apply_override_to_config(config: &mut AppConfig, path: &str, value: String) -> Result<()> {
        match path {
            "token.signing_secret" => config.token.signing_secret = Some(value),
            "upstream.base_url" => config.upstream.base_url = Some(value),
            "identity.user_info_url" => config.identity.user_info_url = Some(value),
            "identity.api_key" => config.identity.api_key = Some(value),
            "session.database_url" => config.session.database_url = Some(value),
            "server.host" => config.server.host = value,
            "server.port" => {
                config.server.port = value.parse().map_err(|e| {
                    RelayError::config_with_source(format!("无效的端口号: {value}"), e)
                })?;
            }
            "gatekeeper.upstream_addr" => config.gatekeeper.upstream_addr = value,
            other => {
                return Err(RelayError::config(format!("未知的配置路径: {other}")));
            }
        }
        Ok(())
    }
}
