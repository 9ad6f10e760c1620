//! # 错误类型定义

use axum::http::StatusCode;
use thiserror::Error;

use super::auth::AuthError;

/// 应用主要错误类型
#[derive(Debug, Error)]
pub enum RelayError {
    /// 浏览器凭证缺失、格式错误或被身份提供方拒绝
    #[error("认证失败: {0}")]
    Auth(#[from] AuthError),

    /// 必需的上游地址或密钥缺失
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 单个上游调用失败（聚合时被吸收，只有单端点转发才会返回给调用方）
    #[error("上游调用失败: {endpoint}: {message}")]
    Upstream {
        endpoint: String,
        message: String,
        status: Option<u16>,
    },

    /// 合并阶段的意外内部错误
    #[error("聚合错误: {message}")]
    Aggregation {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 请求参数错误
    #[error("请求参数错误: {message}")]
    Validation { message: String },

    /// 资源未找到
    #[error("资源未找到: {resource}")]
    NotFound { resource: String },

    /// 已知的占位功能，`planned` 为计划提供的路径
    #[error("功能未实现: {feature}")]
    NotImplemented {
        feature: String,
        planned: Vec<String>,
    },

    /// 会话事件存储错误
    #[error("存储错误: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 附加上下文的错误
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<RelayError>,
    },
}

impl RelayError {
    /// HTTP 状态码
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Config { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Aggregation { .. } | Self::Storage { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            Self::Context { source, .. } => source.status_code(),
        }
    }

    /// 响应体中的 `error` 标签
    #[must_use]
    pub fn error_label(&self) -> &'static str {
        match self {
            Self::Auth(_) => "unauthorized",
            Self::Config { .. } => "configuration_error",
            Self::Upstream { .. } => "upstream_failure",
            Self::Aggregation { .. } => "aggregation_error",
            Self::Validation { .. } => "invalid_request",
            Self::NotFound { .. } => "not_found",
            Self::NotImplemented { .. } => "not_implemented",
            Self::Storage { .. } => "storage_error",
            Self::Internal { .. } => "internal_error",
            Self::Context { source, .. } => source.error_label(),
        }
    }

    /// 面向调用方的说明（不包含内部来源链）
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Auth(err) => err.to_string(),
            Self::Config { message, .. }
            | Self::Aggregation { message, .. }
            | Self::Validation { message }
            | Self::Storage { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::Upstream {
                endpoint, message, ..
            } => format!("{endpoint}: {message}"),
            Self::NotFound { resource } => format!("{resource} not found"),
            Self::NotImplemented { feature, .. } => format!("{feature}: not implemented yet"),
            Self::Context { source, .. } => source.public_message(),
        }
    }

    /// 补救提示
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Auth(err) => Some(err.hint()),
            Self::Config { .. } => Some("the relay is missing required configuration; contact the operator"),
            Self::Context { source, .. } => source.hint(),
            _ => None,
        }
    }

    /// 占位功能计划提供的路径
    #[must_use]
    pub fn planned(&self) -> &[String] {
        match self {
            Self::NotImplemented { planned, .. } => planned.as_slice(),
            Self::Context { source, .. } => source.planned(),
            _ => &[],
        }
    }

    /// 是否属于服务端错误（需要 error 级日志）
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建上游错误
    pub fn upstream<E: Into<String>, T: Into<String>>(
        endpoint: E,
        message: T,
        status: Option<u16>,
    ) -> Self {
        Self::Upstream {
            endpoint: endpoint.into(),
            message: message.into(),
            status,
        }
    }

    /// 创建带来源的聚合错误
    pub fn aggregation_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Aggregation {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建参数错误
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// 创建未找到错误
    pub fn not_found<T: Into<String>>(resource: T) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// 创建未实现错误
    pub fn not_implemented<T: Into<String>>(feature: T, planned: &[&str]) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
            planned: planned.iter().map(|path| (*path).to_string()).collect(),
        }
    }

    /// 创建存储错误
    pub fn storage<T: Into<String>>(message: T) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的存储错误
    pub fn storage_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建内部错误
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<sea_orm::DbErr> for RelayError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::storage_with_source(format!("数据库操作失败: {err}"), err)
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        Self::internal_with_source(format!("IO错误: {err}"), err)
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source(format!("TOML解析失败: {err}"), err)
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal_with_source(format!("JSON序列化失败: {err}"), err)
    }
}
