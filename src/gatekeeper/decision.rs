//! # 准入判定
//!
//! 纯函数：输入 `Authorization` 头，输出放行（附带归属头）或拒绝（附带原因）。
//! 不做任何 I/O，代理服务和测试共用同一份判定逻辑。

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::AuthUtils;
use crate::config::TokenConfig;
use crate::error::{AuthError, RelayError, Result};

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("missing_credential")]
    MissingCredential,
    #[error("malformed_credential")]
    MalformedCredential,
    #[error("invalid_signature")]
    InvalidSignature,
    #[error("token_expired")]
    TokenExpired,
    #[error("invalid_issuer")]
    InvalidIssuer,
    #[error("invalid_audience")]
    InvalidAudience,
    /// 其余所有解码失败
    #[error("invalid_token")]
    InvalidToken,
}

impl DenyReason {
    /// 写入 401 响应体的机器可读原因
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential => "malformed_credential",
            Self::InvalidSignature => "invalid_signature",
            Self::TokenExpired => "token_expired",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidAudience => "invalid_audience",
            Self::InvalidToken => "invalid_token",
        }
    }

    fn from_error_kind(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            _ => Self::InvalidToken,
        }
    }
}

/// 放行时注入给指标服务的归属信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHeaders {
    pub user_id: String,
    pub email: String,
}

/// 判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(IdentityHeaders),
    Deny(DenyReason),
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

/// 网关只关心这两个声明，其余声明由 `Validation` 校验
#[derive(Debug, Deserialize)]
struct GateClaims {
    sub: String,
    #[serde(default)]
    email: String,
}

/// 与签发端共享的校验材料
#[derive(Clone)]
pub struct GatekeeperKeys {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for GatekeeperKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatekeeperKeys")
            .field("issuer", &self.validation.iss)
            .field("audience", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

impl GatekeeperKeys {
    /// 从令牌配置构建；未配置共享密钥时网关无法启动
    pub fn from_config(config: &TokenConfig) -> Result<Self> {
        let secret = config.secret().ok_or_else(|| {
            RelayError::config("gatekeeper shared signing secret is not configured")
        })?;
        Ok(Self::new(secret, &config.issuer, &config.audience))
    }

    #[must_use]
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

/// 对一个 `Authorization` 头做准入判定
#[must_use]
pub fn decide(header: Option<&str>, keys: &GatekeeperKeys) -> Decision {
    let token = match AuthUtils::parse_bearer(header) {
        Ok(token) => token,
        Err(AuthError::MissingCredential) => return Decision::Deny(DenyReason::MissingCredential),
        Err(_) => return Decision::Deny(DenyReason::MalformedCredential),
    };

    match decode::<GateClaims>(token, &keys.decoding_key, &keys.validation) {
        Ok(data) if data.claims.sub.trim().is_empty() => Decision::Deny(DenyReason::InvalidToken),
        Ok(data) => Decision::Allow(IdentityHeaders {
            user_id: data.claims.sub,
            email: data.claims.email,
        }),
        Err(err) => Decision::Deny(DenyReason::from_error_kind(err.kind())),
    }
}
