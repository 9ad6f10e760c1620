//! # 浏览器凭证验证
//!
//! 每次请求都把 Bearer 凭证交给外部身份提供方确认，不做缓存。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::auth::claims::VerifiedIdentity;
use crate::auth::utils::AuthUtils;
use crate::config::IdentityConfig;
use crate::error::{AuthError, RelayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::utils::FieldChain;
use crate::{ldebug, lwarn};

const USER_ID: FieldChain = FieldChain(&["id", "sub", "user_id"]);
const EMAIL: FieldChain = FieldChain(&["email", "user_metadata.email"]);
const ROLE: FieldChain = FieldChain(&["role", "app_metadata.role", "user_metadata.role"]);

/// 身份缺省角色
pub const DEFAULT_ROLE: &str = "authenticated";

/// 身份提供方
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 用已经去掉 `Bearer ` 前缀的令牌换取身份
    async fn fetch_identity(&self, token: &str) -> Result<VerifiedIdentity>;
}

/// 基于 HTTP 用户信息接口的身份提供方
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    user_info_url: Option<String>,
    api_key: Option<String>,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RelayError::internal_with_source("创建身份提供方HTTP客户端失败", e))?;

        Ok(Self {
            client,
            user_info_url: config
                .user_info_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn fetch_identity(&self, token: &str) -> Result<VerifiedIdentity> {
        let url = self
            .user_info_url
            .as_deref()
            .ok_or_else(|| RelayError::config("identity provider user_info_url is not configured"))?;

        let mut request = self.client.get(url).bearer_auth(token);
        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| AuthError::ProviderUnavailable(format!("invalid response body: {e}")))?;
                Ok(identity_from_user_info(&body)?)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::InvalidCredential.into()),
            status => Err(AuthError::ProviderUnavailable(format!("unexpected status {status}")).into()),
        }
    }
}

/// 从用户信息 JSON 中提取身份
pub fn identity_from_user_info(body: &Value) -> std::result::Result<VerifiedIdentity, AuthError> {
    let user_id = USER_ID.string(body).ok_or(AuthError::IncompleteIdentity)?;
    let email = EMAIL.string(body).unwrap_or_default();
    let role = ROLE.string(body).unwrap_or_else(|| DEFAULT_ROLE.to_string());
    Ok(VerifiedIdentity {
        user_id,
        email,
        role,
    })
}

/// 凭证验证器
#[derive(Clone)]
pub struct CredentialVerifier {
    provider: Arc<dyn IdentityProvider>,
}

impl CredentialVerifier {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// 验证 `Authorization` 头
    pub async fn verify(&self, header: Option<&str>, request_id: &str) -> Result<VerifiedIdentity> {
        let token = AuthUtils::parse_bearer(header).inspect_err(|err| {
            lwarn!(
                request_id,
                LogStage::Authentication,
                LogComponent::Verifier,
                "parse_bearer",
                "凭证格式无效",
                reason = err.reason()
            );
        })?;

        match self.provider.fetch_identity(token).await {
            Ok(identity) => {
                ldebug!(
                    request_id,
                    LogStage::Authentication,
                    LogComponent::Verifier,
                    "verify_credential",
                    "凭证验证通过",
                    user_id = %identity.user_id,
                    role = %identity.role
                );
                Ok(identity)
            }
            Err(err) => {
                lwarn!(
                    request_id,
                    LogStage::Authentication,
                    LogComponent::Verifier,
                    "verify_credential",
                    "凭证验证失败",
                    token = %AuthUtils::sanitize_token(token),
                    error = %err
                );
                Err(err)
            }
        }
    }
}
