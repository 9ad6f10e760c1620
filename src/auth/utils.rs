//! # 认证工具函数
//!
//! 边缘路由和内部网关共享的 Bearer 解析逻辑

use axum::http::HeaderMap;

use crate::error::AuthError;

/// 认证工具类
pub struct AuthUtils;

impl AuthUtils {
    /// 从HTTP头中提取Authorization头的值
    #[must_use]
    pub fn extract_authorization_header(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }

    /// 解析 `Bearer <token>`
    ///
    /// 方案名大小写不敏感，token 不能为空。
    /// - 头缺失或为空白 → [`AuthError::MissingCredential`]
    /// - 方案不是 Bearer 或 token 为空 → [`AuthError::MalformedCredential`]
    pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
        let header = header
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let (scheme, token) = header
            .split_once(char::is_whitespace)
            .ok_or(AuthError::MalformedCredential)?;

        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::MalformedCredential);
        }

        let token = token.trim();
        if token.is_empty() || token.contains(char::is_whitespace) {
            return Err(AuthError::MalformedCredential);
        }
        Ok(token)
    }

    /// 净化令牌用于日志记录，格式: "eyJh***x9Zk"
    #[must_use]
    pub fn sanitize_token(token: &str) -> String {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() > 12 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{head}***{tail}")
        } else {
            "***".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer_accepts_any_scheme_case() {
        assert_eq!(AuthUtils::parse_bearer(Some("Bearer abc.def")), Ok("abc.def"));
        assert_eq!(AuthUtils::parse_bearer(Some("bearer abc")), Ok("abc"));
        assert_eq!(AuthUtils::parse_bearer(Some("BEARER   abc  ")), Ok("abc"));
    }

    #[test]
    fn test_parse_bearer_failures() {
        assert_eq!(
            AuthUtils::parse_bearer(None),
            Err(AuthError::MissingCredential)
        );
        assert_eq!(
            AuthUtils::parse_bearer(Some("   ")),
            Err(AuthError::MissingCredential)
        );
        assert_eq!(
            AuthUtils::parse_bearer(Some("Bearer")),
            Err(AuthError::MalformedCredential)
        );
        assert_eq!(
            AuthUtils::parse_bearer(Some("Basic dXNlcjpwdw==")),
            Err(AuthError::MalformedCredential)
        );
        assert_eq!(
            AuthUtils::parse_bearer(Some("Bearer a b")),
            Err(AuthError::MalformedCredential)
        );
    }

    #[test]
    fn test_sanitize_token() {
        assert_eq!(AuthUtils::sanitize_token("short"), "***");
        assert_eq!(
            AuthUtils::sanitize_token("eyJhbGciOiJIUzI1NiJ9.payload.x9Zk"),
            "eyJh***x9Zk"
        );
    }
}
