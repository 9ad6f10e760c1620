//! Internal token minting
//!
//! Issues the short-lived, audience-scoped HS256 token that the relay presents to the
//! gatekeeper. A new token is minted for every relay call and never stored.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use uuid::Uuid;

use crate::auth::claims::{InternalClaims, VerifiedIdentity};
use crate::config::TokenConfig;
use crate::error::{RelayError, Result};

/// Internal token minter
#[derive(Clone)]
pub struct TokenMinter {
    /// Encoding key, `None` when no signing secret is configured
    encoding_key: Option<EncodingKey>,
    audience: String,
    issuer: String,
    ttl_seconds: i64,
}

impl std::fmt::Debug for TokenMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenMinter")
            .field("configured", &self.encoding_key.is_some())
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenMinter {
    /// Create a minter from token configuration.
    ///
    /// A missing secret is not an error here: it surfaces as a configuration error on
    /// the first `mint` call so the rest of the relay can still start.
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding_key: config
                .secret()
                .map(|secret| EncodingKey::from_secret(secret.as_bytes())),
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
            ttl_seconds: i64::try_from(config.ttl_seconds).unwrap_or(i64::MAX),
        }
    }

    /// Whether a signing secret is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.encoding_key.is_some()
    }

    /// Build the claim set for an identity at the current time
    #[must_use]
    pub fn claims_for(&self, identity: &VerifiedIdentity) -> InternalClaims {
        let iat = Utc::now().timestamp();
        InternalClaims {
            sub: identity.user_id.clone(),
            email: identity.email.clone(),
            roles: vec![identity.role.clone()],
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
            iat,
            exp: iat.saturating_add(self.ttl_seconds),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Mint a signed internal token
    pub fn mint(&self, identity: &VerifiedIdentity) -> Result<String> {
        let key = self
            .encoding_key
            .as_ref()
            .ok_or_else(|| RelayError::config("internal token signing secret is not configured"))?;

        let claims = self.claims_for(identity);
        encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|e| RelayError::internal_with_source("internal token signing failed", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    fn config(secret: Option<&str>) -> TokenConfig {
        TokenConfig {
            signing_secret: secret.map(str::to_string),
            ..TokenConfig::default()
        }
    }

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity::new("user-123", "ops@example.com", "authenticated")
    }

    #[test]
    fn test_minted_claims_match_configuration() {
        let minter = TokenMinter::new(&config(Some("test-secret")));
        let token = minter.mint(&identity()).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["metrics-boundary"]);
        validation.set_issuer(&["dashboard-relay"]);
        let data = decode::<InternalClaims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &validation,
        )
        .unwrap();

        let claims = data.claims;
        assert_eq!(claims.exp - claims.iat, 60);
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.email, "ops@example.com");
        assert_eq!(claims.roles, vec!["authenticated".to_string()]);
        assert_eq!(claims.aud, "metrics-boundary");
        assert_eq!(claims.iss, "dashboard-relay");
    }

    #[test]
    fn test_tokens_are_never_identical() {
        let minter = TokenMinter::new(&config(Some("test-secret")));
        let first = minter.mint(&identity()).unwrap();
        let second = minter.mint(&identity()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_custom_ttl() {
        let minter = TokenMinter::new(&TokenConfig {
            signing_secret: Some("k".to_string()),
            ttl_seconds: 15,
            ..TokenConfig::default()
        });
        let claims = minter.claims_for(&identity());
        assert_eq!(claims.exp - claims.iat, 15);
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let minter = TokenMinter::new(&config(None));
        assert!(!minter.is_configured());
        let err = minter.mint(&identity()).unwrap_err();
        assert!(matches!(err, RelayError::Config { .. }));
        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
