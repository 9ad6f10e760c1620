//! Errors produced while verifying a browser-held bearer credential.

use thiserror::Error;

/// Why a bearer credential was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("bearer credential was not provided")]
    MissingCredential,

    #[error("authorization header is not a bearer credential")]
    MalformedCredential,

    #[error("credential is invalid or expired")]
    InvalidCredential,

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("identity provider returned no user id")]
    IncompleteIdentity,
}

impl AuthError {
    /// Stable machine-readable reason, used in logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential => "malformed_credential",
            Self::InvalidCredential => "invalid_credential",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::IncompleteIdentity => "incomplete_identity",
        }
    }

    /// Remediation hint returned to the browser.
    #[must_use]
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::MissingCredential | Self::MalformedCredential => {
                "provide a valid bearer credential: 'Authorization: Bearer <token>'"
            }
            Self::InvalidCredential | Self::IncompleteIdentity => {
                "sign in again to obtain a fresh bearer credential"
            }
            Self::ProviderUnavailable(_) => "the identity provider could not be reached; retry shortly",
        }
    }
}
