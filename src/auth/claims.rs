//! Identity and internal-token claim types.

use serde::{Deserialize, Serialize};

/// Identity confirmed by the external identity provider for one request.
///
/// Never persisted; a fresh one is produced by every verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

impl VerifiedIdentity {
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role: role.into(),
        }
    }
}

/// Claims carried by the short-lived internal token.
///
/// Field names are part of the contract with the gatekeeper and must stay bit-exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalClaims {
    pub sub: String,
    pub email: String,
    pub roles: Vec<String>,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}
