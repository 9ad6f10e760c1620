//! # 认证模块
//!
//! 信任链的前两环：验证浏览器持有的长期凭证，再签发只面向指标边界的短期内部令牌。

pub mod claims;
pub mod minter;
pub mod utils;
pub mod verifier;

pub use claims::{InternalClaims, VerifiedIdentity};
pub use minter::TokenMinter;
pub use utils::AuthUtils;
pub use verifier::{CredentialVerifier, HttpIdentityProvider, IdentityProvider};
