use crate::domain_model::{IdentityPayload, IssuedToken, TokenKind, VerifiedToken};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("signature does not match")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions {
    /// Accept a token past its `exp`, e.g. to read the expiry of an access
    /// token whose refresh companion is still live.
    pub ignore_expiration: bool,
}

impl VerifyOptions {
    pub fn ignoring_expiration() -> Self {
        VerifyOptions {
            ignore_expiration: true,
        }
    }
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue(
        &self,
        payload: &IdentityPayload,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError>;

    async fn verify(
        &self,
        token: &str,
        kind: TokenKind,
        options: VerifyOptions,
    ) -> Result<VerifiedToken, TokenError>;
}
