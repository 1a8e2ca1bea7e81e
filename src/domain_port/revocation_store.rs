use crate::domain_model::{RefreshToken, Subject};
use sha2::{Digest, Sha256};
use std::fmt;

/// Key of a store record, relative to the store's own prefix.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct StoreKey(String);

impl StoreKey {
    /// Revocation marker for a token. Keyed by digest so raw credentials never
    /// end up in the store.
    pub fn revoked(token: &str) -> Self {
        let digest = Sha256::digest(token.as_bytes());
        StoreKey(format!("revoked:{}", hex::encode(digest)))
    }

    /// The live refresh token of a subject.
    pub fn current_refresh(subject: &Subject) -> Self {
        StoreKey(format!("refresh:{}", subject))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait::async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record that `key` is invalid for the next `ttl_secs` seconds.
    async fn mark_revoked(&self, key: &StoreKey, ttl_secs: u64) -> Result<(), StoreError>;

    async fn is_revoked(&self, key: &StoreKey) -> Result<bool, StoreError>;

    /// Replace the subject's live refresh token.
    async fn set_current_refresh(
        &self,
        subject: &Subject,
        token: &RefreshToken,
        ttl_secs: u64,
    ) -> Result<(), StoreError>;

    async fn get_current_refresh(
        &self,
        subject: &Subject,
    ) -> Result<Option<RefreshToken>, StoreError>;

    async fn delete(&self, key: &StoreKey) -> Result<(), StoreError>;
}
