use super::*;
use crate::application_port::{SessionIssuer, TokenCodec};
use crate::domain_model::{RefreshToken, SessionConfig, Subject};
use crate::domain_port::{Clock, RevocationStore, StoreError, StoreKey};
use crate::infra_memory::{ManualClock, MemoryRevocationStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Session components wired to an in-memory store and a hand-driven clock.
pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn RevocationStore>,
    pub codec: Arc<dyn TokenCodec>,
    pub issuer: Arc<dyn SessionIssuer>,
    pub verifier: RealSessionVerifier,
    pub revoker: RealSessionRevoker,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let store: Arc<dyn RevocationStore> = Arc::new(MemoryRevocationStore::new(clock.clone()));
        Self::build(clock, store, config)
    }

    pub fn with_failing_store() -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        Self::build(clock, Arc::new(FailingStore), SessionConfig::default())
    }

    fn build(clock: Arc<ManualClock>, store: Arc<dyn RevocationStore>, config: SessionConfig) -> Self {
        let codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(
            JwtConfig {
                issuer: "tokenpair.test".into(),
                audience: "test-client".into(),
                access_secret: b"access-secret".to_vec(),
                refresh_secret: b"refresh-secret".to_vec(),
            },
            clock.clone(),
        ));
        let issuer: Arc<dyn SessionIssuer> =
            Arc::new(RealSessionIssuer::new(codec.clone(), store.clone(), &config));
        let verifier = RealSessionVerifier::new(
            codec.clone(),
            store.clone(),
            issuer.clone(),
            clock.clone(),
            &config,
        );
        let revoker = RealSessionRevoker::new(codec.clone(), store.clone(), clock.clone());
        Fixture {
            clock,
            store,
            codec,
            issuer,
            verifier,
            revoker,
        }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

struct FailingStore;

#[async_trait::async_trait]
impl RevocationStore for FailingStore {
    async fn mark_revoked(&self, _key: &StoreKey, _ttl_secs: u64) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn is_revoked(&self, _key: &StoreKey) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn set_current_refresh(
        &self,
        _subject: &Subject,
        _token: &RefreshToken,
        _ttl_secs: u64,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn get_current_refresh(
        &self,
        _subject: &Subject,
    ) -> Result<Option<RefreshToken>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _key: &StoreKey) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}
