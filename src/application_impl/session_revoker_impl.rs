use crate::application_port::{
    SessionError, SessionRevoker, TokenCodec, UnauthorizedReason, VerifyOptions,
};
use crate::domain_model::{PresentedCredentials, TokenKind, VerifiedToken};
use crate::domain_port::{Clock, RevocationStore, StoreKey};
use crate::logger::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct RealSessionRevoker {
    token_codec: Arc<dyn TokenCodec>,
    store: Arc<dyn RevocationStore>,
    clock: Arc<dyn Clock>,
}

impl RealSessionRevoker {
    pub fn new(
        token_codec: Arc<dyn TokenCodec>,
        store: Arc<dyn RevocationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            token_codec,
            store,
            clock,
        }
    }

    /// Shadow `token` until just after it would have expired anyway. Tokens
    /// already past expiry are rejected by the codec and need no record.
    async fn shadow(
        &self,
        token: &str,
        verified: &VerifiedToken,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let ttl_secs = verified.remaining_secs(now);
        if ttl_secs == 0 {
            return Ok(());
        }
        self.store
            .mark_revoked(&StoreKey::revoked(token), ttl_secs)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionRevoker for RealSessionRevoker {
    async fn revoke_session(&self, credentials: &PresentedCredentials) -> Result<(), SessionError> {
        let access = credentials
            .access_token
            .as_ref()
            .ok_or(SessionError::Unauthorized(UnauthorizedReason::MissingToken))?;

        // Signing out with a lapsed access token is fine; a forged or already
        // revoked one is not.
        let access_claims = self
            .token_codec
            .verify(access.as_str(), TokenKind::Access, VerifyOptions::ignoring_expiration())
            .await?;
        if self
            .store
            .is_revoked(&StoreKey::revoked(access.as_str()))
            .await?
        {
            return Err(SessionError::Unauthorized(UnauthorizedReason::Revoked));
        }
        let subject = &access_claims.payload.sub;

        let refresh = match &credentials.refresh_token {
            Some(refresh) => {
                let claims = self
                    .token_codec
                    .verify(refresh.as_str(), TokenKind::Refresh, VerifyOptions::ignoring_expiration())
                    .await?;
                if &claims.payload.sub != subject {
                    return Err(SessionError::Unauthorized(
                        UnauthorizedReason::SubjectMismatch,
                    ));
                }
                Some((refresh, claims))
            }
            None => None,
        };

        let now = self.clock.now();
        self.shadow(access.as_str(), &access_claims, now).await?;
        if let Some((refresh, claims)) = &refresh {
            self.shadow(refresh.as_str(), claims, now).await?;
        }
        self.store
            .delete(&StoreKey::current_refresh(subject))
            .await?;

        info!(%subject, with_refresh = refresh.is_some(), "session revoked");
        Ok(())
    }
}
