use crate::application_port::{SessionError, SessionIssuer, TokenCodec};
use crate::domain_model::{
    AccessToken, IdentityPayload, RefreshToken, SessionConfig, TokenKind, TokenPair,
};
use crate::domain_port::RevocationStore;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;

pub struct RealSessionIssuer {
    token_codec: Arc<dyn TokenCodec>,
    store: Arc<dyn RevocationStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl RealSessionIssuer {
    pub fn new(
        token_codec: Arc<dyn TokenCodec>,
        store: Arc<dyn RevocationStore>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            token_codec,
            store,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }
}

#[async_trait::async_trait]
impl SessionIssuer for RealSessionIssuer {
    async fn issue_session(&self, payload: &IdentityPayload) -> Result<TokenPair, SessionError> {
        payload.validate()?;

        let access = self
            .token_codec
            .issue(payload, TokenKind::Access, self.access_ttl)
            .await?;
        let refresh = self
            .token_codec
            .issue(payload, TokenKind::Refresh, self.refresh_ttl)
            .await?;

        let refresh_token = RefreshToken(refresh.value);
        // Supersedes whatever refresh token the subject held before.
        self.store
            .set_current_refresh(&payload.sub, &refresh_token, self.refresh_ttl.as_secs())
            .await?;

        info!(subject = %payload.sub, "session issued");

        Ok(TokenPair {
            access_token: AccessToken(access.value),
            refresh_token,
            access_token_expires_at: access.expires_at,
            refresh_token_expires_at: refresh.expires_at,
        })
    }
}
