use crate::application_port::{
    GateOutcome, SessionError, SessionIssuer, SessionVerifier, TokenCodec, UnauthorizedReason,
    VerifyOptions,
};
use crate::domain_model::{
    AccessToken, IdentityPayload, PresentedCredentials, RefreshToken, SessionConfig, TokenKind,
    TokenPair, TransportMode, VerifiedToken,
};
use crate::domain_port::{Clock, RevocationStore, StoreKey};
use crate::logger::*;
use std::sync::Arc;

/// Gates protected requests.
///
/// A request moves through: token present → signature valid → not revoked →
/// either still fresh (proceed) or expired, in which case the refresh token is
/// checked against the subject's current record and the pair is rotated. Any
/// failed step is terminal; the client has to sign in again.
pub struct RealSessionVerifier {
    token_codec: Arc<dyn TokenCodec>,
    store: Arc<dyn RevocationStore>,
    issuer: Arc<dyn SessionIssuer>,
    clock: Arc<dyn Clock>,
    rotation_leeway: chrono::Duration,
    transport: TransportMode,
}

impl RealSessionVerifier {
    pub fn new(
        token_codec: Arc<dyn TokenCodec>,
        store: Arc<dyn RevocationStore>,
        issuer: Arc<dyn SessionIssuer>,
        clock: Arc<dyn Clock>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            token_codec,
            store,
            issuer,
            clock,
            rotation_leeway: chrono::Duration::from_std(config.rotation_leeway)
                .unwrap_or_else(|_| chrono::Duration::zero()),
            transport: config.transport,
        }
    }

    async fn ensure_not_revoked(&self, token: &str) -> Result<(), SessionError> {
        if self.store.is_revoked(&StoreKey::revoked(token)).await? {
            return Err(SessionError::Unauthorized(UnauthorizedReason::Revoked));
        }
        Ok(())
    }

    fn ensure_same_subject(
        verified: &VerifiedToken,
        payload: &IdentityPayload,
    ) -> Result<(), SessionError> {
        if verified.payload.sub != payload.sub {
            return Err(SessionError::Unauthorized(
                UnauthorizedReason::SubjectMismatch,
            ));
        }
        Ok(())
    }

    async fn rotate_inner(
        &self,
        refresh: &RefreshToken,
        payload: &IdentityPayload,
    ) -> Result<(IdentityPayload, TokenPair), SessionError> {
        payload.validate()?;

        let verified = self
            .token_codec
            .verify(refresh.as_str(), TokenKind::Refresh, VerifyOptions::default())
            .await?;
        self.ensure_not_revoked(refresh.as_str()).await?;
        Self::ensure_same_subject(&verified, payload)?;

        let subject = &verified.payload.sub;
        let current = self.store.get_current_refresh(subject).await?;
        if current.as_ref() != Some(refresh) {
            warn!(%subject, "superseded refresh token presented");
            return Err(SessionError::Unauthorized(UnauthorizedReason::RefreshReuse));
        }

        // Rotated tokens embed what the refresh token says, not what the
        // caller sent.
        let tokens = self.issuer.issue_session(&verified.payload).await?;
        info!(%subject, "session rotated");
        Ok((verified.payload, tokens))
    }
}

#[async_trait::async_trait]
impl SessionVerifier for RealSessionVerifier {
    async fn verify_strict(&self, access: &AccessToken) -> Result<IdentityPayload, SessionError> {
        let verified = self
            .token_codec
            .verify(access.as_str(), TokenKind::Access, VerifyOptions::default())
            .await?;
        self.ensure_not_revoked(access.as_str()).await?;
        Ok(verified.payload)
    }

    async fn verify_rotating(
        &self,
        access: &AccessToken,
        refresh: &RefreshToken,
        payload: &IdentityPayload,
    ) -> Result<GateOutcome, SessionError> {
        payload.validate()?;

        let verified = self
            .token_codec
            .verify(access.as_str(), TokenKind::Access, VerifyOptions::ignoring_expiration())
            .await?;
        self.ensure_not_revoked(access.as_str()).await?;
        Self::ensure_same_subject(&verified, payload)?;

        if verified.expires_at < self.clock.now() + self.rotation_leeway {
            let (identity, tokens) = self.rotate_inner(refresh, payload).await?;
            return Ok(GateOutcome::Rotated(identity, tokens));
        }

        Ok(GateOutcome::Proceed(verified.payload))
    }

    async fn rotate(
        &self,
        refresh: &RefreshToken,
        payload: &IdentityPayload,
    ) -> Result<TokenPair, SessionError> {
        let (_, tokens) = self.rotate_inner(refresh, payload).await?;
        Ok(tokens)
    }

    async fn gate(
        &self,
        credentials: &PresentedCredentials,
        payload: Option<&IdentityPayload>,
    ) -> Result<GateOutcome, SessionError> {
        let access = credentials
            .access_token
            .as_ref()
            .ok_or(SessionError::Unauthorized(UnauthorizedReason::MissingToken))?;

        match self.transport {
            TransportMode::Header => self.verify_strict(access).await.map(GateOutcome::Proceed),
            TransportMode::Cookie => {
                let refresh = credentials
                    .refresh_token
                    .as_ref()
                    .ok_or(SessionError::Unauthorized(UnauthorizedReason::MissingToken))?;
                let payload = payload.ok_or_else(|| {
                    SessionError::BadRequest("identity payload required".to_string())
                })?;
                self.verify_rotating(access, refresh, payload).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::fixture::Fixture;
    use crate::application_port::SessionRevoker;
    use std::time::Duration;

    fn unauthorized(err: SessionError) -> UnauthorizedReason {
        match err {
            SessionError::Unauthorized(reason) => reason,
            other => panic!("expected unauthorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fresh_access_token_passes_strict_gate() {
        let fx = Fixture::new();
        let payload = IdentityPayload::new("u1");
        let tokens = fx.issuer.issue_session(&payload).await.unwrap();

        let identity = fx.verifier.verify_strict(&tokens.access_token).await.unwrap();
        assert_eq!(identity, payload);
    }

    #[tokio::test]
    async fn expired_access_token_fails_strict_gate() {
        let fx = Fixture::new();
        let tokens = fx
            .issuer
            .issue_session(&IdentityPayload::new("u1"))
            .await
            .unwrap();

        fx.clock.advance(Duration::from_secs(901));
        let err = fx.verifier.verify_strict(&tokens.access_token).await.unwrap_err();
        assert_eq!(unauthorized(err), UnauthorizedReason::Expired);
    }

    #[tokio::test]
    async fn refresh_token_never_passes_strict_gate() {
        let fx = Fixture::new();
        let tokens = fx
            .issuer
            .issue_session(&IdentityPayload::new("u1"))
            .await
            .unwrap();

        let as_access = AccessToken(tokens.refresh_token.0.clone());
        let err = fx.verifier.verify_strict(&as_access).await.unwrap_err();
        assert_eq!(unauthorized(err), UnauthorizedReason::InvalidSignature);
    }

    #[tokio::test]
    async fn rotating_gate_proceeds_while_access_is_fresh() {
        let fx = Fixture::new();
        let payload = IdentityPayload::new("u1");
        let tokens = fx.issuer.issue_session(&payload).await.unwrap();

        fx.clock.advance(Duration::from_secs(899));
        let outcome = fx
            .verifier
            .verify_rotating(&tokens.access_token, &tokens.refresh_token, &payload)
            .await
            .unwrap();
        assert!(matches!(outcome, GateOutcome::Proceed(_)));
        assert_eq!(outcome.identity(), &payload);
    }

    #[tokio::test]
    async fn expired_access_rotates_and_old_refresh_is_superseded() {
        let fx = Fixture::new();
        let payload = IdentityPayload::new("u1").with_role("reader");
        let old = fx.issuer.issue_session(&payload).await.unwrap();

        fx.clock.advance(Duration::from_secs(901));
        let outcome = fx
            .verifier
            .verify_rotating(&old.access_token, &old.refresh_token, &payload)
            .await
            .unwrap();
        let new = outcome.rotated_tokens().cloned().expect("rotated");
        assert_eq!(outcome.identity(), &payload);
        assert_ne!(new.refresh_token, old.refresh_token);
        assert_eq!(fx.verifier.verify_strict(&new.access_token).await.unwrap(), payload);

        let err = fx
            .verifier
            .verify_rotating(&old.access_token, &old.refresh_token, &payload)
            .await
            .unwrap_err();
        assert_eq!(unauthorized(err), UnauthorizedReason::RefreshReuse);
    }

    #[tokio::test]
    async fn rotation_keeps_token_claims_over_caller_claims() {
        let fx = Fixture::new();
        let issued = IdentityPayload::new("u1").with_role("reader");
        let tokens = fx.issuer.issue_session(&issued).await.unwrap();

        let claimed = IdentityPayload::new("u1").with_role("admin");
        let rotated = fx.verifier.rotate(&tokens.refresh_token, &claimed).await.unwrap();

        let identity = fx.verifier.verify_strict(&rotated.access_token).await.unwrap();
        assert_eq!(identity.role.as_deref(), Some("reader"));
    }

    #[tokio::test]
    async fn rotation_rejects_other_subject() {
        let fx = Fixture::new();
        let tokens = fx
            .issuer
            .issue_session(&IdentityPayload::new("u1"))
            .await
            .unwrap();

        let err = fx
            .verifier
            .rotate(&tokens.refresh_token, &IdentityPayload::new("u2"))
            .await
            .unwrap_err();
        assert_eq!(unauthorized(err), UnauthorizedReason::SubjectMismatch);
    }

    #[tokio::test]
    async fn expired_refresh_token_cannot_rotate() {
        let fx = Fixture::new();
        let payload = IdentityPayload::new("u1");
        let tokens = fx.issuer.issue_session(&payload).await.unwrap();

        fx.clock.advance(Duration::from_secs(1_209_601));
        let err = fx
            .verifier
            .verify_rotating(&tokens.access_token, &tokens.refresh_token, &payload)
            .await
            .unwrap_err();
        assert_eq!(unauthorized(err), UnauthorizedReason::Expired);
    }

    #[tokio::test]
    async fn access_token_cannot_rotate() {
        let fx = Fixture::new();
        let payload = IdentityPayload::new("u1");
        let tokens = fx.issuer.issue_session(&payload).await.unwrap();

        let as_refresh = RefreshToken(tokens.access_token.0.clone());
        let err = fx.verifier.rotate(&as_refresh, &payload).await.unwrap_err();
        assert_eq!(unauthorized(err), UnauthorizedReason::InvalidSignature);
    }

    #[tokio::test]
    async fn revoked_tokens_are_rejected_before_expiry() {
        let fx = Fixture::new();
        let payload = IdentityPayload::new("u1");
        let tokens = fx.issuer.issue_session(&payload).await.unwrap();

        fx.revoker
            .revoke_session(&PresentedCredentials {
                access_token: Some(tokens.access_token.clone()),
                refresh_token: Some(tokens.refresh_token.clone()),
            })
            .await
            .unwrap();

        let err = fx.verifier.verify_strict(&tokens.access_token).await.unwrap_err();
        assert_eq!(unauthorized(err), UnauthorizedReason::Revoked);
        let err = fx.verifier.rotate(&tokens.refresh_token, &payload).await.unwrap_err();
        assert_eq!(unauthorized(err), UnauthorizedReason::Revoked);
    }

    #[tokio::test]
    async fn leeway_rotates_before_expiry() {
        let fx = Fixture::with_config(SessionConfig {
            rotation_leeway: Duration::from_secs(60),
            transport: TransportMode::Cookie,
            ..SessionConfig::default()
        });
        let payload = IdentityPayload::new("u1");
        let tokens = fx.issuer.issue_session(&payload).await.unwrap();

        fx.clock.advance(Duration::from_secs(850));
        let outcome = fx
            .verifier
            .verify_rotating(&tokens.access_token, &tokens.refresh_token, &payload)
            .await
            .unwrap();
        assert!(outcome.rotated_tokens().is_some());
    }

    #[tokio::test]
    async fn gate_follows_transport_mode() {
        let header = Fixture::new();
        let payload = IdentityPayload::new("u1");
        let tokens = header.issuer.issue_session(&payload).await.unwrap();
        let access_only = PresentedCredentials {
            access_token: Some(tokens.access_token.clone()),
            refresh_token: None,
        };
        assert!(header.verifier.gate(&access_only, None).await.is_ok());

        let cookie = Fixture::with_config(SessionConfig {
            transport: TransportMode::Cookie,
            ..SessionConfig::default()
        });
        let tokens = cookie.issuer.issue_session(&payload).await.unwrap();
        let access_only = PresentedCredentials {
            access_token: Some(tokens.access_token.clone()),
            refresh_token: None,
        };
        let err = cookie.verifier.gate(&access_only, Some(&payload)).await.unwrap_err();
        assert_eq!(unauthorized(err), UnauthorizedReason::MissingToken);

        let both = PresentedCredentials {
            access_token: Some(tokens.access_token),
            refresh_token: Some(tokens.refresh_token),
        };
        let err = cookie.verifier.gate(&both, None).await.unwrap_err();
        assert!(matches!(err, SessionError::BadRequest(_)));
        assert!(cookie.verifier.gate(&both, Some(&payload)).await.is_ok());
    }

    #[tokio::test]
    async fn missing_access_token_is_unauthorized() {
        let fx = Fixture::new();
        let err = fx
            .verifier
            .gate(&PresentedCredentials::default(), None)
            .await
            .unwrap_err();
        assert_eq!(unauthorized(err), UnauthorizedReason::MissingToken);
    }

    #[tokio::test]
    async fn store_fault_fails_closed() {
        let fx = Fixture::new();
        let tokens = fx
            .issuer
            .issue_session(&IdentityPayload::new("u1"))
            .await
            .unwrap();

        let failing = Fixture::with_failing_store();
        let err = failing
            .verifier
            .verify_strict(&tokens.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::StoreUnavailable(_)));
    }
}
