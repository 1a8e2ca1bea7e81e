use crate::application_port::{TokenCodec, TokenError, VerifyOptions};
use crate::domain_model::{IdentityPayload, IssuedToken, TokenKind, VerifiedToken};
use crate::domain_port::Clock;
use chrono::DateTime;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    identity: IdentityPayload,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String,
    typ: TokenKind,
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
    clock: Arc<dyn Clock>,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        JwtHs256Codec { cfg, clock }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => &self.cfg.access_secret,
            TokenKind::Refresh => &self.cfg.refresh_secret,
        }
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock once the signature holds.
        v.validate_exp = false;
        v.set_audience(&[self.cfg.audience.clone()]);
        v.set_issuer(&[self.cfg.issuer.clone()]);
        v
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue(
        &self,
        payload: &IdentityPayload,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let iat_dt = self.clock.now();
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| TokenError::Signing(e.to_string()))?;
        let exp_dt = iat_dt + ttl;
        let claims = Claims {
            identity: payload.clone(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            jti: Self::gen_jti(),
            typ: kind,
        };
        let value = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret(kind)),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;
        // Round down like the `exp` claim so callers see what the token says.
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(exp_dt);
        Ok(IssuedToken { value, expires_at })
    }

    async fn verify(
        &self,
        token: &str,
        kind: TokenKind,
        options: VerifyOptions,
    ) -> Result<VerifiedToken, TokenError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(kind)),
            &self.validation(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })?;
        let claims = data.claims;

        if claims.typ != kind {
            return Err(TokenError::InvalidSignature);
        }

        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(TokenError::Malformed)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::Malformed)?;
        if !options.ignore_expiration && expires_at < self.clock.now() {
            return Err(TokenError::Expired);
        }

        Ok(VerifiedToken {
            payload: claims.identity,
            kind: claims.typ,
            jti: claims.jti,
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::ManualClock;
    use serde_json::json;

    fn codec(clock: Arc<ManualClock>) -> JwtHs256Codec {
        JwtHs256Codec::new(
            JwtConfig {
                issuer: "tokenpair.test".into(),
                audience: "test-client".into(),
                access_secret: b"access-secret".to_vec(),
                refresh_secret: b"refresh-secret".to_vec(),
            },
            clock,
        )
    }

    fn payload() -> IdentityPayload {
        serde_json::from_value(json!({"sub": "u1", "role": "admin", "email": "u1@example.com"}))
            .unwrap()
    }

    #[tokio::test]
    async fn issued_token_decodes_to_payload() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec(clock.clone());

        let issued = codec
            .issue(&payload(), TokenKind::Access, Duration::from_secs(900))
            .await
            .unwrap();
        let verified = codec
            .verify(&issued.value, TokenKind::Access, VerifyOptions::default())
            .await
            .unwrap();

        assert_eq!(verified.payload, payload());
        assert_eq!(verified.kind, TokenKind::Access);
        assert_eq!(verified.expires_at, issued.expires_at);
        assert_eq!((verified.expires_at - verified.issued_at).num_seconds(), 900);
    }

    #[tokio::test]
    async fn kinds_are_not_interchangeable() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec(clock);

        let refresh = codec
            .issue(&payload(), TokenKind::Refresh, Duration::from_secs(60))
            .await
            .unwrap();
        let access = codec
            .issue(&payload(), TokenKind::Access, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            codec
                .verify(&refresh.value, TokenKind::Access, VerifyOptions::default())
                .await
                .unwrap_err(),
            TokenError::InvalidSignature
        );
        assert_eq!(
            codec
                .verify(&access.value, TokenKind::Refresh, VerifyOptions::default())
                .await
                .unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[tokio::test]
    async fn expiry_follows_the_clock() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec(clock.clone());
        let issued = codec
            .issue(&payload(), TokenKind::Access, Duration::from_secs(900))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(900));
        assert!(
            codec
                .verify(&issued.value, TokenKind::Access, VerifyOptions::default())
                .await
                .is_ok()
        );

        clock.advance(Duration::from_secs(1));
        assert_eq!(
            codec
                .verify(&issued.value, TokenKind::Access, VerifyOptions::default())
                .await
                .unwrap_err(),
            TokenError::Expired
        );

        let verified = codec
            .verify(&issued.value, TokenKind::Access, VerifyOptions::ignoring_expiration())
            .await
            .unwrap();
        assert!(verified.expires_at < clock.now());
    }

    #[tokio::test]
    async fn foreign_secret_is_rejected() {
        let clock = Arc::new(ManualClock::starting_now());
        let ours = codec(clock.clone());
        let theirs = JwtHs256Codec::new(
            JwtConfig {
                issuer: "tokenpair.test".into(),
                audience: "test-client".into(),
                access_secret: b"someone-else".to_vec(),
                refresh_secret: b"refresh-secret".to_vec(),
            },
            clock,
        );

        let forged = theirs
            .issue(&payload(), TokenKind::Access, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            ours.verify(&forged.value, TokenKind::Access, VerifyOptions::default())
                .await
                .unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let codec = codec(Arc::new(ManualClock::starting_now()));
        assert_eq!(
            codec
                .verify("not-a-jwt", TokenKind::Access, VerifyOptions::default())
                .await
                .unwrap_err(),
            TokenError::Malformed
        );
    }

    #[tokio::test]
    async fn tokens_issued_together_differ() {
        let codec = codec(Arc::new(ManualClock::starting_now()));
        let a = codec
            .issue(&payload(), TokenKind::Refresh, Duration::from_secs(60))
            .await
            .unwrap();
        let b = codec
            .issue(&payload(), TokenKind::Refresh, Duration::from_secs(60))
            .await
            .unwrap();
        assert_ne!(a.value, b.value);
    }
}
