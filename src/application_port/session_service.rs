use super::TokenError;
use crate::domain_model::{
    AccessToken, IdentityPayload, PayloadError, PresentedCredentials, RefreshToken, TokenPair,
};
use crate::domain_port::StoreError;
use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UnauthorizedReason {
    MissingToken,
    MalformedBearer,
    MalformedToken,
    InvalidSignature,
    Expired,
    Revoked,
    RefreshReuse,
    SubjectMismatch,
}

impl fmt::Display for UnauthorizedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnauthorizedReason::MissingToken => "missing token",
            UnauthorizedReason::MalformedBearer => "malformed bearer",
            UnauthorizedReason::MalformedToken => "malformed token",
            UnauthorizedReason::InvalidSignature => "invalid signature",
            UnauthorizedReason::Expired => "expired",
            UnauthorizedReason::Revoked => "revoked",
            UnauthorizedReason::RefreshReuse => "superseded refresh token",
            UnauthorizedReason::SubjectMismatch => "subject mismatch",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(UnauthorizedReason),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature => {
                SessionError::Unauthorized(UnauthorizedReason::InvalidSignature)
            }
            TokenError::Malformed => SessionError::Unauthorized(UnauthorizedReason::MalformedToken),
            TokenError::Expired => SessionError::Unauthorized(UnauthorizedReason::Expired),
            TokenError::Signing(e) => SessionError::InternalError(e),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        // Corrupt records are as untrustworthy as an unreachable store.
        SessionError::StoreUnavailable(err.to_string())
    }
}

impl From<PayloadError> for SessionError {
    fn from(err: PayloadError) -> Self {
        SessionError::BadRequest(err.to_string())
    }
}

/// Result of a gate that let the request through.
#[derive(Debug, Clone)]
pub enum GateOutcome {
    /// Presented tokens are good as they are.
    Proceed(IdentityPayload),
    /// The access token had expired and the session was rotated; the caller
    /// must hand the new pair back to the client.
    Rotated(IdentityPayload, TokenPair),
}

impl GateOutcome {
    pub fn identity(&self) -> &IdentityPayload {
        match self {
            GateOutcome::Proceed(identity) => identity,
            GateOutcome::Rotated(identity, _) => identity,
        }
    }

    pub fn rotated_tokens(&self) -> Option<&TokenPair> {
        match self {
            GateOutcome::Proceed(_) => None,
            GateOutcome::Rotated(_, tokens) => Some(tokens),
        }
    }
}

#[async_trait::async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn issue_session(&self, payload: &IdentityPayload) -> Result<TokenPair, SessionError>;
}

#[async_trait::async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Check an access token without ever rotating.
    async fn verify_strict(&self, access: &AccessToken) -> Result<IdentityPayload, SessionError>;

    /// Check an access token and rotate the pair once it has expired.
    async fn verify_rotating(
        &self,
        access: &AccessToken,
        refresh: &RefreshToken,
        payload: &IdentityPayload,
    ) -> Result<GateOutcome, SessionError>;

    /// Trade a live refresh token for a new pair.
    async fn rotate(
        &self,
        refresh: &RefreshToken,
        payload: &IdentityPayload,
    ) -> Result<TokenPair, SessionError>;

    /// Gate a protected request according to the configured transport mode.
    async fn gate(
        &self,
        credentials: &PresentedCredentials,
        payload: Option<&IdentityPayload>,
    ) -> Result<GateOutcome, SessionError>;
}

#[async_trait::async_trait]
pub trait SessionRevoker: Send + Sync {
    async fn revoke_session(&self, credentials: &PresentedCredentials) -> Result<(), SessionError>;
}
