use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Claim names owned by the token codec. Callers may not smuggle them in
/// through the extra claims of an identity payload.
pub const RESERVED_CLAIMS: [&str; 7] = ["iat", "exp", "nbf", "jti", "iss", "aud", "typ"];

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(pub String);

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Claims describing who a session belongs to.
///
/// `sub` is required; everything else the caller sends at sign-in is kept in
/// `extra` and travels unchanged through every rotation of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityPayload {
    pub sub: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("subject must not be empty")]
    EmptySubject,
    #[error("claim `{0}` is reserved")]
    ReservedClaim(String),
}

impl IdentityPayload {
    pub fn new(sub: impl Into<String>) -> Self {
        IdentityPayload {
            sub: Subject(sub.into()),
            role: None,
            extra: Map::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.sub.0.trim().is_empty() {
            return Err(PayloadError::EmptySubject);
        }
        if let Some(name) = self
            .extra
            .keys()
            .find(|k| RESERVED_CLAIMS.contains(&k.as_str()))
        {
            return Err(PayloadError::ReservedClaim(name.clone()));
        }
        Ok(())
    }
}
