use super::IdentityPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Clone, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

// Token values are credentials; keep them out of debug output and logs.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken(..)")
    }
}

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RefreshToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// Claims recovered from a token whose signature checked out.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub payload: IdentityPayload,
    pub kind: TokenKind,
    pub jti: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerifiedToken {
    /// Seconds a record about this token must live to outlast it: strictly
    /// past `expires_at`, since the token is accepted up to and including
    /// that instant. Zero once the token has expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.expires_at - now).num_milliseconds();
        if millis < 0 {
            return 0;
        }
        millis as u64 / 1000 + 1
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn verified(expires_at: DateTime<Utc>) -> VerifiedToken {
        VerifiedToken {
            payload: IdentityPayload::new("u1"),
            kind: TokenKind::Access,
            jti: "jti".into(),
            issued_at: expires_at - TimeDelta::seconds(900),
            expires_at,
        }
    }

    #[test]
    fn remaining_lifetime_outlasts_expiry() {
        let exp = DateTime::from_timestamp(1_700_000_900, 0).unwrap();
        let token = verified(exp);

        assert_eq!(token.remaining_secs(exp - TimeDelta::seconds(600)), 601);
        assert_eq!(token.remaining_secs(exp - TimeDelta::milliseconds(899_400)), 900);
        assert_eq!(token.remaining_secs(exp - TimeDelta::milliseconds(300)), 1);
        assert_eq!(token.remaining_secs(exp), 1);
        assert_eq!(token.remaining_secs(exp + TimeDelta::milliseconds(1)), 0);
    }
}
