use super::{AccessToken, RefreshToken};
use serde::Deserialize;
use std::time::Duration;

/// Where the access token travels between client and server.
///
/// `Header`: returned in the JSON body and presented as a bearer token.
/// `Cookie`: set and presented as an http-only cookie next to the refresh token.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Header,
    Cookie,
}

/// Lifetimes and transport shared by the session components. Built once from
/// settings at startup.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub rotation_leeway: Duration,
    pub transport: TransportMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(14 * 24 * 60 * 60),
            rotation_leeway: Duration::ZERO,
            transport: TransportMode::Header,
        }
    }
}

/// Whatever tokens came with a request, already pulled out of headers or cookies.
#[derive(Debug, Clone, Default)]
pub struct PresentedCredentials {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
}
