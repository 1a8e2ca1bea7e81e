use super::cookie::{CookiePolicy, with_cookies};
use super::error::*;
use crate::application_port::{GateOutcome, SessionIssuer, SessionRevoker, SessionVerifier};
use crate::domain_model::{AccessToken, IdentityPayload, PresentedCredentials, RefreshToken, TokenPair};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use warp::hyper::body::Bytes;
use warp::{self, Rejection, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Parse an optional JSON identity payload. An empty body is `None`; anything
/// else must be a valid payload.
pub fn parse_payload(body: &Bytes) -> Result<Option<IdentityPayload>, ApiErrorCode> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let payload: IdentityPayload =
        serde_json::from_slice(body).map_err(|_| ApiErrorCode::BadRequest)?;
    payload.validate().map_err(|_| ApiErrorCode::BadRequest)?;
    Ok(Some(payload))
}

fn require_payload(body: &Bytes) -> Result<IdentityPayload, Rejection> {
    parse_payload(body)
        .and_then(|p| p.ok_or(ApiErrorCode::BadRequest))
        .map_err(reject::custom)
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessToken>,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

fn token_reply(tokens: &TokenPair, policy: &CookiePolicy) -> Result<warp::reply::Response, Rejection> {
    let response = TokenResponse {
        access_token: policy
            .access_in_body()
            .then(|| tokens.access_token.clone()),
        access_token_expires_at: tokens.access_token_expires_at,
        refresh_token_expires_at: tokens.refresh_token_expires_at,
    };
    with_cookies(
        warp::reply::json(&ApiResponse::ok(response)),
        policy.issue(tokens),
    )
}

pub async fn sign_in(
    body: Bytes,
    session_issuer: Arc<dyn SessionIssuer>,
    policy: CookiePolicy,
) -> Result<warp::reply::Response, Rejection> {
    let payload = require_payload(&body)?;
    let tokens = session_issuer
        .issue_session(&payload)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    token_reply(&tokens, &policy)
}

pub async fn refresh(
    refresh_cookie: Option<String>,
    body: Bytes,
    session_verifier: Arc<dyn SessionVerifier>,
    policy: CookiePolicy,
) -> Result<warp::reply::Response, Rejection> {
    let refresh_token = refresh_cookie
        .filter(|t| !t.is_empty())
        .map(RefreshToken)
        .ok_or_else(|| reject::custom(ApiErrorCode::Unauthorized))?;
    let payload = require_payload(&body)?;
    let tokens = session_verifier
        .rotate(&refresh_token, &payload)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    token_reply(&tokens, &policy)
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse;

pub async fn sign_out(
    credentials: PresentedCredentials,
    session_revoker: Arc<dyn SessionRevoker>,
    policy: CookiePolicy,
) -> Result<warp::reply::Response, Rejection> {
    session_revoker
        .revoke_session(&credentials)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    with_cookies(
        warp::reply::json(&ApiResponse::ok(SignOutResponse)),
        policy.clear(),
    )
}

#[derive(Debug, Serialize)]
pub struct ProtectedResponse {
    pub path: String,
    pub identity: IdentityPayload,
    pub rotated: bool,
}

/// Stand-in for whatever the protected prefix serves: echoes who got in.
pub async fn protected(
    tail: warp::path::Tail,
    outcome: GateOutcome,
    policy: CookiePolicy,
) -> Result<warp::reply::Response, Rejection> {
    let cookies = outcome
        .rotated_tokens()
        .map(|tokens| policy.issue(tokens))
        .unwrap_or_default();
    let response = ProtectedResponse {
        path: tail.as_str().to_string(),
        identity: outcome.identity().clone(),
        rotated: outcome.rotated_tokens().is_some(),
    };
    with_cookies(warp::reply::json(&ApiResponse::ok(response)), cookies)
}
