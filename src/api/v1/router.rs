use super::cookie::{ACCESS_COOKIE, CookiePolicy, REFRESH_COOKIE};
use super::error::*;
use super::handler;
use crate::application_port::{GateOutcome, SessionError, SessionVerifier, UnauthorizedReason};
use crate::domain_model::{
    AccessToken, IdentityPayload, PresentedCredentials, RefreshToken, TransportMode,
};
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::hyper::body::Bytes;
use warp::filters::BoxedFilter;
use warp::{Filter, Rejection, reject};

/// Identity payloads are a handful of claims.
const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let policy = CookiePolicy::new(&server.session_config, server.refresh_cookie_path.clone());
    let transport = server.session_config.transport;

    // Paths are matched before methods so a wrong path reads as 404, not 405.
    let sign_in = warp::path("sign-in")
        .and(warp::path::end())
        .and(warp::post())
        .and(limited_body())
        .and(with(server.session_issuer.clone()))
        .and(with_value(policy.clone()))
        .and_then(handler::sign_in);

    let refresh = warp::path("refresh")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::cookie::optional::<String>(REFRESH_COOKIE))
        .and(limited_body())
        .and(with(server.session_verifier.clone()))
        .and(with_value(policy.clone()))
        .and_then(handler::refresh);

    let sign_out = warp::path("sign-out")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_credentials(transport))
        .and(with(server.session_revoker.clone()))
        .and(with_value(policy.clone()))
        .and_then(handler::sign_out);

    let protected = warp::path("protected")
        .and(warp::path::tail())
        .and(with_session(server.session_verifier.clone(), transport))
        .and(with_value(policy))
        .and_then(handler::protected);

    sign_in.or(refresh).or(sign_out).or(protected)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_value<T>(value: T) -> impl Filter<Extract = (T,), Error = Infallible> + Clone
where
    T: Clone + Send + Sync,
{
    warp::any().map(move || value.clone())
}

fn parse_bearer(header: &str) -> Result<AccessToken, SessionError> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| AccessToken(token.to_string()))
        .ok_or(SessionError::Unauthorized(UnauthorizedReason::MalformedBearer))
}

/// Pull tokens out of the request the way the transport mode carries them:
/// the access token from the bearer header or from its cookie, the refresh
/// token always from its cookie.
pub fn with_credentials(
    transport: TransportMode,
) -> impl Filter<Extract = (PresentedCredentials,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(ACCESS_COOKIE))
        .and(warp::cookie::optional::<String>(REFRESH_COOKIE))
        .and_then(
            move |authorization: Option<String>,
                  access_cookie: Option<String>,
                  refresh_cookie: Option<String>| async move {
                let access_token = match transport {
                    TransportMode::Header => authorization
                        .map(|header| parse_bearer(&header))
                        .transpose()
                        .map_err(ApiErrorCode::from)
                        .map_err(reject::custom)?,
                    TransportMode::Cookie => {
                        access_cookie.filter(|t| !t.is_empty()).map(AccessToken)
                    }
                };
                let refresh_token = refresh_cookie.filter(|t| !t.is_empty()).map(RefreshToken);
                Ok::<_, Rejection>(PresentedCredentials {
                    access_token,
                    refresh_token,
                })
            },
        )
}

/// Buffer the request body, refusing anything over `MAX_BODY_BYTES`. A
/// chunked body has no declared length to check up front, so it is refused
/// outright.
fn limited_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and(warp::header::optional::<String>("transfer-encoding"))
        .and_then(
            |length: Option<u64>, encoding: Option<String>| async move {
                match (length, encoding) {
                    (Some(length), _) if length > MAX_BODY_BYTES => {
                        Err(reject::custom(ApiErrorCode::PayloadTooLarge))
                    }
                    (None, Some(_)) => Err(reject::custom(ApiErrorCode::LengthRequired)),
                    _ => Ok(()),
                }
            },
        )
        .untuple_one()
        .and(warp::body::bytes())
}

/// Only cookie mode carries an identity payload on protected requests; in
/// header mode the body belongs to whatever the route serves.
fn with_optional_payload(
    transport: TransportMode,
) -> BoxedFilter<(Option<IdentityPayload>,)> {
    match transport {
        TransportMode::Header => warp::any().map(|| None::<IdentityPayload>).boxed(),
        TransportMode::Cookie => limited_body()
            .and_then(|body: Bytes| async move {
                handler::parse_payload(&body).map_err(reject::custom)
            })
            .boxed(),
    }
}

/// Gate for anything under the protected prefix. Extracts the outcome so the
/// next handler can see who was let in and whether the pair was rotated.
pub fn with_session(
    session_verifier: Arc<dyn SessionVerifier>,
    transport: TransportMode,
) -> impl Filter<Extract = (GateOutcome,), Error = Rejection> + Clone {
    with_credentials(transport)
        .and(with_optional_payload(transport))
        .and(with(session_verifier))
        .and_then(
            |credentials: PresentedCredentials,
             payload: Option<IdentityPayload>,
             session_verifier: Arc<dyn SessionVerifier>| async move {
                session_verifier
                    .gate(&credentials, payload.as_ref())
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)
            },
        )
}
