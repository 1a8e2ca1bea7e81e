use super::error::ApiErrorCode;
use crate::domain_model::{SessionConfig, TokenPair, TransportMode};
use warp::http::HeaderValue;
use warp::http::header::SET_COOKIE;
use warp::{Rejection, Reply, reject};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Which cookies a response sets, and how they are scoped.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    transport: TransportMode,
    refresh_path: String,
    access_max_age: u64,
    refresh_max_age: u64,
}

impl CookiePolicy {
    pub fn new(config: &SessionConfig, refresh_path: impl Into<String>) -> Self {
        CookiePolicy {
            transport: config.transport,
            refresh_path: refresh_path.into(),
            access_max_age: config.access_ttl.as_secs(),
            refresh_max_age: config.refresh_ttl.as_secs(),
        }
    }

    /// The access token goes in the JSON body only when it does not travel
    /// as a cookie.
    pub fn access_in_body(&self) -> bool {
        self.transport == TransportMode::Header
    }

    pub fn issue(&self, tokens: &TokenPair) -> Vec<String> {
        let mut cookies = vec![format_cookie(
            REFRESH_COOKIE,
            tokens.refresh_token.as_str(),
            &self.refresh_path,
            self.refresh_max_age,
        )];
        if self.transport == TransportMode::Cookie {
            cookies.push(format_cookie(
                ACCESS_COOKIE,
                tokens.access_token.as_str(),
                "/",
                self.access_max_age,
            ));
        }
        cookies
    }

    pub fn clear(&self) -> Vec<String> {
        let mut cookies = vec![format_cookie(REFRESH_COOKIE, "", &self.refresh_path, 0)];
        if self.transport == TransportMode::Cookie {
            cookies.push(format_cookie(ACCESS_COOKIE, "", "/", 0));
        }
        cookies
    }
}

fn format_cookie(name: &str, value: &str, path: &str, max_age: u64) -> String {
    format!("{name}={value}; Max-Age={max_age}; Path={path}; HttpOnly; Secure; SameSite=Strict")
}

/// Append one `Set-Cookie` header per cookie to the reply.
pub fn with_cookies(
    reply: impl Reply,
    cookies: Vec<String>,
) -> Result<warp::reply::Response, Rejection> {
    let mut response = reply.into_response();
    for cookie in cookies {
        let value = HeaderValue::from_str(&cookie)
            .map_err(ApiErrorCode::internal)
            .map_err(reject::custom)?;
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(response)
}
