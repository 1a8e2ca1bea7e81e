mod cookie;
mod error;
mod handler;
mod router;

pub use cookie::{ACCESS_COOKIE, CookiePolicy, REFRESH_COOKIE};
pub use error::{ApiErrorCode, recover_error};
pub use router::{routes, with_credentials, with_session};
