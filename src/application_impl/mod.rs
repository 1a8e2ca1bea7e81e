mod jwt_codec;
mod session_issuer_impl;
mod session_revoker_impl;
mod session_verifier_impl;

#[cfg(test)]
mod fixture;

pub use jwt_codec::*;
pub use session_issuer_impl::*;
pub use session_revoker_impl::*;
pub use session_verifier_impl::*;
