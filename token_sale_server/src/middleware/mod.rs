pub mod auth;
pub mod hmac;

pub use auth::{issue_token, AuthClaims, TokenVerifier, AUTH_HEADER};
pub use hmac::HmacMiddlewareFactory;
