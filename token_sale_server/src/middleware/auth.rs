//! Access token verification.
//!
//! Token *issuance* belongs to the identity service, which shares `TSG_AUTH_SECRET` with this
//! server. A token is `base64(claims-json) . base64(hmac-sha256(claims-json-b64))`, presented in
//! the `tsg_access_token` header. The server verifies the signature and expiry and hands the
//! claims to handlers as an extractor; it never issues tokens itself (the [`issue_token`] helper
//! exists for tests and operator tooling).

use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tsg_common::Secret;

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

pub const AUTH_HEADER: &str = "tsg_access_token";

/// The authenticated caller, as asserted by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub admin: bool,
    /// Unix timestamp after which the token is dead.
    pub exp: i64,
}

impl AuthClaims {
    pub fn require_admin(&self) -> Result<(), ServerError> {
        if self.admin {
            Ok(())
        } else {
            Err(ServerError::InsufficientPermissions("admin access required".to_string()))
        }
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    secret: Secret<String>,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.token_secret.clone() }
    }

    pub fn verify(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| AuthError::PoorlyFormattedToken("expected two dot-separated parts".to_string()))?;
        let signature = base64::decode_config(signature, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.reveal().as_bytes())
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|e| AuthError::ValidationError(e.to_string()))?;
        let claims = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let claims: AuthClaims =
            serde_json::from_slice(&claims).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        if claims.exp < Utc::now().timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}

/// Signs a set of claims the way the identity service does.
pub fn issue_token(claims: &AuthClaims, secret: &Secret<String>) -> String {
    let payload = serde_json::to_vec(claims).expect("claims always serialize");
    let payload = base64::encode_config(payload, base64::URL_SAFE_NO_PAD);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.reveal().as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(payload.as_bytes());
    let signature = base64::encode_config(mac.finalize().into_bytes(), base64::URL_SAFE_NO_PAD);
    format!("{payload}.{signature}")
}

impl FromRequest for AuthClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = extract_claims(req);
        ready(result)
    }
}

fn extract_claims(req: &HttpRequest) -> Result<AuthClaims, ServerError> {
    let verifier = req
        .app_data::<web::Data<TokenVerifier>>()
        .ok_or_else(|| ServerError::InitializeError("Token verifier is not configured".to_string()))?;
    let token = req
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::AuthenticationError(AuthError::MissingToken))?;
    let claims = verifier.verify(token)?;
    Ok(claims)
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use tsg_common::Secret;

    use super::{issue_token, AuthClaims, TokenVerifier};
    use crate::{config::AuthConfig, errors::AuthError};

    fn verifier(secret: &str) -> TokenVerifier {
        TokenVerifier::new(&AuthConfig { token_secret: Secret::new(secret.to_string()) })
    }

    fn claims(exp_offset: i64) -> AuthClaims {
        AuthClaims {
            user_id: "u-1".to_string(),
            email: "one@example.com".to_string(),
            admin: false,
            exp: Utc::now().timestamp() + exp_offset,
        }
    }

    #[test]
    fn round_trip() {
        let token = issue_token(&claims(3600), &Secret::new("s3cret".to_string()));
        let verified = verifier("s3cret").verify(&token).expect("verification failed");
        assert_eq!(verified.user_id, "u-1");
        assert!(!verified.admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(&claims(3600), &Secret::new("s3cret".to_string()));
        assert!(matches!(verifier("other").verify(&token), Err(AuthError::ValidationError(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(&claims(-10), &Secret::new("s3cret".to_string()));
        assert!(matches!(verifier("s3cret").verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = issue_token(&claims(3600), &Secret::new("s3cret".to_string()));
        let mut parts = token.splitn(2, '.');
        let (_, sig) = (parts.next().unwrap(), parts.next().unwrap());
        let forged_claims = AuthClaims { admin: true, ..claims(3600) };
        let forged_payload =
            base64::encode_config(serde_json::to_vec(&forged_claims).unwrap(), base64::URL_SAFE_NO_PAD);
        let forged = format!("{forged_payload}.{sig}");
        assert!(verifier("s3cret").verify(&forged).is_err());
    }
}
