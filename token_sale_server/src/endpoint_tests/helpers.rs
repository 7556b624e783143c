use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::Utc;
use log::debug;
use tsg_common::Secret;

use crate::{
    config::{AuthConfig, ServerConfig},
    middleware::{issue_token, AuthClaims, TokenVerifier, AUTH_HEADER},
};

pub const TEST_TOKEN_SECRET: &str = "endpoint-test-token-secret";
pub const TEST_MERCHANT_ID: &str = "cp-merchant-1";
pub const TEST_MERCHANT_SECRET: &str = "endpoint-test-ipn-secret";

/// A test `ServerConfig` with fixed secrets. DO NOT re-use these anywhere.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth = AuthConfig { token_secret: Secret::new(TEST_TOKEN_SECRET.to_string()) };
    config.ipn.merchant_id = TEST_MERCHANT_ID.to_string();
    config.ipn.merchant_secret = Secret::new(TEST_MERCHANT_SECRET.to_string());
    config.ipn.hmac_checks = true;
    config
}

pub fn valid_token(user_id: &str, admin: bool) -> String {
    let claims = AuthClaims {
        user_id: user_id.to_string(),
        email: format!("{user_id}@example.com"),
        admin,
        exp: Utc::now().timestamp() + 3600,
    };
    issue_token(&claims, &Secret::new(TEST_TOKEN_SECRET.to_string()))
}

pub async fn get_request(
    auth_header: &str,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::get().uri(path);
    if !auth_header.is_empty() {
        req = req.insert_header((AUTH_HEADER, auth_header));
    }
    send_request(req, configure).await
}

pub async fn post_request(
    auth_header: &str,
    path: &str,
    body: serde_json::Value,
    extra_headers: &[(&str, String)],
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post().uri(path).set_json(body);
    if !auth_header.is_empty() {
        req = req.insert_header((AUTH_HEADER, auth_header));
    }
    for (name, value) in extra_headers {
        req = req.insert_header((*name, value.as_str()));
    }
    send_request(req, configure).await
}

/// Posts a raw (pre-serialized) body so the caller controls the exact bytes an HMAC was
/// computed over.
pub async fn post_raw_request(
    path: &str,
    body: String,
    extra_headers: &[(&str, String)],
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req =
        TestRequest::post().uri(path).insert_header(("Content-Type", "application/json")).set_payload(body);
    for (name, value) in extra_headers {
        req = req.insert_header((*name, value.as_str()));
    }
    send_request(req, configure).await
}

async fn send_request(
    req: TestRequest,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let config = test_config();
    let verifier = TokenVerifier::new(&config.auth);
    let app = App::new()
        .app_data(web::Data::new(verifier))
        .app_data(web::Data::new(config))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) =
        test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}
