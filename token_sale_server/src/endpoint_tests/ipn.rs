use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use processor_tools::helpers::hmac_sha512_hex;
use serde_json::json;
use token_sale_engine::{
    db_types::{Order, Payment},
    traits::DepositOutcome,
    OrderFlowApi,
};
use tsg_common::{Amount, Secret};

use super::helpers::{post_raw_request, TEST_MERCHANT_ID, TEST_MERCHANT_SECRET};
use crate::{
    endpoint_tests::mocks::MockSaleDb,
    ipn_routes::IpnWebhookRoute,
    middleware::HmacMiddlewareFactory,
};

fn signed_headers(body: &str) -> Vec<(&'static str, String)> {
    vec![("HMAC", hmac_sha512_hex(TEST_MERCHANT_SECRET, body.as_bytes()))]
}

fn deposit_body(ipn_type: &str, merchant: &str) -> String {
    json!({
        "ipn_type": ipn_type,
        "ipn_id": "X1",
        "address": "1TestAddr",
        "amount": 100.0,
        "currency": "BTC",
        "fee": 0.1,
        "confirms": 3,
        "merchant": merchant,
        "txn_id": "tx-X1"
    })
    .to_string()
}

fn paid_order_fixture() -> Order {
    Order {
        id: 1,
        user_id: "u-1001".into(),
        address: "1TestAddr".to_string(),
        currency: "BTC".to_string(),
        price: Amount::from(0.5),
        amount: Amount::from(100.0),
        paid: true,
        expired: false,
        payment_id: Some(1),
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 35, 0).unwrap(),
    }
}

fn payment_fixture() -> Payment {
    Payment {
        id: 1,
        user_id: "u-1001".into(),
        address: "1TestAddr".to_string(),
        currency: "BTC".to_string(),
        amount: Amount::from(100.0),
        order_price: Amount::from(0.5),
        fee: Amount::from(0.1),
        confirms: 3,
        merchant_id: TEST_MERCHANT_ID.to_string(),
        ipn_id: "X1".to_string(),
        txn_id: "tx-X1".to_string(),
        credited: false,
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 35, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 35, 0).unwrap(),
    }
}

fn register(cfg: &mut ServiceConfig, db: MockSaleDb) {
    let api = OrderFlowApi::new(db);
    cfg.service(
        web::scope("/ipn")
            .wrap(HmacMiddlewareFactory::new("HMAC", Secret::new(TEST_MERCHANT_SECRET.to_string()), true))
            .service(IpnWebhookRoute::<MockSaleDb>::new()),
    )
    .app_data(web::Data::new(api));
}

fn configure_no_engine_calls(cfg: &mut ServiceConfig) {
    // A bare mock: any engine call panics the test
    register(cfg, MockSaleDb::new());
}

fn configure_payment_recorded(cfg: &mut ServiceConfig) {
    let mut db = MockSaleDb::new();
    db.expect_process_deposit().returning(|_| {
        Ok(DepositOutcome::PaymentRecorded { order: paid_order_fixture(), payment: payment_fixture() })
    });
    register(cfg, db);
}

fn configure_duplicate(cfg: &mut ServiceConfig) {
    let mut db = MockSaleDb::new();
    db.expect_process_deposit()
        .returning(|d| Ok(DepositOutcome::DuplicateNotification { ipn_id: d.ipn_id }));
    register(cfg, db);
}

#[actix_web::test]
async fn ipn_without_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = deposit_body("deposit", TEST_MERCHANT_ID);
    let err = post_raw_request("/ipn", body, &[], configure_no_engine_calls).await.expect_err("Expected error");
    assert_eq!(err, "No HMAC signature found.");
}

#[actix_web::test]
async fn ipn_with_wrong_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = deposit_body("deposit", TEST_MERCHANT_ID);
    let headers = vec![("HMAC", "deadbeef".to_string())];
    let err = post_raw_request("/ipn", body, &headers, configure_no_engine_calls).await.expect_err("Expected error");
    assert_eq!(err, "Invalid HMAC signature.");
}

#[actix_web::test]
async fn signed_deposit_is_recorded() {
    let _ = env_logger::try_init().ok();
    let body = deposit_body("deposit", TEST_MERCHANT_ID);
    let headers = signed_headers(&body);
    let (status, response) =
        post_raw_request("/ipn", body, &headers, configure_payment_recorded).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"success":true,"message":"Payment #1 recorded, order #1 paid."}"#);
}

#[actix_web::test]
async fn unknown_merchant_is_denied() {
    let _ = env_logger::try_init().ok();
    let body = deposit_body("deposit", "somebody-else");
    let headers = signed_headers(&body);
    let (status, response) =
        post_raw_request("/ipn", body, &headers, configure_no_engine_calls).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response, r#"{"success":false,"message":"Unknown merchant."}"#);
}

#[actix_web::test]
async fn non_deposit_notifications_are_ignored() {
    let _ = env_logger::try_init().ok();
    let body = deposit_body("withdrawal", TEST_MERCHANT_ID);
    let headers = signed_headers(&body);
    let (status, response) =
        post_raw_request("/ipn", body, &headers, configure_no_engine_calls).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"success":true,"message":"Notification ignored."}"#);
}

#[actix_web::test]
async fn redelivered_notification_answers_success() {
    let _ = env_logger::try_init().ok();
    let body = deposit_body("deposit", TEST_MERCHANT_ID);
    let headers = signed_headers(&body);
    let (status, response) =
        post_raw_request("/ipn", body, &headers, configure_duplicate).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"success":true,"message":"Payment already exists for notification X1."}"#);
}
