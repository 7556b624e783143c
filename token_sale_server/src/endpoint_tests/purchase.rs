use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use processor_tools::{CoinPaymentsApi, CoinPaymentsConfig, MailerApi, MailerConfig, StripeApi, StripeConfig};
use serde_json::json;
use token_sale_engine::{db_types::Order, OrderFlowApi};

use super::helpers::{post_request, valid_token};
use crate::{
    endpoint_tests::mocks::MockSaleDb,
    routes::{CreateBankOrderRoute, CreateOrderRoute},
};

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockSaleDb::new();
    db.expect_insert_pending_order().returning(|order| {
        Ok(Order {
            id: 7,
            user_id: order.user_id,
            address: order.address,
            currency: order.currency,
            price: order.price,
            amount: order.amount,
            paid: false,
            expired: false,
            payment_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    });
    let flow = OrderFlowApi::new(db);
    // Clients with default (useless) config: any attempt to reach a processor fails fast, and
    // the unconfigured mailer drops notifications on the floor
    let stripe = StripeApi::new(StripeConfig::default()).unwrap();
    let coinpayments = CoinPaymentsApi::new(CoinPaymentsConfig::default()).unwrap();
    let mailer = MailerApi::new(MailerConfig::default()).unwrap();
    cfg.service(
        web::scope("/api")
            .service(CreateOrderRoute::<MockSaleDb>::new())
            .service(CreateBankOrderRoute::<MockSaleDb>::new()),
    )
    .app_data(web::Data::new(flow))
    .app_data(web::Data::new(stripe))
    .app_data(web::Data::new(coinpayments))
    .app_data(web::Data::new(mailer));
}

#[actix_web::test]
async fn purchases_reject_non_positive_amounts() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("u-1001", false);
    let body = json!({"currency": "USD", "amount": -5.0, "price": 1.2, "token": "tok_visa"});
    let (status, _) = post_request(&token, "/api/order", body, &[], configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fiat_purchases_require_a_card_token() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("u-1001", false);
    let body = json!({"currency": "EUR", "amount": 100.0, "price": 1.2});
    let (status, body) = post_request(&token, "/api/order", body, &[], configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("card token"), "unexpected body: {body}");
}

#[actix_web::test]
async fn crypto_purchase_reports_unavailable_processor() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("u-1001", false);
    let body = json!({"currency": "BTC", "amount": 0.5, "price": 0.00005});
    let (status, body) = post_request(&token, "/api/order", body, &[], configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, r#"{"error":"Payment processor is unavailable. Coinpayments is unavailable"}"#);
}

#[actix_web::test]
async fn bank_orders_are_persisted_unpaid() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("u-1001", false);
    let body = json!({"currency": "EUR", "amount": 5000.0, "price": 1.1});
    let (status, body) = post_request(&token, "/api/bank-order", body, &[], configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"success"}"#);
}
