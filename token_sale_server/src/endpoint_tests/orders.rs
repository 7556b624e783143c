use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use token_sale_engine::{db_types::Order, order_objects::UserOrder, OrderQueryApi};
use tsg_common::Amount;

use super::helpers::{get_request, valid_token};
use crate::{
    endpoint_tests::mocks::MockSaleDb,
    routes::{AllOrdersRoute, MyOrdersRoute, OrderByIdRoute},
};

fn order_fixture() -> Order {
    Order {
        id: 1,
        user_id: "u-1001".into(),
        address: "1TestAddr".to_string(),
        currency: "BTC".to_string(),
        price: Amount::from(0.5),
        amount: Amount::from(100.0),
        paid: false,
        expired: false,
        payment_id: None,
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
    }
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockSaleDb::new();
    db.expect_fetch_orders_for_user().returning(|_| Ok(vec![UserOrder::unpaid(order_fixture())]));
    db.expect_search_orders().returning(|_| Ok(vec![order_fixture()]));
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(order_fixture())));
    let api = OrderQueryApi::new(db);
    cfg.service(
        web::scope("/api")
            .service(MyOrdersRoute::<MockSaleDb>::new())
            .service(AllOrdersRoute::<MockSaleDb>::new())
            .service(OrderByIdRoute::<MockSaleDb>::new()),
    )
    .app_data(web::Data::new(api));
}

const ORDER_JSON: &str = r#"{"id":1,"user_id":"u-1001","address":"1TestAddr","currency":"BTC","price":0.5,"amount":100.0,"paid":false,"expired":false,"payment_id":null,"created_at":"2024-02-29T13:30:00Z","updated_at":"2024-02-29T13:30:00Z"}"#;

#[actix_web::test]
async fn fetch_my_orders_without_token() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/api/orders", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. No access token was provided."}"#);
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("u-1001", false);
    let (status, body) = get_request(&token, "/api/orders", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, USER_ORDERS_JSON);
}

const USER_ORDERS_JSON: &str = r#"[{"id":1,"user_id":"u-1001","address":"1TestAddr","currency":"BTC","price":0.5,"amount":100.0,"paid":false,"expired":false,"payment_id":null,"created_at":"2024-02-29T13:30:00Z","updated_at":"2024-02-29T13:30:00Z","paid_amount":0.0,"credited":false,"paid_tx":null,"log":null}]"#;

#[actix_web::test]
async fn fetch_my_orders_with_tampered_token() {
    let _ = env_logger::try_init().ok();
    let mut token = valid_token("u-1001", false);
    token.replace_range(token.len() - 10..token.len() - 5, "AAAAA");
    let (status, _) = get_request(&token, "/api/orders", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn listing_all_orders_requires_admin() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("u-1001", false);
    let (status, body) = get_request(&token, "/api/orders/all", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Insufficient Permissions. admin access required"}"#);
}

#[actix_web::test]
async fn admins_list_all_orders() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("admin-1", true);
    let (status, body) = get_request(&token, "/api/orders/all", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!("[{ORDER_JSON}]"));
}

#[actix_web::test]
async fn order_ids_are_validated_before_querying() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("u-1001", false);
    let (status, _) = get_request(&token, "/api/orders/id/not-a-number", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn owners_fetch_their_order_by_id() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("u-1001", false);
    let (status, body) = get_request(&token, "/api/orders/id/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ORDER_JSON);
}

#[actix_web::test]
async fn strangers_cannot_fetch_another_users_order() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("u-9999", false);
    let (status, _) = get_request(&token, "/api/orders/id/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}
