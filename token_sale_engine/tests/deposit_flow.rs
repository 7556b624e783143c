use chrono::Duration;
use token_sale_engine::{
    db_types::NewDeposit,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::DepositOutcome,
    OrderFlowApi,
    OrderManagement,
    SqliteDatabase,
};
use tsg_common::Amount;

fn deposit(ipn_id: &str, address: &str, currency: &str, amount: f64) -> NewDeposit {
    NewDeposit {
        address: address.to_string(),
        currency: currency.to_string(),
        amount: Amount::from(amount),
        fee: Amount::from(amount * 0.005),
        confirms: 3,
        merchant_id: "cp-merchant-1".to_string(),
        ipn_id: ipn_id.to_string(),
        txn_id: format!("tx-{ipn_id}"),
    }
}

async fn place_btc_order(api: &OrderFlowApi<SqliteDatabase>, user: &str, address: &str) {
    api.process_crypto_purchase(
        user.into(),
        "BTC".to_string(),
        Amount::from(0.5),
        Amount::from(0.000_05),
        address.to_string(),
    )
    .await
    .expect("crypto purchase failed");
}

#[tokio::test]
async fn deposit_settles_matching_order() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());
    place_btc_order(&api, "u-100", "1AbcDeposit").await;

    let outcome = api.process_deposit(deposit("X1", "1AbcDeposit", "BTC", 0.5)).await.expect("deposit failed");
    match outcome {
        DepositOutcome::PaymentRecorded { order, payment } => {
            assert!(order.paid);
            assert_eq!(order.payment_id, Some(payment.id));
            assert_eq!(payment.ipn_id, "X1");
            assert_eq!(payment.amount, Amount::from(0.5));
            assert_eq!(payment.order_price, order.price);
            assert!(!payment.credited);
        },
        other => panic!("Expected PaymentRecorded, got {other:?}"),
    }
}

#[tokio::test]
async fn redelivered_notification_is_a_no_op() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());
    place_btc_order(&api, "u-101", "1RedeliverMe").await;

    let first = api.process_deposit(deposit("X7", "1RedeliverMe", "BTC", 0.5)).await.unwrap();
    assert!(matches!(first, DepositOutcome::PaymentRecorded { .. }));

    let second = api.process_deposit(deposit("X7", "1RedeliverMe", "BTC", 0.5)).await.unwrap();
    assert!(matches!(second, DepositOutcome::DuplicateNotification { ipn_id } if ipn_id == "X7"));

    // Exactly one payment on the books, and the order is untouched
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE ipn_id = $1").bind("X7").fetch_one(db.pool()).await.unwrap();
    assert_eq!(count, 1);
    let order = db.fetch_order_for_address("1RedeliverMe").await.unwrap().unwrap();
    assert!(order.paid);
}

#[tokio::test]
async fn currency_mismatch_never_pays_the_order() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());
    place_btc_order(&api, "u-102", "1BtcOnly").await;

    let outcome = api.process_deposit(deposit("X9", "1BtcOnly", "ETH", 0.5)).await.unwrap();
    assert!(matches!(outcome, DepositOutcome::CurrencyMismatch { deposit_currency, .. } if deposit_currency == "ETH"));

    let order = db.fetch_order_for_address("1BtcOnly").await.unwrap().unwrap();
    assert!(!order.paid);
    assert!(db.fetch_payment_by_ipn_id("X9").await.unwrap().is_none());
}

#[tokio::test]
async fn deposit_for_unknown_address_is_rejected() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());

    let outcome = api.process_deposit(deposit("X11", "1Nobody", "BTC", 0.1)).await.unwrap();
    assert!(matches!(outcome, DepositOutcome::NoMatchingOrder { address } if address == "1Nobody"));
    assert!(db.fetch_payment_by_ipn_id("X11").await.unwrap().is_none());
}

#[tokio::test]
async fn paid_order_cannot_be_paid_again() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());
    place_btc_order(&api, "u-103", "1OncePaid").await;

    let first = api.process_deposit(deposit("X20", "1OncePaid", "BTC", 0.5)).await.unwrap();
    assert!(matches!(first, DepositOutcome::PaymentRecorded { .. }));

    // A *different* notification lands on the same (already settled) address
    let second = api.process_deposit(deposit("X21", "1OncePaid", "BTC", 0.5)).await.unwrap();
    assert!(matches!(second, DepositOutcome::OrderAlreadyPaid { .. }));
    assert!(db.fetch_payment_by_ipn_id("X21").await.unwrap().is_none());
}

#[tokio::test]
async fn expired_order_rejects_late_deposits() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());
    place_btc_order(&api, "u-104", "1TooLate").await;

    // Give the order a measurable age; unixepoch has one-second granularity
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    let expired = api.expire_old_orders(Duration::seconds(1)).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert!(expired[0].expired);

    let outcome = api.process_deposit(deposit("X30", "1TooLate", "BTC", 0.5)).await.unwrap();
    assert!(matches!(outcome, DepositOutcome::OrderExpired { .. }));
    assert!(db.fetch_payment_by_ipn_id("X30").await.unwrap().is_none());
}

#[tokio::test]
async fn expiry_leaves_paid_and_bank_orders_alone() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());
    place_btc_order(&api, "u-105", "1SettledFast").await;
    api.process_deposit(deposit("X40", "1SettledFast", "BTC", 0.5)).await.unwrap();
    api.process_bank_purchase("u-105".into(), "EUR".to_string(), Amount::from(100.0), Amount::from(1.1))
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    let expired = api.expire_old_orders(Duration::seconds(1)).await.unwrap();
    assert!(expired.is_empty());
}
