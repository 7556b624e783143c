use futures_util::future::join_all;
use token_sale_engine::{
    db_types::{BANK_ORDER_ADDRESS, CARD_MERCHANT_ID, CARD_ORDER_ADDRESS, TOKEN_WALLET_LABEL},
    order_objects::CardCharge,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    OrderFlowApi,
    OrderManagement,
    SaleGatewayDatabase,
    SaleGatewayError,
};
use tsg_common::Amount;

#[tokio::test]
async fn card_purchase_creates_paid_order_and_linked_payment() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());
    let charge = CardCharge {
        receipt_id: "ch_1Nq7xK".to_string(),
        txn_id: "txn_3OkPq9".to_string(),
        amount: Amount::from(100.0),
        currency: "USD".to_string(),
    };
    let (order, payment) = api
        .process_card_purchase("u-1001".into(), Amount::from(1.2), Amount::from(100.0), charge)
        .await
        .expect("card purchase failed");

    assert!(order.paid);
    assert!(!order.expired);
    assert_eq!(order.address, CARD_ORDER_ADDRESS);
    assert_eq!(order.payment_id, Some(payment.id));
    assert_eq!(payment.merchant_id, CARD_MERCHANT_ID);
    assert_eq!(payment.ipn_id, "ch_1Nq7xK");
    assert_eq!(payment.confirms, 1);
    assert!(!payment.credited);

    // The wallet was created lazily in the same transaction
    let wallet = db.fetch_wallet_for_user(&"u-1001".into(), TOKEN_WALLET_LABEL).await.unwrap();
    assert!(wallet.is_some());
    assert_eq!(wallet.unwrap().balance, Amount::default());
}

#[tokio::test]
async fn bank_order_is_not_marked_paid() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());
    let order = api
        .process_bank_purchase("u-1002".into(), "EUR".to_string(), Amount::from(5000.0), Amount::from(1.1))
        .await
        .expect("bank purchase failed");

    assert!(!order.paid);
    assert_eq!(order.address, BANK_ORDER_ADDRESS);
    assert_eq!(order.payment_id, None);
}

#[tokio::test]
async fn many_bank_orders_may_share_the_sentinel_address() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());
    for i in 0..3 {
        api.process_bank_purchase(format!("u-20{i}").into(), "EUR".to_string(), Amount::from(100.0), Amount::from(1.1))
            .await
            .expect("bank purchase failed");
    }
}

#[tokio::test]
async fn open_deposit_addresses_are_exclusive() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderFlowApi::new(db.clone());
    api.process_crypto_purchase(
        "u-3001".into(),
        "BTC".to_string(),
        Amount::from(0.5),
        Amount::from(0.000_05),
        "1DupAddrXYZ".to_string(),
    )
    .await
    .expect("first crypto purchase failed");

    let err = api
        .process_crypto_purchase(
            "u-3002".into(),
            "BTC".to_string(),
            Amount::from(0.25),
            Amount::from(0.000_05),
            "1DupAddrXYZ".to_string(),
        )
        .await
        .expect_err("second order on the same open address must fail");
    assert!(matches!(err, SaleGatewayError::DepositAddressInUse(addr) if addr == "1DupAddrXYZ"));
}

#[tokio::test]
async fn concurrent_wallet_ensure_creates_exactly_one_wallet() {
    let db = prepare_test_env(&random_db_path()).await;
    let user = "u-4001".into();
    let tasks = (0..8).map(|_| {
        let db = db.clone();
        let user: token_sale_engine::db_types::UserId = "u-4001".into();
        tokio::spawn(async move { db.ensure_wallet(&user).await })
    });
    let results = join_all(tasks).await;
    for result in results {
        result.expect("task panicked").expect("ensure_wallet failed");
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wallets WHERE user_id = $1")
        .bind("u-4001")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    let wallet = db.fetch_wallet_for_user(&user, TOKEN_WALLET_LABEL).await.unwrap().unwrap();
    assert!(!wallet.disabled);
    assert_eq!(wallet.balance, Amount::default());
}
