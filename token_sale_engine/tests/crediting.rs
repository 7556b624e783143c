use token_sale_engine::{
    db_types::{NewDeposit, TOKEN_WALLET_LABEL},
    order_objects::CardCharge,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::CreditOutcome,
    OrderFlowApi,
    OrderManagement,
    SqliteDatabase,
    WalletApi,
};
use tsg_common::Amount;

const RATES: [f64; 2] = [0.05, 0.03];

async fn settle_card_purchase(db: &SqliteDatabase, user: &str, amount: f64, price: f64) -> i64 {
    let api = OrderFlowApi::new(db.clone());
    let charge = CardCharge {
        receipt_id: format!("ch_{user}_{amount}"),
        txn_id: format!("txn_{user}"),
        amount: Amount::from(amount),
        currency: "USD".to_string(),
    };
    let (_, payment) = api
        .process_card_purchase(user.into(), Amount::from(price), Amount::from(amount), charge)
        .await
        .expect("card purchase failed");
    payment.id
}

#[tokio::test]
async fn crediting_applies_value_exactly_once() {
    let db = prepare_test_env(&random_db_path()).await;
    let wallets = WalletApi::new(db.clone());
    let payment_id = settle_card_purchase(&db, "u-500", 100.0, 1.2).await;

    let first = wallets.credit_payment(payment_id, &RATES).await.unwrap();
    let expected_tokens = Amount::from(100.0 / 1.2);
    match first {
        CreditOutcome::Credited { log, referral_awards, .. } => {
            assert_eq!(log.addition, expected_tokens);
            assert_eq!(referral_awards, 0);
        },
        other => panic!("Expected Credited, got {other:?}"),
    }

    let second = wallets.credit_payment(payment_id, &RATES).await.unwrap();
    assert!(matches!(second, CreditOutcome::AlreadyCredited { .. }));

    let summary = wallets.wallet_summary(&"u-500".into()).await.unwrap().unwrap();
    assert_eq!(summary.wallet.balance, expected_tokens);
    assert_eq!(summary.logs.len(), 1);
}

#[tokio::test]
async fn sweep_respects_the_confirmation_threshold() {
    let db = prepare_test_env(&random_db_path()).await;
    let flow = OrderFlowApi::new(db.clone());
    let wallets = WalletApi::new(db.clone());

    flow.process_crypto_purchase(
        "u-501".into(),
        "BTC".to_string(),
        Amount::from(0.5),
        Amount::from(0.000_05),
        "1Shallow".to_string(),
    )
    .await
    .unwrap();
    let shallow = NewDeposit {
        address: "1Shallow".to_string(),
        ipn_id: "S1".to_string(),
        txn_id: "tx-S1".to_string(),
        ..deposit_template()
    };
    flow.process_deposit(shallow).await.unwrap();

    // One confirmation is not enough
    let summary = wallets.credit_eligible_payments(2, &RATES).await.unwrap();
    assert_eq!(summary.credited, 0);
    assert_eq!(summary.total(), 0);

    flow.process_crypto_purchase(
        "u-502".into(),
        "BTC".to_string(),
        Amount::from(0.5),
        Amount::from(0.000_05),
        "1Deep".to_string(),
    )
    .await
    .unwrap();
    let deep = NewDeposit {
        address: "1Deep".to_string(),
        ipn_id: "D1".to_string(),
        txn_id: "tx-D1".to_string(),
        confirms: 4,
        ..deposit_template()
    };
    flow.process_deposit(deep).await.unwrap();

    let summary = wallets.credit_eligible_payments(2, &RATES).await.unwrap();
    assert_eq!(summary.credited, 1);

    // Re-running the sweep finds nothing left to do
    let summary = wallets.credit_eligible_payments(2, &RATES).await.unwrap();
    assert_eq!(summary.total(), 0);
}

fn deposit_template() -> NewDeposit {
    NewDeposit {
        address: String::new(),
        currency: "BTC".to_string(),
        amount: Amount::from(0.5),
        fee: Amount::from(0.0001),
        confirms: 1,
        merchant_id: "cp-merchant-1".to_string(),
        ipn_id: String::new(),
        txn_id: String::new(),
    }
}

#[tokio::test]
async fn card_payments_credit_without_confirmations() {
    let db = prepare_test_env(&random_db_path()).await;
    let wallets = WalletApi::new(db.clone());
    settle_card_purchase(&db, "u-503", 50.0, 1.0).await;

    // Card payments carry a single "confirmation" but are credited regardless of the threshold
    let summary = wallets.credit_eligible_payments(6, &RATES).await.unwrap();
    assert_eq!(summary.credited, 1);
}

#[tokio::test]
async fn referral_bonus_lands_in_the_referrer_wallet() {
    let db = prepare_test_env(&random_db_path()).await;
    let wallets = WalletApi::new(db.clone());
    wallets.upsert_referral(&"u-504".into(), &"u-600".into(), 1).await.unwrap();

    let payment_id = settle_card_purchase(&db, "u-504", 200.0, 2.0).await;
    let outcome = wallets.credit_payment(payment_id, &RATES).await.unwrap();
    assert!(matches!(outcome, CreditOutcome::Credited { referral_awards: 1, .. }));

    let earnings = wallets.ref_earnings(&"u-600".into()).await.unwrap();
    assert_eq!(earnings.entries.len(), 1);
    let entry = &earnings.entries[0];
    assert_eq!(entry.addition, Amount::from(200.0 * 0.05));
    assert_eq!(entry.currency, "USD");
    assert_eq!(entry.referred_user_id, "u-504".into());
    assert!(!entry.paid);

    let referrer_wallet = db.fetch_wallet_for_user(&"u-600".into(), TOKEN_WALLET_LABEL).await.unwrap().unwrap();
    let balances = db.fetch_ref_balances(referrer_wallet.id).await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].currency, "USD");
    assert_eq!(balances[0].balance, Amount::from(200.0 * 0.05));
    // Token balance is untouched by referral bonuses
    assert_eq!(referrer_wallet.balance, Amount::default());
}

#[tokio::test]
async fn self_referrals_are_rejected() {
    let db = prepare_test_env(&random_db_path()).await;
    let wallets = WalletApi::new(db.clone());
    assert!(wallets.upsert_referral(&"u-505".into(), &"u-505".into(), 1).await.is_err());
    assert!(wallets.upsert_referral(&"u-505".into(), &"u-506".into(), 0).await.is_err());
}
