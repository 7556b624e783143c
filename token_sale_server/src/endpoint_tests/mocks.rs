use chrono::Duration;
use mockall::mock;
use token_sale_engine::{
    db_types::{NewDeposit, NewOrder, NewPayment, Order, Payment, RefBalance, RefLogEntry, Referral, UserId, Wallet,
        WalletLogEntry},
    order_objects::{OrderQueryFilter, SalesSummary, UserOrder},
    traits::{CreditOutcome, DepositOutcome, OrderManagement, OrderQueryError, SaleGatewayDatabase,
        SaleGatewayError},
};

mock! {
    pub SaleDb {}

    impl Clone for SaleDb {
        fn clone(&self) -> Self;
    }

    impl OrderManagement for SaleDb {
        async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderQueryError>;
        async fn fetch_order_for_address(&self, address: &str) -> Result<Option<Order>, OrderQueryError>;
        async fn fetch_orders_for_user(&self, user_id: &UserId) -> Result<Vec<UserOrder>, OrderQueryError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError>;
        async fn fetch_payment_by_id(&self, id: i64) -> Result<Option<Payment>, OrderQueryError>;
        async fn fetch_payment_by_ipn_id(&self, ipn_id: &str) -> Result<Option<Payment>, OrderQueryError>;
        async fn fetch_payments_for_user(&self, user_id: &UserId) -> Result<Vec<Payment>, OrderQueryError>;
        async fn fetch_wallet_for_user(&self, user_id: &UserId, label: &str) -> Result<Option<Wallet>, OrderQueryError>;
        async fn fetch_wallet_logs(&self, wallet_id: i64) -> Result<Vec<WalletLogEntry>, OrderQueryError>;
        async fn fetch_ref_logs(&self, wallet_id: i64) -> Result<Vec<RefLogEntry>, OrderQueryError>;
        async fn fetch_ref_balances(&self, wallet_id: i64) -> Result<Vec<RefBalance>, OrderQueryError>;
        async fn sales_summary(&self) -> Result<SalesSummary, OrderQueryError>;
    }

    impl SaleGatewayDatabase for SaleDb {
        fn url(&self) -> &str;
        async fn ensure_wallet(&self, user_id: &UserId) -> Result<Wallet, SaleGatewayError>;
        async fn update_wallet_address(&self, user_id: &UserId, address: &str) -> Result<Wallet, SaleGatewayError>;
        async fn insert_card_order(&self, order: NewOrder, payment: NewPayment) -> Result<(Order, Payment), SaleGatewayError>;
        async fn insert_pending_order(&self, order: NewOrder) -> Result<Order, SaleGatewayError>;
        async fn process_deposit(&self, deposit: NewDeposit) -> Result<DepositOutcome, SaleGatewayError>;
        async fn credit_payment(&self, payment_id: i64, referral_rates: &[f64]) -> Result<CreditOutcome, SaleGatewayError>;
        async fn fetch_creditable_payments(&self, min_confirms: i64) -> Result<Vec<Payment>, SaleGatewayError>;
        async fn expire_unpaid_orders(&self, unpaid_limit: Duration) -> Result<Vec<Order>, SaleGatewayError>;
        async fn upsert_referral(&self, user_id: &UserId, referrer_user_id: &UserId, level: i64) -> Result<Referral, SaleGatewayError>;
    }
}
