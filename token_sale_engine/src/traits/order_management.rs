use thiserror::Error;

use crate::{
    db_types::{Order, Payment, RefBalance, RefLogEntry, UserId, Wallet, WalletLogEntry},
    sale_api::order_objects::{OrderQueryFilter, SalesSummary, UserOrder},
};

/// Read-side queries over orders, payments and wallets.
///
/// These are projections of the write-side state and carry no invariants of their own.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderQueryError>;

    /// The order currently owning the given deposit address, if any. When an address has been
    /// recycled across expired orders, the most recent one wins.
    async fn fetch_order_for_address(&self, address: &str) -> Result<Option<Order>, OrderQueryError>;

    /// All of a user's orders, newest first, each joined with its payment and wallet-log record
    /// (when paid / credited).
    async fn fetch_orders_for_user(&self, user_id: &UserId) -> Result<Vec<UserOrder>, OrderQueryError>;

    /// Fetches orders according to the given filter, newest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError>;

    async fn fetch_payment_by_id(&self, id: i64) -> Result<Option<Payment>, OrderQueryError>;

    async fn fetch_payment_by_ipn_id(&self, ipn_id: &str) -> Result<Option<Payment>, OrderQueryError>;

    async fn fetch_payments_for_user(&self, user_id: &UserId) -> Result<Vec<Payment>, OrderQueryError>;

    async fn fetch_wallet_for_user(&self, user_id: &UserId, label: &str) -> Result<Option<Wallet>, OrderQueryError>;

    async fn fetch_wallet_logs(&self, wallet_id: i64) -> Result<Vec<WalletLogEntry>, OrderQueryError>;

    async fn fetch_ref_logs(&self, wallet_id: i64) -> Result<Vec<RefLogEntry>, OrderQueryError>;

    async fn fetch_ref_balances(&self, wallet_id: i64) -> Result<Vec<RefBalance>, OrderQueryError>;

    /// Headline sale aggregates: open orders, credited payments, distinct contributors, tokens
    /// sold.
    async fn sales_summary(&self) -> Result<SalesSummary, OrderQueryError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderQueryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for OrderQueryError {
    fn from(e: sqlx::Error) -> Self {
        OrderQueryError::DatabaseError(e.to_string())
    }
}
