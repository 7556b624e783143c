use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{NewDeposit, NewOrder, NewPayment, Order, Payment, Referral, UserId, Wallet},
    traits::{data_objects::{CreditOutcome, DepositOutcome}, OrderManagement},
};

/// The write-side contract for token sale backends.
///
/// Implementations must guarantee that each method is atomic: either every record it touches is
/// written, or none are. The engine relies on this to close the classic partial-failure gap where
/// a payment lands without its order (or vice versa).
#[allow(async_fn_in_trait)]
pub trait SaleGatewayDatabase: Clone + OrderManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Fetches the user's token wallet, creating a zeroed one if absent.
    ///
    /// Safe to call concurrently for the same user: the `(user_id, label)` unique index is the
    /// enforcement point, and a lost creation race falls back to the winner's row.
    async fn ensure_wallet(&self, user_id: &UserId) -> Result<Wallet, SaleGatewayError>;

    /// Records the user's own withdrawal address, creating the wallet lazily if absent.
    async fn update_wallet_address(&self, user_id: &UserId, address: &str) -> Result<Wallet, SaleGatewayError>;

    /// Persists a settled card purchase: in one transaction, ensures the wallet, inserts the
    /// payment record and inserts the order with `paid = true` linked to it.
    ///
    /// The caller has already charged the card; only `paid` charge receipts reach this method.
    async fn insert_card_order(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, Payment), SaleGatewayError>;

    /// Persists an unpaid order (crypto deposit or bank transfer rail): in one transaction,
    /// ensures the wallet and inserts the order with `paid = false`.
    async fn insert_pending_order(&self, order: NewOrder) -> Result<Order, SaleGatewayError>;

    /// Reconciles a verified deposit notification against the order book, in one transaction:
    ///
    /// 1. If a payment already exists for the notification's `ipn_id`, stop.
    /// 2. Resolve the order owning the deposit address; a missing, paid, expired or
    ///    currency-mismatched order is a distinct terminal rejection.
    /// 3. Otherwise insert the payment and flip the order to `paid` with the payment linked.
    ///
    /// A unique-violation on the payment insert (two deliveries racing past step 1) resolves as
    /// [`DepositOutcome::DuplicateNotification`], not an error.
    async fn process_deposit(&self, deposit: NewDeposit) -> Result<DepositOutcome, SaleGatewayError>;

    /// Applies a payment's value to its owner's wallet, exactly once, in one transaction:
    /// flips `credited` (the atomic gate — a second run resolves as `AlreadyCredited`), appends
    /// the wallet log, adds the token quantity to the balance, and awards referral bonuses at
    /// `referral_rates[level - 1]` of the payment amount to each of the buyer's referrers.
    async fn credit_payment(&self, payment_id: i64, referral_rates: &[f64])
        -> Result<CreditOutcome, SaleGatewayError>;

    /// Fetches uncredited payments that are ripe for crediting: card payments immediately,
    /// crypto payments once their confirmation count has reached `min_confirms`.
    async fn fetch_creditable_payments(&self, min_confirms: i64) -> Result<Vec<Payment>, SaleGatewayError>;

    /// Marks unpaid, unexpired deposit-rail orders older than `unpaid_limit` as expired and
    /// returns them. Card orders are born paid; bank orders wait on manual reconciliation with
    /// no deadline. Neither is touched.
    async fn expire_unpaid_orders(&self, unpaid_limit: Duration) -> Result<Vec<Order>, SaleGatewayError>;

    /// Records (or re-levels) a referral relationship.
    async fn upsert_referral(
        &self,
        user_id: &UserId,
        referrer_user_id: &UserId,
        level: i64,
    ) -> Result<Referral, SaleGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), SaleGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SaleGatewayError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cannot insert payment, one already exists for notification id {0}")]
    PaymentAlreadyExists(String),
    #[error("The requested order (id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("The requested payment (id {0}) does not exist")]
    PaymentNotFound(i64),
    #[error("No wallet exists for user {0}")]
    WalletNotFound(UserId),
    #[error("Cannot create order, address {0} already has an open order")]
    DepositAddressInUse(String),
    #[error("Invalid referral: {0}")]
    InvalidReferral(String),
    #[error("Payment record cannot be credited: {0}")]
    InvalidPaymentRecord(String),
}

impl From<sqlx::Error> for SaleGatewayError {
    fn from(e: sqlx::Error) -> Self {
        SaleGatewayError::DatabaseError(e.to_string())
    }
}
