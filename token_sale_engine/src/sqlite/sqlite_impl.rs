//! `SqliteDatabase` is the concrete backend of the token sale engine.
//!
//! It implements the [`crate::traits`] contracts over a SQLite pool. Every write-side method
//! that touches more than one record runs inside a single transaction.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::SqlitePool;
use tsg_common::Amount;

use super::db::{db_url, new_pool, orders, payments, referrals, wallets};
use crate::{
    db_types::{NewDeposit, NewOrder, NewPayment, Order, Payment, RefBalance, RefLogEntry, Referral, UserId, Wallet,
        WalletLogEntry, TOKEN_WALLET_LABEL},
    sale_api::order_objects::{OrderQueryFilter, SalesSummary, UserOrder},
    traits::{CreditOutcome, DepositOutcome, OrderManagement, OrderQueryError, SaleGatewayDatabase, SaleGatewayError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database named by `TSG_DATABASE_URL` (or the default path).
    pub async fn new(max_connections: u32) -> Result<Self, SaleGatewayError> {
        Self::new_with_url(&db_url(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SaleGatewayError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), SaleGatewayError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SaleGatewayError::DatabaseError(e.to_string()))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl SaleGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn ensure_wallet(&self, user_id: &UserId) -> Result<Wallet, SaleGatewayError> {
        let mut conn = self.pool.acquire().await?;
        wallets::ensure_wallet(user_id, &mut conn).await
    }

    async fn update_wallet_address(&self, user_id: &UserId, address: &str) -> Result<Wallet, SaleGatewayError> {
        let mut tx = self.pool.begin().await?;
        let wallet = wallets::update_wallet_address(user_id, address, &mut tx).await?;
        tx.commit().await?;
        Ok(wallet)
    }

    async fn insert_card_order(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, Payment), SaleGatewayError> {
        let mut tx = self.pool.begin().await?;
        wallets::ensure_wallet(&order.user_id, &mut tx).await?;
        let payment = payments::insert_payment(payment, &mut tx).await?;
        let order = orders::insert_order(order, &mut tx).await?;
        let order = orders::mark_order_paid(order.id, payment.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Card order #{} persisted with payment #{}", order.id, payment.id);
        Ok((order, payment))
    }

    async fn insert_pending_order(&self, order: NewOrder) -> Result<Order, SaleGatewayError> {
        let mut tx = self.pool.begin().await?;
        wallets::ensure_wallet(&order.user_id, &mut tx).await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Pending order #{} persisted on address {}", order.id, order.address);
        Ok(order)
    }

    async fn process_deposit(&self, deposit: NewDeposit) -> Result<DepositOutcome, SaleGatewayError> {
        let mut tx = self.pool.begin().await?;
        // Fast-path dedup. The unique index on ipn_id below is the actual guarantee.
        if let Some(existing) = payments::fetch_payment_by_ipn_id(&deposit.ipn_id, &mut tx).await? {
            return Ok(DepositOutcome::DuplicateNotification { ipn_id: existing.ipn_id });
        }
        let order = match orders::fetch_order_for_address(&deposit.address, &mut tx).await? {
            Some(order) => order,
            None => return Ok(DepositOutcome::NoMatchingOrder { address: deposit.address }),
        };
        if order.paid {
            return Ok(DepositOutcome::OrderAlreadyPaid { order_id: order.id });
        }
        if order.expired {
            return Ok(DepositOutcome::OrderExpired { order_id: order.id });
        }
        if order.currency != deposit.currency {
            return Ok(DepositOutcome::CurrencyMismatch {
                order_id: order.id,
                order_currency: order.currency,
                deposit_currency: deposit.currency,
            });
        }
        let new_payment = NewPayment {
            user_id: order.user_id.clone(),
            address: deposit.address,
            currency: deposit.currency,
            amount: deposit.amount,
            order_price: order.price,
            fee: deposit.fee,
            confirms: deposit.confirms,
            merchant_id: deposit.merchant_id,
            ipn_id: deposit.ipn_id,
            txn_id: deposit.txn_id,
        };
        let payment = match payments::insert_payment(new_payment, &mut tx).await {
            Ok(payment) => payment,
            Err(SaleGatewayError::PaymentAlreadyExists(ipn_id)) => {
                // Two deliveries raced past the fast-path check; the index caught the loser.
                return Ok(DepositOutcome::DuplicateNotification { ipn_id });
            },
            Err(e) => return Err(e),
        };
        let order = orders::mark_order_paid(order.id, payment.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Deposit {} settled order #{} with payment #{}", payment.ipn_id, order.id, payment.id);
        Ok(DepositOutcome::PaymentRecorded { order, payment })
    }

    async fn credit_payment(
        &self,
        payment_id: i64,
        referral_rates: &[f64],
    ) -> Result<CreditOutcome, SaleGatewayError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment_by_id(payment_id, &mut tx)
            .await?
            .ok_or(SaleGatewayError::PaymentNotFound(payment_id))?;
        if payment.credited {
            return Ok(CreditOutcome::AlreadyCredited { payment_id });
        }
        if !payment.order_price.is_positive() {
            return Err(SaleGatewayError::InvalidPaymentRecord(format!(
                "payment #{payment_id} quotes a non-positive order price ({})",
                payment.order_price
            )));
        }
        let wallet = wallets::fetch_wallet(&payment.user_id, TOKEN_WALLET_LABEL, &mut tx)
            .await?
            .ok_or_else(|| SaleGatewayError::WalletNotFound(payment.user_id.clone()))?;
        if wallet.disabled {
            return Ok(CreditOutcome::WalletDisabled { payment_id, user_id: payment.user_id });
        }
        let payment = match payments::mark_credited(payment_id, &mut tx).await? {
            Some(payment) => payment,
            // A concurrent sweep won the gate between our fetch and the update.
            None => return Ok(CreditOutcome::AlreadyCredited { payment_id }),
        };
        let addition = Amount::from(payment.amount.value() / payment.order_price.value());
        let log = wallets::insert_wallet_log(wallet.id, payment.id, addition, &mut tx).await?;
        wallets::add_to_balance(wallet.id, addition, &mut tx).await?;

        let mut referral_awards = 0;
        for referral in referrals::referrers_for_user(&payment.user_id, &mut tx).await? {
            let rate = match rate_for_level(referral_rates, referral.level) {
                Some(rate) => rate,
                None => continue,
            };
            let bonus = payment.amount * rate;
            if !bonus.is_positive() {
                continue;
            }
            let ref_wallet = wallets::ensure_wallet(&referral.referrer_user_id, &mut tx).await?;
            if ref_wallet.disabled {
                warn!(
                    "🗃️ Skipping referral bonus for disabled wallet #{} (user {})",
                    ref_wallet.id, referral.referrer_user_id
                );
                continue;
            }
            wallets::insert_ref_log(ref_wallet.id, &payment.user_id, payment.id, bonus, &payment.currency, &mut tx)
                .await?;
            wallets::bump_ref_balance(ref_wallet.id, &payment.currency, bonus, &mut tx).await?;
            referral_awards += 1;
        }
        tx.commit().await?;
        debug!("🗃️ Payment #{} credited ({addition} tokens, {referral_awards} referral awards)", payment.id);
        Ok(CreditOutcome::Credited { payment, log, referral_awards })
    }

    async fn fetch_creditable_payments(&self, min_confirms: i64) -> Result<Vec<Payment>, SaleGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::creditable_payments(min_confirms, &mut conn).await?;
        Ok(payments)
    }

    async fn expire_unpaid_orders(&self, unpaid_limit: Duration) -> Result<Vec<Order>, SaleGatewayError> {
        let mut conn = self.pool.acquire().await?;
        orders::expire_unpaid_orders(unpaid_limit, &mut conn).await
    }

    async fn upsert_referral(
        &self,
        user_id: &UserId,
        referrer_user_id: &UserId,
        level: i64,
    ) -> Result<Referral, SaleGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let referral = referrals::upsert_referral(user_id, referrer_user_id, level, &mut conn).await?;
        Ok(referral)
    }
}

/// Levels are 1-based; a level beyond the configured rate table earns nothing.
fn rate_for_level(rates: &[f64], level: i64) -> Option<f64> {
    if level < 1 {
        return None;
    }
    rates.get((level - 1) as usize).copied()
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_for_address(&self, address: &str) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_for_address(address, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: &UserId) -> Result<Vec<UserOrder>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::user_orders_with_payment(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_payment_by_id(&self, id: i64) -> Result<Option<Payment>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_id(id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payment_by_ipn_id(&self, ipn_id: &str) -> Result<Option<Payment>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_ipn_id(ipn_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payments_for_user(&self, user_id: &UserId) -> Result<Vec<Payment>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_payments_for_user(user_id, &mut conn).await?;
        Ok(payments)
    }

    async fn fetch_wallet_for_user(&self, user_id: &UserId, label: &str) -> Result<Option<Wallet>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_wallet(user_id, label, &mut conn).await?;
        Ok(wallet)
    }

    async fn fetch_wallet_logs(&self, wallet_id: i64) -> Result<Vec<WalletLogEntry>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let logs = wallets::fetch_wallet_logs(wallet_id, &mut conn).await?;
        Ok(logs)
    }

    async fn fetch_ref_logs(&self, wallet_id: i64) -> Result<Vec<RefLogEntry>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let logs = wallets::fetch_ref_logs(wallet_id, &mut conn).await?;
        Ok(logs)
    }

    async fn fetch_ref_balances(&self, wallet_id: i64) -> Result<Vec<RefBalance>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let balances = wallets::fetch_ref_balances(wallet_id, &mut conn).await?;
        Ok(balances)
    }

    async fn sales_summary(&self) -> Result<SalesSummary, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let open_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE expired = 0")
            .fetch_one(&mut *conn)
            .await?;
        let credited_payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE credited = 1")
            .fetch_one(&mut *conn)
            .await?;
        let contributors: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM payments").fetch_one(&mut *conn).await?;
        let tokens_sold: f64 = sqlx::query_scalar("SELECT COALESCE(SUM(addition), 0.0) FROM wallet_logs")
            .fetch_one(&mut *conn)
            .await?;
        Ok(SalesSummary { open_orders, credited_payments, contributors, tokens_sold: Amount::from(tokens_sold) })
    }
}

#[cfg(test)]
mod test {
    use super::rate_for_level;

    #[test]
    fn referral_rate_lookup() {
        let rates = [0.05, 0.03];
        assert_eq!(rate_for_level(&rates, 1), Some(0.05));
        assert_eq!(rate_for_level(&rates, 2), Some(0.03));
        assert_eq!(rate_for_level(&rates, 3), None);
        assert_eq!(rate_for_level(&rates, 0), None);
        assert_eq!(rate_for_level(&rates, -1), None);
    }
}
